use bapsf_motion_transform::{CoordinateTransform, LaPDXYParams, LaPDXYTransform};
use ndarray::Array2;
use proptest::prelude::*;

fn polarity() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop_oneof![Just(1.0), Just(-1.0)], 2)
}

proptest! {
    #[test]
    fn prop_motion_space_round_trip(
        pivot_to_center in 50.0f64..120.0,
        pivot_to_drive in 10.0f64..150.0,
        probe_axis_offset in 0.0f64..10.0,
        drive_polarity in polarity(),
        mspace_polarity in polarity(),
        xs in prop::collection::vec((-40.0f64..40.0, -40.0f64..40.0), 1..20),
    ) {
        let tr = LaPDXYTransform::new(2, LaPDXYParams {
            pivot_to_center,
            pivot_to_drive,
            probe_axis_offset,
            drive_polarity,
            mspace_polarity,
        }).unwrap();

        let flat: Vec<f64> = xs.iter().flat_map(|(x, y)| [*x, *y]).collect();
        let points = Array2::from_shape_vec((xs.len(), 2), flat).unwrap();

        let drive = tr.to_drive(points.view()).unwrap();
        let back = tr.to_motion_space(drive.view()).unwrap();

        for (a, b) in points.iter().zip(back.iter()) {
            prop_assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
        }
    }

    #[test]
    fn prop_drive_space_round_trip(
        e0 in -30.0f64..30.0,
        e1 in -30.0f64..30.0,
    ) {
        let tr = LaPDXYTransform::new(2, LaPDXYParams::new(62.94, 133.51, 20.16)).unwrap();
        let point = tr.point_to_motion_space(&[e0, e1]).unwrap();
        let drive = tr.point_to_drive(&point).unwrap();
        prop_assert!((drive[0] - e0).abs() < 1e-6);
        prop_assert!((drive[1] - e1).abs() < 1e-6);
    }
}
