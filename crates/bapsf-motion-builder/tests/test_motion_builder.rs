use bapsf_motion_builder::{
    grid_points, CircleRegion, CircularExclusion, DividerExclusion, DividerSide, ExclusionLayer,
    GridCNStepLayer, GridLayer, LayerKind, MotionBuilder, MotionLayer, MotionSpace,
};
use bapsf_motion_settings::{MotionBuilderConfig, RunConfig};
use proptest::prelude::*;

fn table(text: &str) -> toml::Table {
    toml::from_str(text).unwrap()
}

#[test]
fn test_grid_layer_from_builder_config() {
    let config: MotionBuilderConfig = toml::from_str(
        r#"
        space = "lapd_xy"
        [layers.0]
        type = "grid"
        limits = [[0, 10], [0, 20]]
        npoints = [2, 2]
        "#,
    )
    .unwrap();
    let mut mb = MotionBuilder::from_config(&config).unwrap();
    let ml = mb.motion_list().unwrap().unwrap();
    let points: Vec<Vec<f64>> = ml.rows().into_iter().map(|r| r.to_vec()).collect();
    assert_eq!(
        points,
        vec![vec![0.0, 0.0], vec![0.0, 20.0], vec![10.0, 0.0], vec![10.0, 20.0]]
    );
}

#[test]
fn test_explicit_space_axes() {
    let config: MotionBuilderConfig = toml::from_str(
        r#"
        [space.0]
        label = "x"
        range = [-10, 10]
        num = 21
        [space.1]
        label = "z"
        range = [0, 5]
        num = 6
        [layers.0]
        type = "grid_CNStep"
        center = [0, 2]
        npoints = [5, 3]
        step_size = [1, 1]
        [exclusions.0]
        type = "divider"
        mb = [0, 2.5]
        exclude = "+e1"
        "#,
    )
    .unwrap();
    let mut mb = MotionBuilder::from_config(&config).unwrap();
    assert_eq!(mb.space().labels(), vec!["x", "z"]);

    let ml = mb.motion_list().unwrap().unwrap();
    // z = 3 is above the divider
    assert_eq!(ml.nrows(), 10);
    assert!(ml.column(1).iter().all(|&z| z <= 2.5));
}

#[test]
fn test_degenerate_axis_single_point() {
    let points = grid_points(&[[5.0, 5.0], [0.0, 10.0]], &[7, 3]).unwrap();
    assert_eq!(points.shape(), &[1, 3, 2]);
    let flat: Vec<f64> = points.iter().copied().collect();
    assert_eq!(flat, vec![5.0, 0.0, 5.0, 5.0, 5.0, 10.0]);
}

#[test]
fn test_center_step_equals_limits() {
    let cn = GridCNStepLayer::new(2, &[0.0, 0.0], &[3, 3], &[1.0, 1.0]).unwrap();
    let grid = GridLayer::new(2, &[[-1.0, 1.0], [-1.0, 1.0]], &[3, 3]).unwrap();
    assert_eq!(cn.generate().unwrap(), grid.generate().unwrap());
}

#[test]
fn test_detached_items_refuse_shared_state() {
    let mut space = MotionSpace::lapd_xy();

    let exclusion = ExclusionLayer::detached(Box::new(
        CircularExclusion::new(10.0, [0.0, 0.0], CircleRegion::Outside).unwrap(),
    ));
    assert!(exclusion.regenerate(&mut space).unwrap_err().is_usage_error());
    assert!(exclusion.update_global_mask(&mut space).unwrap_err().is_usage_error());
    assert!(exclusion.is_excluded(&space, &[20.0, 0.0]).unwrap());
    assert!(space.exclusion_names().is_empty());
    assert!(space.mask().iter().all(|&m| m));

    let layer = MotionLayer::detached(Box::new(
        GridLayer::new(2, &[[0.0, 1.0]], &[2]).unwrap(),
    ));
    assert!(layer.regenerate(&mut space).unwrap_err().is_usage_error());
    assert!(layer.points(&space).is_none());
    assert_eq!(layer.generate().unwrap().shape(), &[2, 2, 2]);
}

#[test]
fn test_attached_exclusion_updates_global_mask() {
    let mut space = MotionSpace::lapd_xy();
    let exclusion = ExclusionLayer::attach(
        &mut space,
        Box::new(DividerExclusion::new(f64::INFINITY, 0.0, DividerSide::MinusE0).unwrap()),
    )
    .unwrap();
    assert_eq!(exclusion.name(), "mask_ex0");
    assert!(!space.is_allowed(&[-10.0, 0.0]).unwrap());
    assert!(space.is_allowed(&[10.0, 0.0]).unwrap());
    exclusion.regenerate(&mut space).unwrap();
    assert_eq!(space.exclusion_names(), vec!["mask_ex0"]);
}

#[test]
fn test_builder_from_run_config() {
    let run = RunConfig::from_toml_str(
        r#"
        name = "builder"
        [motion_group]
        name = "P32"
        [motion_group.drive]
        name = "XY"
        [motion_group.drive.axes.0]
        name = "X"
        ip = "192.168.6.104"
        units = "cm"
        units_per_rev = 0.254
        [motion_group.drive.axes.1]
        name = "Y"
        ip = "192.168.6.103"
        units = "cm"
        units_per_rev = 0.254
        [motion_group.transform]
        type = "lapd_xy"
        pivot_to_center = 62.94
        pivot_to_drive = 133.51
        probe_axis_offset = 20.16
        [motion_group.motion_builder]
        space = "lapd_xy"
        [motion_group.motion_builder.layers.0]
        type = "grid"
        limits = [[0, 30], [-30, 30]]
        npoints = [11, 21]
        [motion_group.motion_builder.exclusions.0]
        type = "lapd-XY"
        port_location = "E"
        "#,
    )
    .unwrap();
    let mut mb = MotionBuilder::from_config(&run.motion_groups[0].motion_builder).unwrap();
    let count = mb.motion_list().unwrap().map(|ml| ml.nrows()).unwrap_or(0);
    assert!(count > 0 && count < 231);
}

proptest! {
    #[test]
    fn prop_adding_exclusions_is_monotone(
        radius in 5.0f64..60.0,
        cx in -20.0f64..20.0,
        cy in -20.0f64..20.0,
        slope in -3.0f64..3.0,
        intercept in -30.0f64..30.0,
        above in any::<bool>(),
    ) {
        let mut mb = MotionBuilder::new(
            bapsf_motion_settings::SpaceConfig::Preset("lapd_xy".into()),
            &[],
            &[table(&format!("type = \"circle\"\nradius = {radius}\ncenter = [{cx}, {cy}]"))],
        )
        .unwrap();
        let before = mb.mask().clone();

        let side = if above { "+e1" } else { "-e1" };
        mb.add_exclusion(&table(&format!("type = \"divider\"\nmb = [{slope}, {intercept}]\nexclude = \"{side}\"")))
            .unwrap();

        for (was_allowed, now_allowed) in before.iter().zip(mb.mask().iter()) {
            prop_assert!(*was_allowed || !*now_allowed);
        }
    }
}
