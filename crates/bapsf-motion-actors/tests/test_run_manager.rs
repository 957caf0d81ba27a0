use bapsf_motion_actors::{ActorError, MotionGroup, RunManager};
use bapsf_motion_communication::{MotorSettings, SimulatedBench};
use bapsf_motion_settings::{MotionGroupConfig, RunConfig};
use std::sync::Arc;
use std::time::Duration;

fn group(name: &str, x_ip: &str, y_ip: &str) -> String {
    format!(
        r#"
        [motion_group.{name}]
        name = "{name}"
        [motion_group.{name}.drive]
        name = "XY"
        [motion_group.{name}.drive.axes.0]
        name = "X"
        ip = "{x_ip}"
        units = "cm"
        units_per_rev = 0.254
        [motion_group.{name}.drive.axes.1]
        name = "Y"
        ip = "{y_ip}"
        units = "cm"
        units_per_rev = 0.254
        [motion_group.{name}.transform]
        type = "identity"
        [motion_group.{name}.motion_builder]
        space = "lapd_xy"
        [motion_group.{name}.motion_builder.layers.0]
        type = "grid"
        limits = [[-10, 10], [-10, 10]]
        npoints = [3, 3]
        [motion_group.{name}.motion_builder.exclusions.0]
        type = "lapd-XY"
        "#
    )
}

fn run_config(groups: &[String]) -> RunConfig {
    RunConfig::from_toml_str(&format!("name = \"bench\"\n{}", groups.concat())).unwrap()
}

fn settings() -> MotorSettings {
    MotorSettings {
        base_heartrate: Duration::from_millis(20),
        active_heartrate: Duration::from_millis(10),
        ..MotorSettings::default()
    }
}

fn lapd_group() -> MotionGroupConfig {
    let doc = r#"
        name = "P32"
        [drive]
        name = "XY"
        [drive.axes.0]
        name = "X"
        ip = "192.168.6.104"
        units = "cm"
        units_per_rev = 0.254
        [drive.axes.1]
        name = "Y"
        ip = "192.168.6.103"
        units = "cm"
        units_per_rev = 0.254
        [transform]
        type = "lapd_xy"
        pivot_to_center = 62.94
        pivot_to_drive = 133.51
        probe_axis_offset = 20.16
        [motion_builder]
        space = "lapd_xy"
        [motion_builder.exclusions.0]
        type = "lapd-XY"
    "#;
    MotionGroupConfig::from_table(toml::from_str(doc).unwrap()).unwrap()
}

#[test]
fn test_run_manager_builds_every_group() {
    let bench = SimulatedBench::new();
    let config = run_config(&[
        group("A", "10.0.0.1", "10.0.0.2"),
        group("B", "10.0.0.3", "10.0.0.4"),
    ]);
    let rm = RunManager::with_connector(config, settings(), Arc::new(bench.clone())).unwrap();

    assert_eq!(rm.mgs().len(), 2);
    assert_eq!(bench.ips(), vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]);
    assert!(!rm.is_moving());

    bench.drive("10.0.0.3").set_moving(true);
    rm.mg("B").unwrap().drive().axes()[0].motor().retrieve_status().unwrap();
    assert!(rm.is_moving());
    rm.terminate();
}

#[test]
fn test_motion_group_moves_in_motion_space() {
    let bench = SimulatedBench::new();
    let config = run_config(&[group("A", "10.0.0.1", "10.0.0.2")]);
    let mut rm = RunManager::with_connector(config, settings(), Arc::new(bench.clone())).unwrap();
    let mg = rm.mg_mut("A").unwrap();

    mg.move_to(&[2.54, -5.08]).unwrap();
    assert_eq!(bench.drive("10.0.0.1").position(), 200_000);
    assert_eq!(bench.drive("10.0.0.2").position(), -400_000);

    let position = mg.position().unwrap();
    assert!((position[0] - 2.54).abs() < 1e-9);
    assert!((position[1] + 5.08).abs() < 1e-9);

    // first motion list entry is the (-10, -10) grid corner
    mg.move_ml(0).unwrap();
    let position = mg.position().unwrap();
    assert!((position[0] + 10.0).abs() < 1e-3);
    assert!(mg.move_ml(9).is_err());
}

#[test]
fn test_excluded_point_is_rejected() {
    let bench = SimulatedBench::new();
    let mg = MotionGroup::with_connector(lapd_group(), settings(), Arc::new(bench.clone())).unwrap();

    let err = mg.move_to(&[45.0, 15.0]).unwrap_err();
    assert!(err.is_validation_error());
    assert!(bench.drive("192.168.6.104").received().iter().all(|c| !c.starts_with("DI")));

    mg.move_to(&[10.0, 5.0]).unwrap();
    let position = mg.position().unwrap();
    assert!((position[0] - 10.0).abs() < 1e-3);
    assert!((position[1] - 5.0).abs() < 1e-3);
    mg.terminate();
}

#[test]
fn test_conflicting_group_is_rejected() {
    let bench = SimulatedBench::new();
    let config = run_config(&[group("A", "10.0.0.1", "10.0.0.2")]);
    let mut rm = RunManager::with_connector(config, settings(), Arc::new(bench)).unwrap();

    let mut clash = rm.mg("A").unwrap().config().clone();
    clash.name = "B".to_string();
    assert!(matches!(
        rm.add_motion_group(clash),
        Err(ActorError::Conflict { .. })
    ));

    let removed = rm.remove_motion_group("A").unwrap();
    assert_eq!(removed.name(), "A");
    assert!(rm.mgs().is_empty());
    assert!(rm.config().motion_groups.is_empty());
}

#[test]
fn test_unreachable_motor_fails_the_run() {
    let bench = SimulatedBench::new();
    bench.drive("10.0.0.4").refuse_connections(true);
    let config = run_config(&[
        group("A", "10.0.0.1", "10.0.0.2"),
        group("B", "10.0.0.3", "10.0.0.4"),
    ]);
    let err = RunManager::with_connector(config, settings(), Arc::new(bench)).unwrap_err();
    assert!(err.is_connection_error());
}

#[test]
fn test_heartbeats_start_and_stop() {
    let bench = SimulatedBench::new();
    let config = run_config(&[group("A", "10.0.0.1", "10.0.0.2")]);
    let rm = RunManager::with_connector(config, settings(), Arc::new(bench.clone())).unwrap();

    rm.run().unwrap();
    let before = bench.drive("10.0.0.1").received().len();
    std::thread::sleep(Duration::from_millis(150));
    assert!(bench.drive("10.0.0.1").received().len() > before);

    rm.terminate();
    assert!(!rm.mg("A").unwrap().drive().axes()[0].motor().is_running());
}
