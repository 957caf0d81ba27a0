use bapsf_motion::{MotionBuilder, MotorSettings, RunConfig, RunManager, SimulatedBench};
use std::sync::Arc;
use tempfile::TempDir;

const CONFIG: &str = r#"
[run]
name = "dry run"

[run.motion_group]
name = "P16"

[run.motion_group.drive]
name = "XY"

[run.motion_group.drive.axes.0]
name = "X"
ip = "192.168.6.104"
units = "cm"
units_per_rev = 0.254

[run.motion_group.drive.axes.1]
name = "Y"
ip = "192.168.6.103"
units = "cm"
units_per_rev = 0.254

[run.motion_group.transform]
type = "identity"

[run.motion_group.motion_builder]
space = "lapd_xy"

[run.motion_group.motion_builder.layers.0]
type = "grid"
limits = [[-5, 5], [-5, 5]]
npoints = [3, 3]
"#;

#[test]
fn test_config_file_to_simulated_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.toml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = RunConfig::load_from_file(&path).unwrap();
    assert_eq!(config.name, "dry run");
    assert_eq!(config.motion_groups.len(), 1);

    let mut mb = MotionBuilder::from_config(&config.motion_groups[0].motion_builder).unwrap();
    assert_eq!(mb.motion_list().unwrap().map(|ml| ml.nrows()), Some(9));

    let bench = SimulatedBench::new();
    let mut manager =
        RunManager::with_connector(config, MotorSettings::default(), Arc::new(bench.clone()))
            .unwrap();
    assert_eq!(bench.ips(), vec!["192.168.6.103", "192.168.6.104"]);

    let mg = manager.mg_mut("P16").unwrap();
    mg.move_ml(8).unwrap();
    let position = mg.position().unwrap();
    assert!((position[0] - 5.0).abs() < 1e-3);
    assert!((position[1] - 5.0).abs() < 1e-3);
    manager.terminate();
}

#[test]
fn test_saved_config_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.toml");

    let config = RunConfig::from_toml_str(CONFIG).unwrap();
    config.save_to_file(&path).unwrap();
    let reloaded = RunConfig::load_from_file(&path).unwrap();
    assert_eq!(reloaded.name, config.name);
    assert_eq!(reloaded.motion_groups, config.motion_groups);
}
