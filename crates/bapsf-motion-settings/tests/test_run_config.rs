use bapsf_motion_settings::{RunConfig, SettingsError};
use tempfile::TempDir;

fn motion_group(name: &str, ips: [&str; 2]) -> String {
    format!(
        r#"
        name = "{name}"
        [drive]
        name = "XY"
        [drive.axes.0]
        name = "X"
        ip = "{x}"
        units = "cm"
        units_per_rev = 0.254
        [drive.axes.1]
        name = "Y"
        ip = "{y}"
        units = "cm"
        units_per_rev = 0.254
        [transform]
        type = "lapd_xy"
        pivot_to_center = 62.94
        pivot_to_drive = 133.51
        probe_axis_offset = 20.16
        [motion_builder]
        space = "lapd_xy"
        [motion_builder.layers.0]
        type = "grid"
        limits = [[0, 30], [-30, 30]]
        npoints = [11, 21]
        "#,
        x = ips[0],
        y = ips[1],
    )
}

/// Nest a motion group document under `[prefix]`
fn nested(prefix: &str, body: &str) -> String {
    let mut out = format!("[{prefix}]\n");
    for line in body.lines().map(str::trim) {
        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            out.push_str(&format!("[{prefix}.{header}]\n"));
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[test]
fn test_single_motion_group_with_run_header() {
    let doc = format!(
        "[run]\nname = \"sweep\"\noperator = \"someone\"\n{}",
        nested("run.motion_group", &motion_group("P32", ["192.168.6.104", "192.168.6.103"]))
    );
    let run = RunConfig::from_toml_str(&doc).unwrap();

    assert_eq!(run.name, "sweep");
    assert_eq!(run.motion_groups.len(), 1);
    assert_eq!(run.motion_groups[0].name, "P32");
    assert_eq!(run.user["operator"].as_str(), Some("someone"));
    assert!(run.date.ends_with(" UTC"));
}

#[test]
fn test_missing_name_gets_dated_default() {
    let doc = nested(
        "motion_group.0",
        &motion_group("P32", ["192.168.6.104", "192.168.6.103"]),
    );
    let run = RunConfig::from_toml_str(&doc).unwrap();
    assert_eq!(run.name, format!("run [{}]", run.date));
}

#[test]
fn test_duplicate_names_dropped() {
    let doc = format!(
        "name = \"dupes\"\n{}{}{}",
        nested("motion_group.0", &motion_group("A", ["10.0.0.1", "10.0.0.2"])),
        nested("motion_group.1", &motion_group("A", ["10.0.0.3", "10.0.0.4"])),
        nested("motion_group.2", &motion_group("B", ["10.0.0.5", "10.0.0.6"])),
    );
    let run = RunConfig::from_toml_str(&doc).unwrap();
    let names: Vec<&str> = run.motion_groups.iter().map(|mg| mg.name.as_str()).collect();
    assert_eq!(names, vec!["B"]);
}

#[test]
fn test_shared_ips_dropped() {
    let doc = format!(
        "name = \"shared\"\n{}{}{}",
        nested("motion_group.0", &motion_group("A", ["10.0.0.1", "10.0.0.2"])),
        nested("motion_group.1", &motion_group("B", ["10.0.0.2", "10.0.0.3"])),
        nested("motion_group.2", &motion_group("C", ["10.0.0.5", "10.0.0.6"])),
    );
    let run = RunConfig::from_toml_str(&doc).unwrap();
    let names: Vec<&str> = run.motion_groups.iter().map(|mg| mg.name.as_str()).collect();
    assert_eq!(names, vec!["C"]);
}

#[test]
fn test_invalid_group_fails_fast() {
    let doc = format!(
        "name = \"bad\"\n{}",
        nested("motion_group.0", &motion_group("A", ["10.0.0.1", "not-an-ip"])),
    );
    assert!(matches!(
        RunConfig::from_toml_str(&doc),
        Err(SettingsError::Core(_))
    ));
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.toml");

    let doc = format!(
        "name = \"persisted\"\n{}",
        nested("motion_group.0", &motion_group("P32", ["192.168.6.104", "192.168.6.103"])),
    );
    let run = RunConfig::from_toml_str(&doc).unwrap();
    run.save_to_file(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("[run]\n"));

    let reloaded = RunConfig::load_from_file(&path).unwrap();
    assert_eq!(reloaded.name, run.name);
    assert_eq!(reloaded.motion_groups, run.motion_groups);
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = RunConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, SettingsError::IoError(_)));
}
