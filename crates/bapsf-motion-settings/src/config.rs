//! Run configuration
//!
//! A run is a named collection of motion groups. Each motion group
//! describes one probe drive (its axes and motor addresses), the
//! coordinate transform of that drive and the motion builder that lays
//! out the points to visit.
//!
//! ```toml
//! [run]
//! name = "Plane sweep"
//!
//! [run.motion_group.0]
//! name = "P32 XY"
//!
//! [run.motion_group.0.drive]
//! name = "XY drive"
//!
//! [run.motion_group.0.drive.axes.0]
//! name = "X"
//! ip = "192.168.6.104"
//! units = "cm"
//! units_per_rev = 0.254
//! ```

use bapsf_motion_core::{validate_ip, Unit};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{error, warn};

use crate::error::{SettingsError, SettingsResult};
use crate::indexed::IndexedList;

/// Keys that may hold the motion groups of a run
const MOTION_GROUP_KEYS: [&str; 2] = ["motion_group", "mg"];

/// Timestamp format stamped on every loaded run
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// One motor axis of a drive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    /// Axis name, e.g. `"X"`
    pub name: String,
    /// IPv4 address of the motor
    pub ip: String,
    /// Unit the axis is commanded in
    pub units: Unit,
    /// Axis units travelled per motor revolution
    pub units_per_rev: f64,
}

impl AxisConfig {
    pub fn validate(&self) -> SettingsResult<()> {
        validate_ip(&self.ip)?;
        if !(self.units_per_rev.is_finite() && self.units_per_rev != 0.0) {
            return Err(SettingsError::invalid(
                format!("{}.units_per_rev", self.name),
                format!("must be a non-zero number, got {}", self.units_per_rev),
            ));
        }
        Ok(())
    }
}

/// A named set of axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriveConfig {
    pub name: String,
    pub axes: IndexedList<AxisConfig>,
}

impl DriveConfig {
    pub fn validate(&self) -> SettingsResult<()> {
        if self.axes.is_empty() {
            return Err(SettingsError::invalid(
                format!("{}.axes", self.name),
                "a drive needs at least one axis",
            ));
        }
        self.axes.iter().try_for_each(AxisConfig::validate)
    }

    /// Motor IPs of every axis
    pub fn ips(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|axis| axis.ip.as_str())
    }
}

/// Transform type tag plus its type-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(rename = "type")]
    pub transform_type: String,
    #[serde(flatten)]
    pub params: toml::Table,
}

impl TransformConfig {
    /// Parameters including the `type` key
    pub fn as_table(&self) -> toml::Table {
        let mut table = self.params.clone();
        table.insert("type".into(), self.transform_type.clone().into());
        table
    }
}

/// One motion space axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpaceAxisConfig {
    pub label: String,
    /// Inclusive `[min, max]`
    pub range: [f64; 2],
    /// Number of grid points
    pub num: usize,
}

/// Motion space, either a named preset or explicit axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpaceConfig {
    Preset(String),
    Axes(IndexedList<SpaceAxisConfig>),
}

/// Layers and exclusions of a motion builder, each tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotionBuilderConfig {
    pub space: SpaceConfig,
    #[serde(default, skip_serializing_if = "IndexedList::is_empty")]
    pub layers: IndexedList<toml::Table>,
    #[serde(default, skip_serializing_if = "IndexedList::is_empty")]
    pub exclusions: IndexedList<toml::Table>,
}

/// One drive with its transform and motion builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionGroupConfig {
    pub name: String,
    pub drive: DriveConfig,
    pub transform: TransformConfig,
    pub motion_builder: MotionBuilderConfig,
    /// Keys this crate does not interpret
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub user: toml::Table,
}

impl MotionGroupConfig {
    const KNOWN_KEYS: [&'static str; 5] = ["name", "drive", "transform", "motion_builder", "user"];

    /// Parse a motion group table, collecting unknown keys under `user`
    pub fn from_table(table: toml::Table) -> SettingsResult<Self> {
        for key in ["name", "drive", "transform", "motion_builder"] {
            if !table.contains_key(key) {
                return Err(SettingsError::MissingKey(format!("motion_group.{key}")));
            }
        }

        let (known, extra) = split_user_keys(table, &Self::KNOWN_KEYS);
        let mut config: Self = toml::Value::Table(known).try_into()?;
        config.user.extend(extra);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SettingsResult<()> {
        if self.name.trim().is_empty() {
            return Err(SettingsError::invalid("motion_group.name", "must not be empty"));
        }
        self.drive.validate()
    }
}

/// Configuration of a complete data run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub date: String,
    #[serde(rename = "motion_group", default)]
    pub motion_groups: IndexedList<MotionGroupConfig>,
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub user: toml::Table,
}

#[derive(Serialize)]
struct RunDocument<'a> {
    run: &'a RunConfig,
}

impl RunConfig {
    /// Parse a TOML document, with or without the `[run]` header
    pub fn from_toml_str(content: &str) -> SettingsResult<Self> {
        let table: toml::Table = toml::from_str(content)?;
        Self::from_table(table)
    }

    /// Build from a parsed document.
    ///
    /// Motion groups sharing a name, or sharing a motor IP, are dropped
    /// with an error log rather than failing the whole run.
    pub fn from_table(mut table: toml::Table) -> SettingsResult<Self> {
        if let Some(run) = table.remove("run") {
            table = match run {
                toml::Value::Table(run) => run,
                other => {
                    return Err(SettingsError::invalid(
                        "run",
                        format!("expected a table, got {}", other.type_str()),
                    ))
                }
            };
        }

        let date = chrono::Utc::now().format(DATE_FORMAT).to_string();
        let name = match table.remove("name") {
            Some(toml::Value::String(name)) => name,
            Some(other) => {
                return Err(SettingsError::invalid(
                    "name",
                    format!("expected a string, got {}", other.type_str()),
                ))
            }
            None => {
                let name = format!("run [{date}]");
                warn!(
                    "Run configuration is missing a unique name for the run, naming the configuration '{}'",
                    name
                );
                name
            }
        };
        table.remove("date");

        let mut raw_groups = Vec::new();
        for key in MOTION_GROUP_KEYS {
            if let Some(value) = table.remove(key) {
                raw_groups.extend(collect_motion_groups(value));
            }
        }
        if raw_groups.is_empty() {
            error!("The run configuration has no defined motion groups");
        }

        let motion_groups = raw_groups
            .into_iter()
            .map(MotionGroupConfig::from_table)
            .collect::<SettingsResult<Vec<_>>>()?;
        let motion_groups = drop_shared_ips(drop_duplicate_names(motion_groups));

        // whatever is left over is user metadata
        let mut user = table;
        if let Some(toml::Value::Table(explicit)) = user.remove("user") {
            user.extend(explicit);
        }

        Ok(Self {
            name,
            date,
            motion_groups: motion_groups.into(),
            user,
        })
    }

    /// Load and validate a run configuration file
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Write the configuration under a `[run]` header
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// The configuration as a TOML document under a `[run]` header
    pub fn to_toml_string(&self) -> SettingsResult<String> {
        Ok(toml::to_string(&RunDocument { run: self })?)
    }

    /// Rename the run
    pub fn update_run_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Motion group by name
    pub fn motion_group(&self, name: &str) -> Option<&MotionGroupConfig> {
        self.motion_groups.iter().find(|mg| mg.name == name)
    }
}

/// Split a table into recognised keys and everything else
fn split_user_keys(table: toml::Table, known: &[&str]) -> (toml::Table, toml::Table) {
    table
        .into_iter()
        .partition(|(key, _)| known.contains(&key.as_str()))
}

/// A single motion group (has `name`) or a table of them keyed by index
fn collect_motion_groups(value: toml::Value) -> Vec<toml::Table> {
    let candidates = match value {
        toml::Value::Table(table) if table.contains_key("name") => vec![toml::Value::Table(table)],
        toml::Value::Table(table) => {
            // "10" sorts after "9"
            let mut entries: Vec<(String, toml::Value)> = table.into_iter().collect();
            entries.sort_by_key(|(key, _)| (key.parse::<usize>().unwrap_or(usize::MAX), key.clone()));
            entries.into_iter().map(|(_, v)| v).collect()
        }
        toml::Value::Array(items) => items,
        other => {
            error!(
                "Expected a table for the motion group configuration, but got {}",
                other.type_str()
            );
            return Vec::new();
        }
    };

    candidates
        .into_iter()
        .filter_map(|candidate| match candidate {
            toml::Value::Table(table) => Some(table),
            other => {
                error!(
                    "Expected a table for the motion group configuration, but got {}",
                    other.type_str()
                );
                None
            }
        })
        .collect()
}

fn drop_duplicate_names(groups: Vec<MotionGroupConfig>) -> Vec<MotionGroupConfig> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for mg in &groups {
        *counts.entry(mg.name.as_str()).or_default() += 1;
    }
    let duplicates: HashSet<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect();

    if duplicates.is_empty() {
        return groups;
    }
    error!(
        "All configured motion groups must have unique names, found duplicates for {:?}. Removing motion groups with duplicate names.",
        sorted(&duplicates)
    );
    groups
        .into_iter()
        .filter(|mg| !duplicates.contains(&mg.name))
        .collect()
}

fn drop_shared_ips(groups: Vec<MotionGroupConfig>) -> Vec<MotionGroupConfig> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for ip in groups.iter().flat_map(|mg| mg.drive.ips()) {
        *counts.entry(ip).or_default() += 1;
    }
    let duplicates: HashSet<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(ip, _)| ip.to_string())
        .collect();

    if duplicates.is_empty() {
        return groups;
    }
    error!(
        "All configured motion groups must have unique motor IP addresses, found duplicates for {:?}. Removing motion groups with shared IPs.",
        sorted(&duplicates)
    );
    groups
        .into_iter()
        .filter(|mg| !mg.drive.ips().any(|ip| duplicates.contains(ip)))
        .collect()
}

fn sorted(set: &HashSet<String>) -> Vec<&str> {
    let mut items: Vec<&str> = set.iter().map(String::as_str).collect();
    items.sort_unstable();
    items
}
