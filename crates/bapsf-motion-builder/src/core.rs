//! Motion builder
//!
//! Combines a motion space with its layers and exclusions and turns them
//! into the motion list, the ordered points a probe sweep visits.

use bapsf_motion_core::{LookupError, Result, ValidationError};
use bapsf_motion_settings::{IndexedList, MotionBuilderConfig, SpaceConfig};
use ndarray::{Array2, ArrayD};
use tracing::{debug, info};

use crate::exclusions::{exclusion_factory, ExclusionLayer};
use crate::layers::{layer_factory, MotionLayer};
use crate::space::MotionSpace;

/// Layers and exclusions over one motion space
#[derive(Debug)]
pub struct MotionBuilder {
    space_config: SpaceConfig,
    space: MotionSpace,
    layers: Vec<MotionLayer>,
    exclusions: Vec<ExclusionLayer>,
    motion_list: Option<Array2<f64>>,
}

impl MotionBuilder {
    /// Build the space, then every layer and exclusion from their
    /// `type`-tagged tables
    pub fn new(space: SpaceConfig, layers: &[toml::Table], exclusions: &[toml::Table]) -> Result<Self> {
        let mut builder = Self {
            space: MotionSpace::from_config(&space)?,
            space_config: space,
            layers: Vec::new(),
            exclusions: Vec::new(),
            motion_list: None,
        };
        for config in exclusions {
            builder.add_exclusion(config)?;
        }
        for config in layers {
            builder.add_layer(config)?;
        }
        Ok(builder)
    }

    pub fn from_config(config: &MotionBuilderConfig) -> Result<Self> {
        Self::new(config.space.clone(), &config.layers, &config.exclusions)
    }

    pub fn space(&self) -> &MotionSpace {
        &self.space
    }

    /// Global mask, `true` where motion is allowed
    pub fn mask(&self) -> &ArrayD<bool> {
        self.space.mask()
    }

    pub fn layers(&self) -> &[MotionLayer] {
        &self.layers
    }

    pub fn exclusions(&self) -> &[ExclusionLayer] {
        &self.exclusions
    }

    /// Add a layer, returning its name
    pub fn add_layer(&mut self, config: &toml::Table) -> Result<String> {
        let kind = layer_factory(self.space.ndims(), config)?;
        let layer = MotionLayer::attach(&mut self.space, kind)?;
        let name = layer.name().to_string();
        self.layers.push(layer);
        self.clear_motion_list();
        Ok(name)
    }

    pub fn remove_layer(&mut self, name: &str) -> Result<()> {
        let index = self
            .layers
            .iter()
            .position(|layer| layer.name() == name)
            .ok_or_else(|| unknown_item("layer", name))?;
        self.layers.remove(index);
        self.space.remove_layer(name);
        self.clear_motion_list();
        Ok(())
    }

    /// Add an exclusion and AND it into the global mask, returning its name
    pub fn add_exclusion(&mut self, config: &toml::Table) -> Result<String> {
        let kind = exclusion_factory(&self.space, config)?;
        let exclusion = ExclusionLayer::attach(&mut self.space, kind)?;
        let name = exclusion.name().to_string();
        self.exclusions.push(exclusion);
        self.clear_motion_list();
        Ok(name)
    }

    pub fn remove_exclusion(&mut self, name: &str) -> Result<()> {
        let index = self
            .exclusions
            .iter()
            .position(|exclusion| exclusion.name() == name)
            .ok_or_else(|| unknown_item("exclusion", name))?;
        self.exclusions.remove(index);
        self.space.remove_exclusion(name);
        self.clear_motion_list();
        self.rebuild_mask()
    }

    /// Whether the grid cell nearest to `point` is excluded by the global mask
    pub fn is_excluded(&self, point: &[f64]) -> Result<bool> {
        Ok(!self.space.is_allowed(point)?)
    }

    /// Collect the points of every layer that fall on allowed cells.
    ///
    /// Leaves the motion list unset when there are no layers.
    pub fn generate(&mut self) -> Result<()> {
        if self.layers.is_empty() {
            return Ok(());
        }

        let ndims = self.space.ndims();
        let mut data = Vec::new();
        for layer in &self.layers {
            let points = match layer.points(&self.space) {
                Some(points) => points.clone(),
                None => layer.generate()?,
            };
            let flat: Vec<f64> = points.iter().copied().collect();
            for point in flat.chunks_exact(ndims) {
                if self.space.is_allowed(point)? {
                    data.extend_from_slice(point);
                }
            }
        }

        let npoints = data.len() / ndims;
        let motion_list = Array2::from_shape_vec((npoints, ndims), data).map_err(|e| ValidationError::Shape {
            param: "motion list".to_string(),
            expected: format!("({npoints}, {ndims})"),
            actual: e.to_string(),
        })?;
        info!("Generated motion list with {} points", npoints);
        self.motion_list = Some(motion_list);
        Ok(())
    }

    /// The motion list, rebuilt on first access after any change
    pub fn motion_list(&mut self) -> Result<Option<&Array2<f64>>> {
        if self.motion_list.is_none() {
            self.rebuild_mask()?;
            self.generate()?;
        }
        Ok(self.motion_list.as_ref())
    }

    pub fn clear_motion_list(&mut self) {
        self.motion_list = None;
    }

    /// Reset the global mask and AND every exclusion back in
    pub fn rebuild_mask(&mut self) -> Result<()> {
        self.space.reset_mask();
        for exclusion in &self.exclusions {
            exclusion.update_global_mask(&mut self.space)?;
        }
        debug!("Rebuilt global mask from {} exclusion(s)", self.exclusions.len());
        Ok(())
    }

    pub fn config(&self) -> MotionBuilderConfig {
        MotionBuilderConfig {
            space: self.space_config.clone(),
            layers: IndexedList(self.layers.iter().map(MotionLayer::config).collect()),
            exclusions: IndexedList(self.exclusions.iter().map(ExclusionLayer::config).collect()),
        }
    }
}

fn unknown_item(kind: &str, name: &str) -> bapsf_motion_core::Error {
    LookupError::UnknownItem {
        kind: kind.to_string(),
        name: name.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> toml::Table {
        toml::from_str(text).unwrap()
    }

    fn lapd_builder() -> MotionBuilder {
        MotionBuilder::new(
            SpaceConfig::Preset("lapd_xy".into()),
            &[table("type = \"grid\"\nlimits = [[0, 30], [-30, 30]]\nnpoints = [11, 21]")],
            &[table("type = \"lapd-XY\"")],
        )
        .unwrap()
    }

    #[test]
    fn test_item_names() {
        let mut mb = lapd_builder();
        assert_eq!(mb.layers()[0].name(), "point_layer0");
        assert_eq!(mb.exclusions()[0].name(), "mask_ex0");

        let name = mb.add_exclusion(&table("type = \"circle\"\nradius = 40")).unwrap();
        assert_eq!(name, "mask_ex1");
        mb.remove_exclusion("mask_ex0").unwrap();
        let name = mb.add_exclusion(&table("type = \"circle\"\nradius = 45")).unwrap();
        assert_eq!(name, "mask_ex0");
    }

    #[test]
    fn test_motion_list_skips_excluded_points() {
        let mut mb = lapd_builder();
        let ml = mb.motion_list().unwrap().unwrap().clone();
        assert!(ml.nrows() > 0 && ml.nrows() < 11 * 21);
        for point in ml.rows() {
            assert!(!mb.is_excluded(&point.to_vec()).unwrap());
        }
    }

    #[test]
    fn test_no_layers_no_motion_list() {
        let mut mb = MotionBuilder::new(SpaceConfig::Preset("lapd_xy".into()), &[], &[]).unwrap();
        assert!(mb.motion_list().unwrap().is_none());
    }

    #[test]
    fn test_remove_exclusion_restores_mask() {
        let mut mb = lapd_builder();
        assert!(mb.is_excluded(&[45.0, 15.0]).unwrap());
        mb.remove_exclusion("mask_ex0").unwrap();
        assert!(!mb.is_excluded(&[45.0, 15.0]).unwrap());
        assert!(mb.mask().iter().all(|&m| m));
    }

    #[test]
    fn test_remove_unknown_items() {
        let mut mb = lapd_builder();
        assert!(mb.remove_layer("point_layer7").unwrap_err().is_lookup_error());
        assert!(mb.remove_exclusion("mask_ex3").unwrap_err().is_lookup_error());
    }

    #[test]
    fn test_unknown_types_fail() {
        let err = MotionBuilder::new(
            SpaceConfig::Preset("lapd_xy".into()),
            &[table("type = \"spiral\"")],
            &[],
        )
        .unwrap_err();
        assert!(err.is_lookup_error());
    }

    #[test]
    fn test_config_round_trip() {
        let mb = lapd_builder();
        let rebuilt = MotionBuilder::from_config(&mb.config()).unwrap();
        assert_eq!(rebuilt.config(), mb.config());
        assert_eq!(rebuilt.mask(), mb.mask());
    }
}
