//! Run manager, the owner of every motion group in a data run

use bapsf_motion_communication::{Connector, MotorSettings, TcpConnector};
use bapsf_motion_core::Result;
use bapsf_motion_settings::{MotionGroupConfig, RunConfig};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{ActorError, ActorResult};
use crate::motion_group::MotionGroup;

pub struct RunManager {
    config: RunConfig,
    mgs: Vec<MotionGroup>,
    settings: MotorSettings,
    connector: Arc<dyn Connector>,
}

impl RunManager {
    /// Build every motion group of `config` over TCP
    pub fn new(config: RunConfig) -> ActorResult<Self> {
        Self::with_connector(config, MotorSettings::default(), Arc::new(TcpConnector))
    }

    /// Build every motion group of `config` through `connector`.
    ///
    /// Any motion group that fails to build aborts the run and closes the
    /// groups built so far.
    pub fn with_connector(
        config: RunConfig,
        settings: MotorSettings,
        connector: Arc<dyn Connector>,
    ) -> ActorResult<Self> {
        let mut manager = Self {
            config: RunConfig {
                motion_groups: Vec::new().into(),
                ..config.clone()
            },
            mgs: Vec::new(),
            settings,
            connector,
        };

        for mg_config in config.motion_groups.iter() {
            if let Err(err) = manager.add_motion_group(mg_config.clone()) {
                error!("Failed to build motion group '{}': {}", mg_config.name, err);
                manager.terminate();
                return Err(err);
            }
        }
        info!(run = %manager.config.name, motion_groups = manager.mgs.len(), "Run manager ready");
        Ok(manager)
    }

    /// Run configuration including every current motion group
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn mgs(&self) -> &[MotionGroup] {
        &self.mgs
    }

    pub fn mg(&self, name: &str) -> Option<&MotionGroup> {
        self.mgs.iter().find(|mg| mg.name() == name)
    }

    pub fn mg_mut(&mut self, name: &str) -> Option<&mut MotionGroup> {
        self.mgs.iter_mut().find(|mg| mg.name() == name)
    }

    /// Build and add a motion group.
    ///
    /// Rejects a group whose name or motor IPs are already in use.
    pub fn add_motion_group(&mut self, config: MotionGroupConfig) -> ActorResult<()> {
        if self.mg(&config.name).is_some() {
            return Err(ActorError::Conflict {
                name: config.name,
                reason: "a motion group with this name already exists".to_string(),
            });
        }
        let in_use: Vec<&str> = self
            .mgs
            .iter()
            .flat_map(|mg| mg.config().drive.ips())
            .collect();
        if let Some(ip) = config.drive.ips().find(|ip| in_use.contains(ip)) {
            return Err(ActorError::Conflict {
                reason: format!("motor IP {ip} is already used by another motion group"),
                name: config.name,
            });
        }

        let mg = MotionGroup::with_connector(config, self.settings.clone(), Arc::clone(&self.connector))?;
        self.config.motion_groups.push(mg.config().clone());
        self.mgs.push(mg);
        Ok(())
    }

    /// Terminate and remove the named motion group
    pub fn remove_motion_group(&mut self, name: &str) -> Option<MotionGroup> {
        let index = self.mgs.iter().position(|mg| mg.name() == name)?;
        let mg = self.mgs.remove(index);
        mg.terminate();
        self.config.motion_groups.retain(|mgc| mgc.name != name);
        Some(mg)
    }

    /// Start every motor heartbeat
    pub fn run(&self) -> Result<()> {
        self.mgs.iter().try_for_each(MotionGroup::run)
    }

    pub fn is_moving(&self) -> bool {
        self.mgs.iter().any(MotionGroup::is_moving)
    }

    /// Stop every motion group's heartbeats and close their connections
    pub fn terminate(&self) {
        self.mgs.iter().for_each(MotionGroup::terminate);
        info!(run = %self.config.name, "Run manager terminated");
    }
}

impl std::fmt::Debug for RunManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunManager")
            .field("name", &self.config.name)
            .field("mgs", &self.mgs)
            .finish()
    }
}
