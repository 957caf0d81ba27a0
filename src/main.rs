use anyhow::Context;
use bapsf_motion::{
    init_logging, transform_factory, MotionBuilder, MotionGroupConfig, MotorSettings, RunConfig,
    RunManager, SimulatedBench, BUILD_DATE, VERSION,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Probe drive motion control for the LaPD
#[derive(Parser, Debug)]
#[command(name = "bapsf-motion")]
#[command(version)]
#[command(about = "Load a run configuration and optionally connect its motion groups")]
struct Args {
    /// Run configuration file (TOML)
    config: PathBuf,

    /// Connect to every motor of the run
    #[arg(short, long)]
    connect: bool,

    /// Connect to simulated drives instead of hardware
    #[arg(short, long, requires = "connect")]
    simulate: bool,
}

/// Build the transform and motion list of one motion group without any motor
fn summarize(config: &MotionGroupConfig) -> anyhow::Result<()> {
    let naxes = config.drive.axes.len();
    let transform = transform_factory(naxes, &config.transform.as_table())
        .with_context(|| format!("Failed to build transform for '{}'", config.name))?;
    let mut mb = MotionBuilder::from_config(&config.motion_builder)
        .with_context(|| format!("Failed to build motion builder for '{}'", config.name))?;

    let npoints = match mb.motion_list()? {
        Some(ml) => {
            transform
                .to_drive(ml.view())
                .with_context(|| format!("Motion list of '{}' has no drive equivalent", config.name))?;
            ml.nrows()
        }
        None => 0,
    };
    info!(
        motion_group = %config.name,
        transform = transform.transform_type(),
        space = ?mb.space().labels(),
        npoints,
        "Motion group summary"
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging()?;
    info!(version = VERSION, build_date = BUILD_DATE, "bapsf-motion starting");

    let config = RunConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load run configuration {}", args.config.display()))?;
    info!(run = %config.name, date = %config.date, motion_groups = config.motion_groups.len(), "Run configuration loaded");

    for mg_config in config.motion_groups.iter() {
        summarize(mg_config)?;
    }

    if !args.connect {
        return Ok(());
    }

    let manager = if args.simulate {
        RunManager::with_connector(config, MotorSettings::default(), Arc::new(SimulatedBench::new()))
    } else {
        RunManager::new(config)
    }
    .context("Failed to connect the run")?;

    let report = manager.mgs().iter().try_for_each(|mg| {
        let position = mg
            .position()
            .with_context(|| format!("Failed to read position of '{}'", mg.name()))?;
        info!(motion_group = mg.name(), ?position, "Probe position");
        anyhow::Ok(())
    });
    manager.terminate();
    report
}
