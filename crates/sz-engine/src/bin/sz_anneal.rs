use anyhow::Context;
use clap::{Parser, ValueEnum, ValueHint};
use std::path::PathBuf;
use sz_engine::{init_tracing, stdin_commands, OutcomeStatus, Supervisor, OPERATOR_INSTRUCTIONS};
use sz_types::{EngineConfig, SeedProfile};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "sz-anneal",
    version,
    about = "Anneal a static, spherically-symmetric metric towards a vacuum solution"
)]
struct Cli {
    /// JSON engine configuration; flags below override its values.
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Number of annealing iterations.
    #[arg(long)]
    runs: Option<u64>,

    #[arg(long)]
    neighbour_peak: Option<f64>,

    #[arg(long)]
    acceptance_scale: Option<f64>,

    #[arg(long)]
    temperature_scale: Option<f64>,

    /// Defaults to the number of runs.
    #[arg(long)]
    temperature_divisor: Option<f64>,

    /// Seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum)]
    seed_profile: Option<ProfileArg>,

    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Write the final run report as JSON.
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    Schwarzschild,
    Scaled,
}

impl From<ProfileArg> for SeedProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Schwarzschild => SeedProfile::Schwarzschild,
            ProfileArg::Scaled => SeedProfile::Scaled,
        }
    }
}

impl Cli {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => EngineConfig::default(),
        };

        let optimizer = &mut config.optimizer;
        if let Some(runs) = self.runs {
            optimizer.number_of_runs = runs;
            if self.temperature_divisor.is_none() {
                optimizer.temperature_divisor = runs as f64;
            }
        }
        if let Some(peak) = self.neighbour_peak {
            optimizer.neighbour_peak_scaling_factor = peak;
        }
        if let Some(scale) = self.acceptance_scale {
            optimizer.acceptance_probability_scaling_factor = scale;
        }
        if let Some(scale) = self.temperature_scale {
            optimizer.temperature_scaling_factor = scale;
        }
        if let Some(divisor) = self.temperature_divisor {
            optimizer.temperature_divisor = divisor;
        }
        if let Some(seed) = self.seed {
            optimizer.seed = Some(seed);
        }
        if let Some(profile) = self.seed_profile {
            config.grid.seed_profile = profile.into();
        }
        if let Some(millis) = self.poll_interval_ms {
            config.poll_interval_ms = millis;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let config = cli.engine_config()?;

    let supervisor = Supervisor::new(config, stdin_commands())?;
    info!("{}", OPERATOR_INSTRUCTIONS);
    let report = supervisor.execute()?;

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!("Run report written to {}", path.display());
    }

    if report.outcome.status() == OutcomeStatus::Failed {
        anyhow::bail!(
            "run failed: {}",
            report.outcome.failure.as_deref().unwrap_or("unknown failure")
        );
    }
    Ok(())
}
