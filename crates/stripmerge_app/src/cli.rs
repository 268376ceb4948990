// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line arguments and settings overrides.

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use stripmerge_engine::{EmptySourcePolicy, MergeSettings, MergeStrategy};

/// Bake the selected clips of an animation scene into a single clip
#[derive(Parser, Debug)]
#[command(name = "stripmerge", version)]
pub struct Cli {
    /// Input scene (RON).
    pub scene: PathBuf,

    /// Output scene path. Defaults to overwriting the input.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Merge settings file (RON).
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Merge strategy, overriding the settings file.
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Name of the new source, track and clip.
    #[arg(long)]
    pub name: Option<String>,

    /// Leave clips without animated channels out of the merge.
    #[arg(long, default_value_t = false)]
    pub skip_empty: bool,

    /// Bake every component of a vector property once any one is animated.
    #[arg(long, default_value_t = false)]
    pub expand_vectors: bool,

    /// Print the summary as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Log progress and per-frame diagnostics.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// `--strategy` values
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    /// Sample the layered result at every frame
    Resample,
    /// Copy keyframes clip after clip
    Concatenate,
}

impl From<StrategyArg> for MergeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Resample => MergeStrategy::Resample,
            StrategyArg::Concatenate => MergeStrategy::Concatenate,
        }
    }
}

impl Cli {
    /// Settings from `--settings` (or defaults) with the flags applied
    pub fn merge_settings(&self) -> anyhow::Result<MergeSettings> {
        let mut settings = match &self.settings {
            Some(path) => MergeSettings::load(path)
                .with_context(|| format!("load settings '{}'", path.display()))?,
            None => MergeSettings::default(),
        };
        self.apply_overrides(&mut settings);
        Ok(settings)
    }

    /// Apply command-line flags on top of loaded settings
    pub fn apply_overrides(&self, settings: &mut MergeSettings) {
        if let Some(strategy) = self.strategy {
            settings.strategy = strategy.into();
        }
        if let Some(name) = &self.name {
            settings.output_name.clone_from(name);
        }
        if self.skip_empty {
            settings.empty_sources = EmptySourcePolicy::Skip;
        }
        if self.expand_vectors {
            settings.expand_vector_components = true;
        }
    }

    /// Where the merged scene is written
    pub fn output_path(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.scene)
    }
}
