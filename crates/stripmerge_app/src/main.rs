// SPDX-License-Identifier: MIT OR Apache-2.0
//! `stripmerge` - bake selected NLA clips into one clip
//!
//! Loads a RON scene, merges its selected clips with the configured strategy,
//! writes the scene back and prints a summary.
//!
//! ## Logging
//!
//! Logs go to stderr through `tracing`. `RUST_LOG` overrides the defaults;
//! `--verbose` raises the merge crates to `debug`, which includes progress.

mod cli;
mod report;

use anyhow::Context as _;
use clap::Parser;
use cli::Cli;
use report::MergeSummary;
use stripmerge_engine::{merge_selected, ProgressControl};
use stripmerge_nla::Actor;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "stripmerge_app={level},stripmerge_engine={level},stripmerge_nla={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting stripmerge v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&cli) {
        tracing::error!("Merge failed: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = cli.merge_settings()?;
    let mut actor = Actor::load(&cli.scene)
        .with_context(|| format!("load scene '{}'", cli.scene.display()))?;

    let mut reporter = |percent: u8| {
        tracing::debug!("Merging '{}': {}%", cli.scene.display(), percent);
        ProgressControl::Continue
    };
    let result = merge_selected(&mut actor, &settings, &mut reporter)
        .with_context(|| format!("merge selected clips of '{}'", actor.name))?;

    let output = cli.output_path();
    actor
        .save(output)
        .with_context(|| format!("write scene '{}'", output.display()))?;

    let summary = MergeSummary::new(&actor, &result, output);
    if cli.json {
        println!("{}", summary.to_json().context("serialize summary")?);
    } else {
        print!("{summary}");
    }
    Ok(())
}
