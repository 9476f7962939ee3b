pub mod analysis;
pub mod cli;
pub mod commands;
pub mod dashboard;
pub mod error;
pub mod ml;
pub mod models;

pub use error::{Error, Result};

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use commands::{
    dataset::build_dataset,
    scoring::score_repository,
    settings::{load_settings, Settings},
    store::load_artifact,
    train::{summary_table, train_from_csv, TrainOptions},
};
use std::path::Path;

/// Settings for a repository given the global `--config` flag
fn settings_for(base: &Path, explicit: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings(base, explicit).with_context(|| format!("failed to load settings for {}", base.display()))
}

fn repo_label(repo: &Path) -> String {
    repo.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| repo.display().to_string())
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::BuildDataset {
            repo,
            since_months,
            out,
        } => {
            let settings = settings_for(&repo, config)?;
            let build = build_dataset(&repo, since_months, &out, &settings)
                .with_context(|| format!("failed to build dataset from {}", repo.display()))?;
            println!(
                "Wrote {} rows to {} (joined by {}, {} unreadable files)",
                build.rows.len(),
                out.display(),
                build.strategy.as_str(),
                build.unreadable.len()
            );
        }
        Commands::Train { data, model_out } => {
            // Without --config, a settings file next to the dataset applies
            let base = data.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let settings = settings_for(base, config)?;
            let options = TrainOptions {
                folds: settings.cv_folds,
                seed: settings.random_seed,
                ..TrainOptions::default()
            };
            let outcome = train_from_csv(&data, &model_out, &options)
                .with_context(|| format!("failed to train on {}", data.display()))?;
            println!("{}", summary_table(&outcome.reports, &outcome.artifact.model_name));
            println!(
                "Selected {} (mean F1 {:.3}); saved to {}",
                outcome.artifact.model_name,
                outcome.artifact.cv.mean_f1,
                model_out.display()
            );
        }
        Commands::Dashboard {
            repo,
            model,
            since_months,
            top_k,
            plain,
        } => {
            let outcome = load_settings(&repo, config).and_then(|settings| {
                let artifact = load_artifact(&model)?;
                score_repository(&repo, &artifact, since_months, &settings)
            });

            if plain {
                let report = outcome.with_context(|| format!("failed to score {}", repo.display()))?;
                print!("{}", dashboard::render_plain(&report, top_k));
            } else {
                let outcome = outcome.map_err(|e| {
                    log::error!("scoring failed: {e}");
                    e.to_string()
                });
                dashboard::run_dashboard(repo_label(&repo), outcome, top_k)?;
            }
        }
    }

    Ok(())
}
