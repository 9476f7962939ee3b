use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bugrisk")]
#[command(about = "Bug-risk prediction from code metrics and git history", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to <repo>/.bugrisk.json when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mine history and static metrics into a labelled CSV dataset
    BuildDataset {
        /// Repository working copy
        #[arg(long)]
        repo: PathBuf,

        /// History window in months
        #[arg(long = "since-months", alias = "since_months", default_value = "12")]
        since_months: u32,

        /// Output CSV path
        #[arg(long)]
        out: PathBuf,
    },

    /// Cross-validate the candidate models and save the best one
    Train {
        /// Dataset CSV produced by build-dataset
        #[arg(long)]
        data: PathBuf,

        /// Output model artifact (JSON)
        #[arg(long = "model-out", alias = "model_out")]
        model_out: PathBuf,
    },

    /// Score a repository with a trained model and browse the results
    Dashboard {
        /// Repository working copy
        #[arg(long)]
        repo: PathBuf,

        /// Model artifact produced by train
        #[arg(long)]
        model: PathBuf,

        /// History window in months
        #[arg(long = "since-months", alias = "since_months", default_value = "6")]
        since_months: u32,

        /// Initial number of files in the top-risk view
        #[arg(long = "top-k", alias = "top_k", default_value = "20")]
        top_k: usize,

        /// Print tables instead of opening the interactive view
        #[arg(long)]
        plain: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn underscore_aliases_are_accepted() {
        let cli = Cli::try_parse_from([
            "bugrisk",
            "build-dataset",
            "--repo",
            ".",
            "--since_months",
            "3",
            "--out",
            "data.csv",
        ])
        .unwrap();
        match cli.command {
            Commands::BuildDataset { since_months, .. } => assert_eq!(since_months, 3),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["bugrisk", "train", "--data", "d.csv", "--model_out", "m.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Train { .. }));
    }

    #[test]
    fn dashboard_defaults_and_global_config() {
        let cli = Cli::try_parse_from([
            "bugrisk",
            "dashboard",
            "--repo",
            ".",
            "--model",
            "m.json",
            "--config",
            "settings.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("settings.json")));
        match cli.command {
            Commands::Dashboard {
                since_months,
                top_k,
                plain,
                ..
            } => {
                assert_eq!(since_months, 6);
                assert_eq!(top_k, 20);
                assert!(!plain);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
