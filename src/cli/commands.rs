// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and their
// flags. Defaults reproduce the reference training run.

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the network on CIFAR-10 and save the best checkpoints
    Train(TrainArgs),

    /// Score a saved model on the CIFAR-10 test split
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing cifar-10-batches-bin (or the .bin files themselves)
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory for checkpoints, the final model and metrics
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Images per gradient step
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Number of full passes through the training split
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Dropout probability after the two pooling blocks
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Seed for weight initialisation and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Worker threads preparing batches
    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    /// Train on the raw images without flips, shifts and rotations
    #[arg(long)]
    pub no_augment: bool,

    /// Featurewise centering and std normalisation (global contrast normalisation)
    #[arg(long)]
    pub gcn: bool,

    /// ZCA whitening (not supported, rejected at startup)
    #[arg(long)]
    pub zca: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:     a.data_dir,
            artifact_dir: a.artifact_dir,
            batch_size:   a.batch_size,
            epochs:       a.epochs,
            lr:           a.lr,
            dropout:      a.dropout,
            seed:         a.seed,
            num_workers:  a.num_workers,
            augment:      !a.no_augment,
            gcn:          a.gcn,
            zca:          a.zca,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory containing cifar-10-batches-bin
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory the training run wrote to
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Model to load, e.g. "81.35" or "convnet.42-0.80"; defaults to the best checkpoint
    #[arg(long)]
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["cifar-convnet", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.epochs, 100);
        assert_eq!(cfg.lr, 1e-3);
        assert!(cfg.augment);
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "cifar-convnet", "train", "--epochs", "5", "--no-augment", "--gcn",
        ]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.epochs, 5);
        assert!(!cfg.augment);
        assert!(cfg.gcn);
    }

    #[test]
    fn test_evaluate_model_is_optional() {
        let cli = Cli::try_parse_from(["cifar-convnet", "evaluate", "--model", "81.35"]).unwrap();
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        assert_eq!(args.model.as_deref(), Some("81.35"));
    }
}
