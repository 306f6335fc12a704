// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to the use cases.
// The only layer that prints results for the user.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

use crate::domain::image::Cifar10Class;
use crate::ml::evaluator::EvalScore;

#[derive(Parser, Debug)]
#[command(
    name = "cifar-convnet",
    version = "0.1.0",
    about = "Train a small convolutional network on CIFAR-10, then evaluate saved models."
)]
pub struct Cli {
    /// The subcommand to run (train or evaluate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on CIFAR-10 from: {}", args.data_dir);

    let report = TrainUseCase::new(args.into()).execute()?;

    println!("Test score: {:.4}", report.test_score.loss);
    println!("Test accuracy: {:.4}", report.test_score.accuracy);
    if let Some(best) = &report.best_checkpoint {
        println!("Best checkpoint: {} (epoch {}, val_loss {:.4})", best.stem, best.epoch, best.val_loss);
    }
    println!("Final model saved as: {}", report.final_model);
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let use_case = EvaluateUseCase::new(args.data_dir, args.artifact_dir, args.model);
    let (stem, score) = use_case.execute()?;

    println!("Model: {stem}");
    print_score(&score);
    Ok(())
}

fn print_score(score: &EvalScore) {
    println!("Test score: {:.4}", score.loss);
    println!("Test accuracy: {:.4} ({} images)", score.accuracy, score.samples);
    for class in Cifar10Class::ALL {
        if let Some(acc) = score.class_accuracy(class) {
            println!("  {:<10} {:.4}", class.name(), acc);
        }
    }
}
