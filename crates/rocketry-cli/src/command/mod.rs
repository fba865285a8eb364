use clap::{Parser, Subcommand};

use self::{evaluate::EvaluateArg, train::TrainArg};

mod evaluate;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Evolve rocket controllers and save the best one
    Train(#[clap(flatten)] TrainArg),
    /// Fly one episode with a saved controller
    Evaluate(#[clap(flatten)] EvaluateArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Evaluate(arg) => evaluate::run(&arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn test_command_definition() {
        CommandArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_train_overrides() {
        let args = CommandArgs::try_parse_from([
            "rocketry",
            "train",
            "--epochs",
            "5",
            "--seed",
            "42",
            "--population",
            "12",
            "--max-episode-time",
            "30",
        ])
        .unwrap();
        let Mode::Train(arg) = args.mode else {
            panic!("expected train");
        };
        assert_eq!(arg.epochs, 5);
        assert_eq!(arg.seed, Some(42));
        assert_eq!(arg.population, Some(12));
        assert_eq!(arg.max_episode_time, Some(30.0));
    }

    #[test]
    fn test_parse_evaluate() {
        let args = CommandArgs::try_parse_from(["rocketry", "evaluate", "best.json"]).unwrap();
        let Mode::Evaluate(arg) = args.mode else {
            panic!("expected evaluate");
        };
        assert_eq!(arg.model.to_str(), Some("best.json"));
    }
}
