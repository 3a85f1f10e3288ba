use crate::inspect::{run_analysis, run_plan, PlanArgs, RunArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use launchpad::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Launchpad Profile Analysis",
    about = "Serve and inspect change-aware profile analysis from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect or run the analysis pipeline against a profile document on disk
    Analysis {
        #[command(subcommand)]
        command: AnalysisCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AnalysisCommand {
    /// Show which categories would be rescored, without calling the scoring service
    Plan(PlanArgs),
    /// Analyze a profile with the configured scoring service
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Analysis {
            command: AnalysisCommand::Plan(args),
        } => run_plan(args),
        Command::Analysis {
            command: AnalysisCommand::Run(args),
        } => run_analysis(args).await,
    }
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
    fn analysis_run_parses_flags() {
        let cli = Cli::try_parse_from([
            "launchpad-api",
            "analysis",
            "run",
            "--profile",
            "profile.json",
            "--force-refresh",
            "--write",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Analysis {
                command: AnalysisCommand::Run(args),
            }) => {
                assert_eq!(args.profile, std::path::PathBuf::from("profile.json"));
                assert!(args.force_refresh);
                assert!(args.write);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["launchpad-api"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
