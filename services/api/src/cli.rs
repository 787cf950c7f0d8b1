use crate::commands::{run_check, run_labels, CheckArgs, LabelsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use visa_watch::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Visa Status Checker",
    about = "Check the published visa decision list for an application number",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the liveness server and the daily check (default command)
    Serve(ServeArgs),
    /// Run the decision check once, immediately
    Check(CheckArgs),
    /// Print the link labels the check would look for
    Labels(LabelsArgs),
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
        Command::Check(args) => run_check(args).await,
        Command::Labels(args) => run_labels(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["visa-watch-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn check_accepts_a_date_and_dry_run() {
        let cli = Cli::try_parse_from([
            "visa-watch-api",
            "check",
            "--today",
            "2025-06-09",
            "--dry-run",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Check(args)) => {
                assert!(args.dry_run);
                assert_eq!(args.today, NaiveDate::from_ymd_opt(2025, 6, 9));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let result = Cli::try_parse_from(["visa-watch-api", "labels", "--today", "9 June 2025"]);
        assert!(result.is_err());
    }
}
