use crate::report::{run_report, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use ipd::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Invisible Population Detector",
    about = "Score district visibility gaps from enrolment and update activity",
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
    /// Print the dashboard summary, hotspots and action plan for a data directory
    Report(ReportArgs),
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
        Command::Report(args) => run_report(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["ipd"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn report_accepts_filters() {
        let cli = Cli::try_parse_from([
            "ipd",
            "report",
            "--data-dir",
            "fixtures",
            "--month",
            "2025-03",
            "--state",
            "Bihar",
            "--top-n",
            "5",
            "--json",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Report(args)) => {
                assert_eq!(args.month.as_deref(), Some("2025-03"));
                assert_eq!(args.state.as_deref(), Some("Bihar"));
                assert_eq!(args.top_n, 5);
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
