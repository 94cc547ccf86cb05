use crate::reports::{run_ranking, run_report};
use crate::server;
use clap::{Args, Parser, Subcommand};
use recruiting::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Recruitment Portal",
    about = "Serve the recruitment portal or query its reports from the command line",
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
    /// Print an aggregate report as JSON
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
    /// Print the candidate ranking of a vacancy as JSON
    Ranking(RankingArgs),
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReportCommand {
    /// Vacancies opened per month
    VacanciesByMonth,
    /// Number of applicants per vacancy
    ApplicantsByVacancy,
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

#[derive(Args, Debug)]
pub(crate) struct RankingArgs {
    /// Vacancy whose ranking should be generated
    pub(crate) vacancy_id: i64,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report { command } => run_report(command).await,
        Command::Ranking(args) => run_ranking(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["recruiting-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn report_subcommands_use_kebab_case() {
        let cli = Cli::try_parse_from(["recruiting-api", "report", "applicants-by-vacancy"])
            .expect("parses");
        match cli.command {
            Some(Command::Report { command }) => {
                assert_eq!(command, ReportCommand::ApplicantsByVacancy)
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ranking_requires_a_numeric_vacancy() {
        let cli = Cli::try_parse_from(["recruiting-api", "ranking", "12"]).expect("parses");
        assert!(matches!(
            cli.command,
            Some(Command::Ranking(RankingArgs { vacancy_id: 12 }))
        ));
        assert!(Cli::try_parse_from(["recruiting-api", "ranking", "doce"]).is_err());
    }

    #[test]
    fn serve_accepts_bind_overrides() {
        let cli = Cli::try_parse_from(["recruiting-api", "serve", "--host", "0.0.0.0", "--port", "9000"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.port, Some(9000));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
