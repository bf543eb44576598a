use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use surge_core::DEFAULT_REPORT_PORT;

fn parse_timeout(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s)
        .map_err(|err| format!("invalid timeout '{s}' (expected e.g. 5s, 500ms): {err}"))
}

#[derive(Debug, Parser)]
#[command(
    name = "surge",
    author,
    version,
    about = "Load/stress test report tooling",
    long_about = "surge collects and summarises the results of load and stress test runs.\n\nTest runs stream one record per finished case to a report server (UDP) or write a local CSV report. This tool runs that server, queries it, and recomputes the same summaries offline from report files.",
    after_help = "Examples:\n  surge server start --port 8765 --report-folder reports\n  surge dump --report-server localhost:8765\n  surge calc reports/ --group-minutes 30"
)]
pub struct Cli {
    /// Log filter (e.g. info, debug, surge_report=trace)
    #[arg(long, global = true, env = "SURGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recompute failure rates and time taken from report files or folders
    Calc(CalcArgs),

    /// Run the report server
    #[command(subcommand)]
    Server(ServerCommand),

    /// Print the current summary of a running report server
    Dump(DumpArgs),
}

#[derive(Debug, Args)]
pub struct CalcArgs {
    /// Report files, or folders whose files are all considered
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Width of a time group, in minutes
    #[arg(
        long,
        env = "SURGE_GROUP_MINUTES",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub group_minutes: u64,
}

#[derive(Debug, Subcommand)]
pub enum ServerCommand {
    /// Start listening for result records
    Start(ServerStartArgs),
}

#[derive(Debug, Args)]
pub struct ServerStartArgs {
    /// UDP port to listen on
    #[arg(long, env = "SURGE_PORT", default_value_t = DEFAULT_REPORT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "SURGE_BIND", default_value = "0.0.0.0")]
    pub bind: std::net::IpAddr,

    /// Width of a time group, in minutes
    #[arg(
        long,
        env = "SURGE_GROUP_MINUTES",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub group_minutes: u64,

    /// Folder for the rolling copy of received records
    #[arg(long, env = "SURGE_REPORT_FOLDER", default_value = "reports")]
    pub report_folder: PathBuf,

    /// Keep statistics only, write no report files
    #[arg(long)]
    pub no_report: bool,
}

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Report server as host[:port]
    #[arg(long, env = "SURGE_REPORT_SERVER", default_value = "localhost:8765")]
    pub report_server: String,

    /// How long to wait for the reply (e.g. 5s, 500ms)
    #[arg(long, value_parser = parse_timeout, default_value = "5s")]
    pub timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timeout_accepts_units_and_bare_seconds() {
        assert_eq!(parse_timeout("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_timeout("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_timeout("3"), Ok(Duration::from_secs(3)));
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn cli_parses_calc() {
        let parsed = Cli::try_parse_from([
            "surge",
            "calc",
            "a.csv",
            "reports",
            "--group-minutes",
            "30",
        ]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        assert_eq!(cli.log_level, "info");
        match cli.command {
            Command::Calc(args) => {
                assert_eq!(
                    args.paths,
                    vec![PathBuf::from("a.csv"), PathBuf::from("reports")]
                );
                assert_eq!(args.group_minutes, 30);
            }
            _ => panic!("expected calc command"),
        }
    }

    #[test]
    fn calc_rejects_zero_group_minutes() {
        assert!(Cli::try_parse_from(["surge", "calc", "a.csv", "--group-minutes", "0"]).is_err());
        assert!(Cli::try_parse_from(["surge", "calc"]).is_err());
    }

    #[test]
    fn cli_parses_server_start_defaults() {
        let cli = match Cli::try_parse_from(["surge", "server", "start"]) {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };
        match cli.command {
            Command::Server(ServerCommand::Start(args)) => {
                assert_eq!(args.port, 8765);
                assert_eq!(args.group_minutes, 60);
                assert_eq!(args.report_folder, PathBuf::from("reports"));
                assert!(!args.no_report);
            }
            _ => panic!("expected server start"),
        }
    }

    #[test]
    fn cli_parses_dump() {
        let cli = match Cli::try_parse_from([
            "surge",
            "--log-level",
            "debug",
            "dump",
            "--report-server",
            "10.0.0.5:9000",
            "--timeout",
            "500ms",
        ]) {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Dump(args) => {
                assert_eq!(args.report_server, "10.0.0.5:9000");
                assert_eq!(args.timeout, Duration::from_millis(500));
            }
            _ => panic!("expected dump command"),
        }
    }
}
