mod calc;
mod cli;
mod dump;
mod exit_codes;
mod server;

use clap::Parser;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = match cli::Cli::try_parse() {
        Ok(v) => v,
        Err(err) => {
            use clap::error::ErrorKind;
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    exit_codes::ExitCode::Success.as_i32()
                }
                _ => exit_codes::ExitCode::InvalidInput.as_i32(),
            };
            std::process::exit(code);
        }
    };

    init_tracing(&cli.log_level);

    let res = match cli.command {
        cli::Command::Calc(args) => calc::calc(args),
        cli::Command::Server(cli::ServerCommand::Start(args)) => server::start(args).await,
        cli::Command::Dump(args) => dump::dump(args).await,
    };

    let code = match res {
        Ok(()) => exit_codes::ExitCode::Success,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::ExitCode::RuntimeError
        }
    };
    std::process::exit(code.as_i32());
}
