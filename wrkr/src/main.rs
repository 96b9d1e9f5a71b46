mod api;
mod cli;
mod config_file;
mod exit_codes;
mod export_scenario;
mod init;
mod output;
mod report;
mod run;
mod run_error;
mod run_support;
mod runtime;
mod scenario_yaml;

use clap::Parser;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn init_tracing(quiet: bool) {
    let default_directive = if quiet { "error" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
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

    let quiet = matches!(&cli.command, cli::Command::Run(args) if args.quiet);
    init_tracing(quiet);

    let code = match cli.command {
        cli::Command::Run(args) => match run::run(args).await {
            Ok(code) => code.as_i32(),
            Err(err) => {
                eprintln!("{err}");
                err.exit_code().as_i32()
            }
        },
        cli::Command::Init(args) => match init::init(args).await {
            Ok(()) => exit_codes::ExitCode::Success.as_i32(),
            Err(err) => {
                eprintln!("{err:#}");
                exit_codes::ExitCode::RuntimeError.as_i32()
            }
        },
        cli::Command::ExportScenario(args) => {
            match export_scenario::export_scenario(args).await {
                Ok(code) => code.as_i32(),
                Err(err) => {
                    eprintln!("{err}");
                    err.exit_code().as_i32()
                }
            }
        }
    };

    std::process::exit(code);
}
