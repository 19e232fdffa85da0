use clap::{Arg, ArgAction, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use rainflow::app_logic;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    let matches = Command::new("rainflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Streaming rainflow cycle counting with rainflow matrix and pseudo damage")
        .arg(
            Arg::new("run")
                .short('r')
                .long("run")
                .value_name("JOB")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Job file (YAML, or TOML with a .toml extension)")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Write the JSON report to FILE instead of stdout"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("More log output, repeat for trace level"),
        )
        .after_help("RUST_LOG overrides the level selected with -v.")
        .get_matches();

    let level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_writer(io::stderr).with_env_filter(filter).with_target(false).init();

    let Some(job) = matches.get_one::<PathBuf>("run") else {
        return ExitCode::FAILURE;
    };
    let output = matches.get_one::<PathBuf>("output");

    match app_logic::run(job, output.map(PathBuf::as_path)) {
        Ok(report) => {
            if output.is_none() {
                match report.to_json() {
                    Ok(json) => println!("{}", json),
                    Err(err) => {
                        error!("failed to serialize report: {}", err);
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
