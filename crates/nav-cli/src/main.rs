//! `navigator` binary: preview simulation and cache reports

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use nav_cli::{
    run_cache_workload, run_simulation, NavigatorConfig, SimulationOptions, WorkloadOptions,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

fn cli() -> Command {
    Command::new("navigator")
        .version(nav_cli::VERSION)
        .about("Benefits Navigator estimate preview and cache tooling")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (.toml, .yaml or .yml)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Drive a preview controller with a burst of edits")
                .arg(
                    Arg::new("edits")
                        .long("edits")
                        .default_value("10")
                        .value_parser(value_parser!(u32))
                        .help("Number of input edits"),
                )
                .arg(
                    Arg::new("interval-ms")
                        .long("interval-ms")
                        .default_value("100")
                        .value_parser(value_parser!(u64))
                        .help("Pause between edits"),
                )
                .arg(
                    Arg::new("failure-rate")
                        .long("failure-rate")
                        .default_value("0.0")
                        .value_parser(value_parser!(f64))
                        .help("Share of calculator calls that fail"),
                )
                .arg(
                    Arg::new("latency-ms")
                        .long("latency-ms")
                        .default_value("150")
                        .value_parser(value_parser!(u64))
                        .help("Simulated calculator latency"),
                )
                .arg(seed_arg()),
        )
        .subcommand(
            Command::new("cache-report")
                .about("Run synthetic traffic through the cache registry and print metrics")
                .arg(
                    Arg::new("ops")
                        .long("ops")
                        .default_value("1000")
                        .value_parser(value_parser!(usize))
                        .help("Operations per cache"),
                )
                .arg(
                    Arg::new("keys")
                        .long("keys")
                        .default_value("64")
                        .value_parser(value_parser!(usize))
                        .help("Distinct keys per cache"),
                )
                .arg(
                    Arg::new("write-ratio")
                        .long("write-ratio")
                        .default_value("0.3")
                        .value_parser(value_parser!(f64))
                        .help("Share of operations that write"),
                )
                .arg(seed_arg()),
        )
}

fn seed_arg() -> Arg {
    Arg::new("seed")
        .long("seed")
        .default_value("42")
        .value_parser(value_parser!(u64))
        .help("Random seed for reproducibility")
}

fn arg<T: Clone + Send + Sync + 'static>(args: &ArgMatches, name: &str) -> anyhow::Result<T> {
    args.get_one::<T>(name)
        .cloned()
        .with_context(|| format!("missing --{name}"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => NavigatorConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => NavigatorConfig::default(),
    };

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let options = SimulationOptions {
                edits: arg(args, "edits")?,
                interval: Duration::from_millis(arg(args, "interval-ms")?),
                failure_rate: arg(args, "failure-rate")?,
                latency: Duration::from_millis(arg(args, "latency-ms")?),
                seed: arg(args, "seed")?,
            };
            let report = run_simulation(&config, &options).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(("cache-report", args)) => {
            let options = WorkloadOptions {
                ops: arg(args, "ops")?,
                key_space: arg(args, "keys")?,
                write_ratio: arg(args, "write-ratio")?,
                seed: arg(args, "seed")?,
            };
            let view = run_cache_workload(&config.cache, &options).await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Some((other, _)) => anyhow::bail!("unknown command {other}"),
        None => anyhow::bail!("no command given"),
    }
    Ok(())
}
