// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Strand CLI - runs the dispatcher walkthrough.

mod demo;
mod output;

use std::env;
use std::process;
use std::time::Duration;

use strand_rt::ActorConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_TICK_MS: u64 = 1000;

fn main() {
    output::init();
    init_tracing();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "demo" => cmd_demo(&args[2..]),
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("strand {}", env!("CARGO_PKG_VERSION"));
        }
        other => {
            eprintln!("{}: unknown command: {}", output::error_label(), other);
            print_usage();
            process::exit(1);
        }
    }
}

fn init_tracing() {
    // Logs go to stderr; RUST_LOG overrides the default filter.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("strand=info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_writer(std::io::stderr),
        )
        .init();

    // Task panics are contained and logged by the dispatcher; keep the
    // default hook's backtrace noise out of the log.
    std::panic::set_hook(Box::new(|info| {
        tracing::debug!(%info, "task panic");
    }));
}

fn print_usage() {
    println!(
        "{} {} - serialized task dispatcher",
        output::title("Strand"),
        output::version(env!("CARGO_PKG_VERSION"))
    );
    println!();
    println!("{}", output::section_header("Usage:"));
    println!("  strand <command> [args]");
    println!();
    println!("{}", output::section_header("Commands:"));
    println!(
        "  {} {}  Run the six-task walkthrough",
        output::command("demo"),
        output::arg("[--tick-ms N] [--capacity N]")
    );
    println!("  {}                             Show this help", output::command("help"));
    println!("  {}                          Show version", output::command("version"));
    println!();
    println!("{}", output::section_header("Environment:"));
    println!("  STRAND_QUEUE_CAPACITY   Queue capacity (default 10)");
    println!("  STRAND_THREAD_PREFIX    Task thread name prefix (default strand)");
    println!("  RUST_LOG                Log filter (default strand=info)");
}

fn parse_number(flag: &str, value: Option<&String>) -> u64 {
    match value.map(|v| v.parse::<u64>()) {
        Some(Ok(n)) => n,
        _ => {
            eprintln!("{}: {} expects a non-negative integer", output::error_label(), flag);
            process::exit(1);
        }
    }
}

fn cmd_demo(args: &[String]) {
    let mut config = match ActorConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", output::error_label(), e);
            process::exit(1);
        }
    };
    let mut tick_ms = DEFAULT_TICK_MS;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--tick-ms" => {
                tick_ms = parse_number("--tick-ms", args.get(i + 1));
                i += 1;
            }
            "--capacity" => {
                config.capacity = parse_number("--capacity", args.get(i + 1)) as usize;
                i += 1;
            }
            other => {
                eprintln!("{}: unknown option: {}", output::error_label(), other);
                process::exit(1);
            }
        }
        i += 1;
    }

    println!("{}", output::banner("enter service dispatch"));
    match demo::run(config, Duration::from_millis(tick_ms)) {
        Ok(summary) => {
            println!("{}", output::banner("quit service dispatch"));
            println!("{}", output::summary(&summary));
        }
        Err(e) => {
            eprintln!("{}: {}", output::error_label(), e);
            process::exit(1);
        }
    }
}
