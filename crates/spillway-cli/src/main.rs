//! CLI entry point for the Spillway simulator binary.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::info;
use serde_json as _;
use spillway_cli::load::{file_input, load_scenario};
use spillway_cli::render::{render_json, render_layout, render_report, render_write};
use spillway_cli::CliError;
use spillway_core::Scenario;
#[cfg(test)]
use tempfile as _;
use thiserror as _;

const USAGE_TEXT: &str = "\
Usage: spillway <command> [options]

Commands:
  run <scenario.json> [options]  Execute a scenario and report corrupted fields
  demo [options]                 Execute the built-in person-overflow scenario
  layout <scenario.json>         Print the region and field map

Options:
  -n, --length <bytes>  Override the requested read length
  -i, --input <file>    Read input bytes from a file instead of the scenario input
      --json            Print the write record and report as JSON
  -v, --verbose         Log regions, fields and writes at debug level
  -h, --help            Show this help message

Examples:
  spillway demo
  spillway run overflow.json --length 64
  spillway layout overflow.json
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(RunArgs),
    Layout(LayoutArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    scenario: Option<PathBuf>,
    length: Option<usize>,
    input: Option<PathBuf>,
    json: bool,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct LayoutArgs {
    scenario: PathBuf,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "run" => {
            let parsed = parse_run_args(args)?;
            if parsed.scenario.is_none() {
                return Err("missing scenario path".to_string());
            }
            Ok(ParseResult::Command(Command::Run(parsed)))
        }
        "demo" => {
            let parsed = parse_run_args(args)?;
            if parsed.scenario.is_some() {
                return Err("demo takes no scenario path".to_string());
            }
            Ok(ParseResult::Command(Command::Run(parsed)))
        }
        "layout" => parse_layout_args(args)
            .map(Command::Layout)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

#[allow(clippy::while_let_on_iterator)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut scenario: Option<PathBuf> = None;
    let mut length: Option<usize> = None;
    let mut input: Option<PathBuf> = None;
    let mut json = false;
    let mut verbose = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--verbose" || arg == "-v" {
            verbose = true;
            continue;
        }

        if arg == "--json" {
            json = true;
            continue;
        }

        if arg == "-n" || arg == "--length" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --length".to_string())?;
            let text = value.to_string_lossy();
            length = Some(
                text.parse()
                    .map_err(|_| format!("invalid length: {text}"))?,
            );
            continue;
        }

        if arg == "-i" || arg == "--input" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --input".to_string())?;
            input = Some(PathBuf::from(value));
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if scenario.is_some() {
            return Err("multiple scenario paths provided".to_string());
        }
        scenario = Some(PathBuf::from(arg));
    }

    Ok(RunArgs {
        scenario,
        length,
        input,
        json,
        verbose,
    })
}

fn parse_layout_args(args: impl Iterator<Item = OsString>) -> Result<LayoutArgs, String> {
    let mut scenario: Option<PathBuf> = None;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if scenario.is_some() {
            return Err("multiple scenario paths provided".to_string());
        }
        scenario = Some(PathBuf::from(arg));
    }

    let scenario = scenario.ok_or_else(|| "missing scenario path".to_string())?;
    Ok(LayoutArgs { scenario })
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .try_init();
}

fn resolve_scenario(args: &RunArgs) -> Result<Scenario, CliError> {
    let mut scenario = match &args.scenario {
        Some(path) => load_scenario(path)?,
        None => Scenario::person_overflow(),
    };
    if let Some(length) = args.length {
        scenario.read.length = length;
    }
    if let Some(input) = &args.input {
        scenario.read.input = file_input(input)?;
    }
    Ok(scenario)
}

fn run_simulation(args: &RunArgs) -> Result<(), CliError> {
    let scenario = resolve_scenario(args)?;
    let mut run = scenario.build()?;
    info!(
        "running read of {} bytes into `{}`",
        scenario.read.length, scenario.read.destination
    );

    let mut source = scenario.read.input.open();
    let outcome = run.run_once(&scenario.read.destination, scenario.read.length, &mut source)?;

    if args.json {
        println!("{}", render_json(&outcome)?);
    } else {
        print!("{}", render_layout(run.space(), run.view()));
        println!();
        print!("{}", render_write(run.space(), &outcome.write));
        println!();
        print!("{}", render_report(&outcome.report));
    }
    Ok(())
}

fn show_layout(path: &Path) -> Result<(), CliError> {
    let run = load_scenario(path)?.build()?;
    print!("{}", render_layout(run.space(), run.view()));
    Ok(())
}

fn report_error(error: &CliError) -> i32 {
    eprintln!("error: {error}");
    1
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Run(args))) => {
            init_logging(args.verbose);
            match run_simulation(&args) {
                Ok(()) => 0,
                Err(error) => report_error(&error),
            }
        }
        Ok(ParseResult::Command(Command::Layout(args))) => {
            init_logging(false);
            match show_layout(&args.scenario) {
                Ok(()) => 0,
                Err(error) => report_error(&error),
            }
        }
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
