//! CLI entry point for the DTB script runner.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use dtb_emulator as _;
use dtb_script::errors::ScriptError;
use dtb_script::parser::parse_script;
use dtb_script::runner::run_file;
use serde_json as _;
#[cfg(test)]
use tempfile as _;
use tracing::Level;

const USAGE_TEXT: &str = "\
Usage: dtb-script <command> [options]

Commands:
  run   <script> [--json] [--verbose]  Run a script against an emulated board
  check <script>                       Parse a script without running it

Options:
  --json           Print the run report as JSON
  -v, --verbose    Log board calls and decoded events to stderr
  -h, --help       Show this help message

Examples:
  dtb-script run calibration.dtb
  dtb-script run calibration.dtb --json -v
  dtb-script check calibration.dtb
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(RunArgs),
    Check(CheckArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    input: PathBuf,
    json: bool,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct CheckArgs {
    input: PathBuf,
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
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        "check" => parse_check_args(args)
            .map(Command::Check)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_run_args(args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut json = false;
    let mut verbose = false;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--json" {
            json = true;
            continue;
        }

        if arg == "--verbose" || arg == "-v" {
            verbose = true;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(RunArgs {
        input,
        json,
        verbose,
    })
}

fn parse_check_args(args: impl Iterator<Item = OsString>) -> Result<CheckArgs, String> {
    let mut input: Option<PathBuf> = None;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(CheckArgs { input })
}

const fn log_level(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::WARN
    }
}

fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .with_writer(std::io::stderr)
        .init();
}

fn run_script(args: &RunArgs) -> Result<(), i32> {
    init_logging(args.verbose);

    let report = run_file(&args.input).map_err(|e| {
        eprintln!("{}", e.format_for_stderr());
        1
    })?;

    if args.json {
        println!("{}", report.to_json());
    } else {
        println!("{}", report.summary());
        println!("Ran {} OK", args.input.display());
    }
    Ok(())
}

fn check_script(args: &CheckArgs) -> Result<(), i32> {
    let source = fs::read_to_string(&args.input).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", args.input.display());
        1
    })?;

    let script = parse_script(&source).map_err(|e| {
        let mut error = ScriptError::from(e);
        if let Some(location) = error.location.as_mut() {
            location.file.clone_from(&args.input);
        }
        eprintln!("{}", error.format_for_stderr());
        1
    })?;

    println!("{}: {} commands", args.input.display(), script.len());
    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Run(args))) => match run_script(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Check(args))) => match check_script(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
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
