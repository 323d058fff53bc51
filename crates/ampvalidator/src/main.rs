//! ampvalidator - CSS checks of the AMP validator
//!
//! Usage: ampvalidator <COMMAND> <FILE|->

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use log::info;
use serde_json::json;

use ampvalidator_css::{
    parse_stylesheet, tokenize_with_errors, validate_stylesheet, CssError, CssProfile, CssResult,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Tokenize,
    Parse,
    Validate,
    Format,
}

#[derive(Debug, PartialEq)]
struct Options {
    command: Command,
    /// `None` reads standard input
    input: Option<PathBuf>,
    profile: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("ampvalidator");

    if args.len() < 2 {
        print_usage(program);
        return ExitCode::FAILURE;
    }

    match args[1].as_str() {
        "--help" | "-h" => {
            print_usage(program);
            return ExitCode::SUCCESS;
        }
        "--version" | "-V" => {
            println!("ampvalidator {}", VERSION);
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let options = match parse_args(&args[1..]) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!("Run '{} --help' for usage", program);
            return ExitCode::FAILURE;
        }
    };

    match run(&options) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage(program: &str) {
    println!(
        r#"ampvalidator {} - CSS checks of the AMP validator

USAGE:
    {} <COMMAND> <FILE|-> [OPTIONS]

COMMANDS:
    tokenize          Print the token list as JSON
    parse             Print the stylesheet and errors as JSON
    validate          Print every error found, exit with 1 if there are any
    format            Print the stylesheet serialized back to CSS

OPTIONS:
    -h, --help        Print this help message
    -V, --version     Print version information
    --profile <PATH>  Validation profile (JSON) for parse, validate and format

EXAMPLES:
    {} validate ad.css --profile a4a.json
    cat style.css | {} parse -
"#,
        VERSION, program, program, program
    );
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut iter = args.iter();

    let command = match iter.next().map(String::as_str) {
        Some("tokenize") => Command::Tokenize,
        Some("parse") => Command::Parse,
        Some("validate") => Command::Validate,
        Some("format") => Command::Format,
        Some(other) => return Err(format!("Unknown command '{}'", other)),
        None => return Err("Missing command".to_string()),
    };

    let mut input = None;
    let mut profile = None;
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--profile" => match iter.next() {
                Some(path) => profile = Some(PathBuf::from(path)),
                None => return Err("--profile needs a path".to_string()),
            },
            "-" if input.is_none() => input = Some(None),
            path if input.is_none() && !path.starts_with("--") => {
                input = Some(Some(PathBuf::from(path)));
            }
            other => return Err(format!("Unexpected argument '{}'", other)),
        }
    }

    let Some(input) = input else {
        return Err("Missing input file (use '-' for stdin)".to_string());
    };

    Ok(Options {
        command,
        input,
        profile,
    })
}

fn read_input(input: &Option<PathBuf>) -> CssResult<String> {
    match input {
        Some(path) => fs::read_to_string(path).map_err(|source| CssError::Io {
            path: path.clone(),
            source,
        }),
        None => {
            let mut css = String::new();
            io::stdin()
                .read_to_string(&mut css)
                .map_err(|source| CssError::Io {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?;
            Ok(css)
        }
    }
}

/// Run a command; `Ok(false)` means the stylesheet had errors
fn run(options: &Options) -> CssResult<bool> {
    let css = read_input(&options.input)?;
    let profile = match &options.profile {
        Some(path) => CssProfile::from_file(path)?,
        None => CssProfile::default(),
    };

    let mut errors = Vec::new();
    let tokens = tokenize_with_errors(&css, 1, 0, &mut errors);

    if options.command == Command::Tokenize {
        print_json(&json!({ "tokens": tokens, "errors": errors }));
        return Ok(errors.is_empty());
    }

    let stylesheet = parse_stylesheet(&tokens, &profile.parser_config(), &mut errors);

    match options.command {
        Command::Parse => {
            print_json(&json!({ "stylesheet": stylesheet, "errors": errors }));
        }
        Command::Format => {
            println!("{}", stylesheet);
        }
        Command::Validate => {
            let urls = validate_stylesheet(&stylesheet, &profile, &mut errors);
            errors.sort_by_key(|e| (e.line, e.col));
            for error in &errors {
                println!("{}", error);
            }
            info!(
                "Checked {} rules and {} urls: {} errors",
                stylesheet.rules.len(),
                urls.len(),
                errors.len()
            );
        }
        Command::Tokenize => {}
    }

    Ok(errors.is_empty())
}

fn print_json(value: &serde_json::Value) {
    println!("{:#}", value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let options = parse_args(&args(&["validate", "a.css", "--profile", "p.json"])).unwrap();
        assert_eq!(options.command, Command::Validate);
        assert_eq!(options.input, Some(PathBuf::from("a.css")));
        assert_eq!(options.profile, Some(PathBuf::from("p.json")));
    }

    #[test]
    fn test_parse_args_stdin() {
        let options = parse_args(&args(&["parse", "-"])).unwrap();
        assert_eq!(options.command, Command::Parse);
        assert_eq!(options.input, None);
        assert_eq!(options.profile, None);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(&args(&["lint", "a.css"])).is_err());
        assert!(parse_args(&args(&["parse"])).is_err());
        assert!(parse_args(&args(&["parse", "a.css", "b.css"])).is_err());
        assert!(parse_args(&args(&["validate", "a.css", "--profile"])).is_err());
    }
}
