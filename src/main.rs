//! request-gatekeeper - Bot-challenge classification for inbound HTTP requests
//!
//! A fast filter binary: reads one request JSON document from stdin,
//! writes the disposition JSON the edge layer consumes to stdout.
//!
//! # Usage
//!
//! ```bash
//! # As an edge-layer filter (reads JSON from stdin, writes JSON to stdout)
//! echo '{"method":"GET","path":"/dev/hello","signals":["token:absent"]}' | request-gatekeeper
//!
//! # With challenge mode override
//! request-gatekeeper --challenge-mode=interactive
//!
//! # Log-only mode (classify and audit, but allow everything)
//! request-gatekeeper --log-only
//! ```

use std::env;
use std::io::{self, BufRead, Write};

use request_gatekeeper::{
    audit::AuditLogger,
    config::{ChallengeMode, Config},
    engine::Gatekeeper,
    input::Request,
    output::{Disposition, EdgeResponse, Outcome},
};

/// Print version information
fn print_version() {
    println!("request-gatekeeper {}", env!("CARGO_PKG_VERSION"));
}

/// Print help message
fn print_help() {
    println!(
        r#"request-gatekeeper - Bot-challenge classification for inbound HTTP requests

USAGE:
    request-gatekeeper [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -v, --version           Print version information
    -m, --challenge-mode    Challenge mode: disabled, silent, interactive (default: silent)
    -d, --log-only          Classify and audit, but allow everything
    -c, --config PATH       Path to config file
    -p, --policy PATH       Path to policy file (overrides config)

ENVIRONMENT:
    GATEKEEPER_DISABLED=1   Disable the challenge layer (still logs)
    GATEKEEPER_LOG_ONLY=1   Classify but don't block or challenge

INPUT FORMAT:
    {{"method":"GET","path":"/dev/hello","headers":{{"user-agent":"curl/8.0"}},"signals":["token:absent"]}}
"#
    );
}

/// Parse command line arguments
struct Args {
    help: bool,
    version: bool,
    challenge_mode: Option<ChallengeMode>,
    log_only: bool,
    config_path: Option<String>,
    policy_path: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut result = Args {
            help: false,
            version: false,
            challenge_mode: None,
            log_only: false,
            config_path: None,
            policy_path: None,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-h" | "--help" => result.help = true,
                "-v" | "--version" => result.version = true,
                "-d" | "--log-only" => result.log_only = true,
                "-m" | "--challenge-mode" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.challenge_mode = ChallengeMode::from_str(&args[i]);
                    }
                }
                "-c" | "--config" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.config_path = Some(args[i].clone());
                    }
                }
                "-p" | "--policy" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.policy_path = Some(args[i].clone());
                    }
                }
                arg if arg.starts_with("--challenge-mode=") => {
                    let mode = arg.trim_start_matches("--challenge-mode=");
                    result.challenge_mode = ChallengeMode::from_str(mode);
                }
                arg if arg.starts_with("--config=") => {
                    let path = arg.trim_start_matches("--config=");
                    result.config_path = Some(path.to_string());
                }
                arg if arg.starts_with("--policy=") => {
                    let path = arg.trim_start_matches("--policy=");
                    result.policy_path = Some(path.to_string());
                }
                _ => {}
            }
            i += 1;
        }

        result
    }
}

fn main() {
    let args = Args::parse();

    // Handle help and version
    if args.help {
        print_help();
        return;
    }

    if args.version {
        print_version();
        return;
    }

    // Load configuration
    let mut config = if let Some(ref path) = args.config_path {
        Config::load_from(std::path::Path::new(path)).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config from {}: {}", path, e);
            Config::default()
        })
    } else {
        Config::load()
    };

    // Apply command-line overrides
    if let Some(mode) = args.challenge_mode {
        config.general.challenge_mode = mode;
    }
    if let Some(path) = args.policy_path {
        config.policy.file = Some(path);
    }
    if args.log_only {
        env::set_var("GATEKEEPER_LOG_ONLY", "1");
    }

    let challenge_mode = config.general.challenge_mode;

    // A malformed or ambiguous policy is fatal, never silently ignored
    let engine = match Gatekeeper::new(config.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: invalid policy: {}", e);
            std::process::exit(1);
        }
    };

    // Create audit logger
    let audit_path = if config.general.audit_log {
        config.audit_path()
    } else {
        None
    };
    let mut logger = AuditLogger::new(audit_path.as_deref());

    // Read JSON from stdin
    let stdin = io::stdin();
    let mut input_json = String::new();

    for line in stdin.lock().lines() {
        match line {
            Ok(line) => input_json.push_str(&line),
            Err(_) => break,
        }
    }

    // Handle empty input
    if input_json.trim().is_empty() {
        // No input = nothing to classify, allow
        let disposition = Disposition::allow(Default::default());
        let response = EdgeResponse::from_disposition(&disposition, challenge_mode);
        println!("{}", response.to_json());
        return;
    }

    // Parse input
    let request = match Request::from_json(&input_json) {
        Ok(request) => request,
        Err(e) => {
            // SECURITY: Fail closed on parse errors
            // Malformed input could be an evasion attempt
            eprintln!("Error: Failed to parse request (blocking): {}", e);
            let disposition =
                Disposition::matched(Outcome::Block, "malformed-input", Default::default());
            let response = EdgeResponse::from_disposition(&disposition, challenge_mode);
            println!("{}", response.to_json());
            return;
        }
    };

    // Check if disabled
    let disabled = engine.is_disabled();

    // Classify the request
    let disposition = engine.classify(&request);

    // Log the disposition
    if let Err(e) = logger.log_disposition(&request, &disposition, disabled) {
        eprintln!("Warning: Failed to write audit log: {}", e);
    }

    // Write the edge response to stdout
    let response = EdgeResponse::from_disposition(&disposition, challenge_mode);
    let json = response.to_json();
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "{}", json);
    let _ = handle.flush();
}
