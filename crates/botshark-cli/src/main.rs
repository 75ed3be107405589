use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use botshark_core::{AnalysisConfig, DecodedMessage, Protocol, ProtocolSet, Report};
use clap::{ArgAction, Parser, Subcommand};
use glob::glob;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("BOTSHARK_BUILD_COMMIT"),
    ", built ",
    env!("BOTSHARK_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "botshark")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Offline dissector for Sality v3 and ZeroAccess peer-to-peer C2 traffic.",
    long_about = None,
    after_help = "Examples:\n  botshark decode sality 390c17005d4d18a0c6950925e043f28e84d2145f7704e06e6f9a24\n  botshark decode zeroaccess cc3a060828948dabc9c0d199a548bf8c --summary\n  botshark pcap analyse capture.pcapng -o report.json"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode one hex-encoded message.
    Decode {
        /// Protocol to dissect with (sality, zeroaccess)
        protocol: Protocol,

        /// Message bytes as hex; whitespace and multiple arguments are joined
        #[arg(required = true, num_args = 1..)]
        hex: Vec<String>,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "summary")]
        pretty: bool,

        /// Print the one-line summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Operations on PCAP/PCAPNG inputs.
    Pcap {
        #[command(subcommand)]
        command: PcapCommands,
    },
}

#[derive(Subcommand, Debug)]
enum PcapCommands {
    /// Analyse a capture file and write a JSON report of the C2 traffic found.
    #[command(alias = "analyze")]
    #[command(
        after_help = "Examples:\n  botshark pcap analyse capture.pcapng -o report.json\n  botshark pcap analyze capture.pcap --stdout --protocol zeroaccess"
    )]
    Analyse {
        /// Path (or glob matching exactly one file) to a .pcap or .pcapng capture
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Dissectors to run: sality, zeroaccess or all
        #[arg(long, default_value = "all")]
        protocol: ProtocolSet,
    },
}

struct AnalyseArgs {
    input: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    quiet: bool,
    protocols: ProtocolSet,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Decode {
            protocol,
            hex,
            pretty,
            summary,
        } => cmd_decode(protocol, &hex, pretty, summary),
        Commands::Pcap { command } => match command {
            PcapCommands::Analyse {
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                protocol,
            } => {
                if pretty && compact {
                    Err(CliError::new(
                        "cannot use --pretty and --compact together",
                        Some("choose one output format".to_string()),
                    ))
                } else {
                    cmd_pcap_analyse(AnalyseArgs {
                        input,
                        report,
                        stdout,
                        pretty,
                        quiet,
                        protocols: protocol,
                    })
                }
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn cmd_decode(
    protocol: Protocol,
    hex_args: &[String],
    pretty: bool,
    summary: bool,
) -> Result<(), CliError> {
    let bytes = parse_hex_args(hex_args)?;
    debug!(%protocol, len = bytes.len(), "decoding message");

    let decoded = protocol.decode(&bytes).map_err(|err| {
        CliError::new(
            format!("{protocol} message rejected: {err}"),
            Some("check that the bytes are a complete message of the chosen protocol".to_string()),
        )
    })?;

    if summary {
        println!("{}", decoded.summary);
        return Ok(());
    }
    println!("{}", to_json(&decoded, pretty)?);
    Ok(())
}

fn parse_hex_args(hex_args: &[String]) -> Result<Vec<u8>, CliError> {
    let joined: String = hex_args
        .iter()
        .flat_map(|arg| arg.split_whitespace())
        .collect();
    let digits = joined
        .strip_prefix("0x")
        .or_else(|| joined.strip_prefix("0X"))
        .unwrap_or(&joined);
    hex::decode(digits).map_err(|err| {
        CliError::new(
            format!("invalid hex input: {err}"),
            Some("pass the message as hex digits, e.g. cc3a0608...".to_string()),
        )
    })
}

fn to_json(decoded: &DecodedMessage, pretty: bool) -> Result<String, CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(decoded)
    } else {
        serde_json::to_string(decoded)
    };
    json.context("JSON serialization failed").map_err(Into::into)
}

fn cmd_pcap_analyse(args: AnalyseArgs) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&args.input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;

    let report_path = match (args.stdout, args.report) {
        (true, _) => None,
        (false, Some(path)) => Some(path),
        (false, None) => {
            return Err(CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            ));
        }
    };
    if let Some(path) = report_path.as_ref() {
        ensure_distinct_from_input(path, &input_abs)?;
    }

    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", args.input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }

    let config = AnalysisConfig {
        protocols: args.protocols,
    };
    info!(input = %resolved_input.display(), protocols = %config.protocols, "analysing capture");
    let rep = botshark_core::analyze_pcap_file(&resolved_input, &config)
        .context("PCAP/PCAPNG analysis failed")?;
    let json = serialize_report(&rep, args.pretty)?;

    let Some(report) = report_path else {
        print!("{}", json);
        return Ok(());
    };
    if let Some(parent) = report.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(&report, json)
        .with_context(|| format!("Failed to write report: {}", report.display()))?;

    if !args.quiet {
        eprintln!(
            "OK: {} messages -> {}",
            rep.messages.len(),
            report.display()
        );
    }
    Ok(())
}

fn ensure_distinct_from_input(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    let parent = match report_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // A report directory that does not exist yet cannot contain the input.
    let Ok(report_dir) = fs::canonicalize(parent) else {
        return Ok(());
    };
    let file_name = report_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid report path: {}", report_path.display()))?;
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!(
                "report path must differ from input: {}",
                report_path.display()
            ),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn serialize_report(rep: &Report, pretty: bool) -> Result<String, CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(rep)
    } else {
        serde_json::to_string(rep)
    };
    json.context("JSON serialization failed").map_err(Into::into)
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    let mut matches = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    match matches.len() {
        0 => Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        )),
        1 => Ok(matches.remove(0)),
        count => {
            let mut listed = matches
                .iter()
                .take(3)
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            if count > 3 {
                listed.push_str(", ...");
            }
            Err(CliError::new(
                format!("multiple files match pattern '{pattern}' ({count} matches); matches: {listed}"),
                Some("pass a single capture file, or run once per file".to_string()),
            ))
        }
    }
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}

#[cfg(test)]
mod tests {
    use super::{is_glob_pattern, parse_hex_args};

    #[test]
    fn hex_args_tolerate_whitespace_and_prefix() {
        let args = vec!["0xcc3a 0608".to_string(), "2894\t8dab".to_string()];
        assert_eq!(
            parse_hex_args(&args).unwrap(),
            vec![0xcc, 0x3a, 0x06, 0x08, 0x28, 0x94, 0x8d, 0xab]
        );
    }

    #[test]
    fn odd_hex_is_rejected_with_hint() {
        let err = parse_hex_args(&["abc".to_string()]).unwrap_err();
        assert!(err.message.starts_with("invalid hex input"));
        assert!(err.hint.is_some());
    }

    #[test]
    fn glob_detection() {
        assert!(is_glob_pattern("captures/*.pcapng"));
        assert!(!is_glob_pattern("capture.pcapng"));
    }
}
