//! `brd-consolidate` - consolidate a plain-text requirements document
//!
//! Reads a UTF-8 text file, runs the consolidation pipeline and writes the
//! numbered requirements as JSON records or a delimited export.
//!
//! Exit codes: 0 on success, 1 on run failure, 2 when the document holds no
//! requirement text.

use anyhow::{bail, Context, Result};
use brd_engine::{ConsolidationError, ConsolidationPipeline, ConsolidationReport, EngineConfig};
use brd_oracle::{GeminiConfig, GeminiOracle, SharedOracle};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the oracle API key
const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Extensions of document formats that need conversion to text first
const BINARY_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "odt", "rtf"];

const EXIT_RUN_FAILURE: u8 = 1;
const EXIT_EMPTY_INPUT: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Csv,
}

impl Format {
    fn from_name(name: &str) -> Result<Self> {
        match name {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => bail!("unknown output format: {other}"),
        }
    }
}

fn cli() -> Command {
    Command::new("brd-consolidate")
        .version(brd_engine::VERSION)
        .about("Consolidate a business-requirements document into numbered requirements")
        .arg(
            Arg::new("input")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Plain-text document to consolidate"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration (TOML)"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .default_value("json")
                .value_parser(["json", "csv"])
                .help("Output format"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_parser(value_parser!(PathBuf))
                .help("Write output to a file instead of stdout"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Abort the run on the first failed cluster"),
        )
        .arg(
            Arg::new("no-oracle")
                .long("no-oracle")
                .action(ArgAction::SetTrue)
                .help("Phrase requirements by concatenation only"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .help("Oracle model name"),
        )
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .help("Oracle base URL"),
        )
        .arg(
            Arg::new("audit")
                .long("audit")
                .action(ArgAction::SetTrue)
                .help("Include failures, audit log and statistics (JSON) or print them to stderr (CSV)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match run(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    let empty = err
        .downcast_ref::<ConsolidationError>()
        .is_some_and(ConsolidationError::is_empty_input);
    if empty {
        EXIT_EMPTY_INPUT
    } else {
        EXIT_RUN_FAILURE
    }
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let input = matches
        .get_one::<PathBuf>("input")
        .context("no input document given")?;
    let format = Format::from_name(
        matches
            .get_one::<String>("format")
            .map_or("json", String::as_str),
    )?;

    let text = read_document(input)?;
    let config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?
        .with_strict_mode(matches.get_flag("strict"))
        .with_oracle(!matches.get_flag("no-oracle"));

    let mut pipeline =
        ConsolidationPipeline::new(config).context("invalid engine configuration")?;
    if let Some(oracle) = build_oracle(matches)? {
        pipeline = pipeline.with_oracle(oracle);
    }
    info!(
        input = %input.display(),
        oracle = pipeline.uses_oracle(),
        "consolidating document"
    );

    let report = pipeline
        .run(&text)
        .await
        .with_context(|| format!("failed to consolidate {}", input.display()))?;

    let rendered = render(&report, format, matches.get_flag("audit"))?;
    match matches.get_one::<PathBuf>("output") {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn read_document(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if let Some(extension) = extension.filter(|e| BINARY_EXTENSIONS.contains(&e.as_str())) {
        bail!(
            "{} is a .{extension} document; convert it to plain text first",
            path.display()
        );
    }

    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    EngineConfig::from_toml_str(&source)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn build_oracle(matches: &ArgMatches) -> Result<Option<SharedOracle>> {
    if matches.get_flag("no-oracle") {
        return Ok(None);
    }
    let Some(api_key) = std::env::var(API_KEY_VAR)
        .ok()
        .filter(|key| !key.trim().is_empty())
    else {
        info!("{API_KEY_VAR} not set, phrasing by concatenation");
        return Ok(None);
    };

    let mut config = GeminiConfig::new(api_key);
    if let Some(model) = matches.get_one::<String>("model") {
        config = config.with_model(model);
    }
    if let Some(endpoint) = matches.get_one::<String>("endpoint") {
        config = config.with_endpoint(endpoint);
    }

    let oracle: SharedOracle =
        Arc::new(GeminiOracle::new(config).context("failed to build oracle client")?);
    Ok(Some(oracle))
}

fn render(report: &ConsolidationReport, format: Format, audit: bool) -> Result<String> {
    match format {
        Format::Json => {
            let mut json = if audit {
                serde_json::to_string_pretty(report)?
            } else {
                serde_json::to_string_pretty(&report.records())?
            };
            json.push('\n');
            Ok(json)
        }
        Format::Csv => {
            if audit {
                let summary = serde_json::json!({
                    "digest": report.digest,
                    "stats": report.stats,
                    "failures": report.failures,
                    "audit": report.audit,
                });
                eprintln!("{}", serde_json::to_string_pretty(&summary)?);
            }
            Ok(report.to_delimited(','))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const OTP_FLOW: &str = "User enters OTP.\nSystem validates OTP.\nIf OTP invalid, show error.";

    async fn report() -> ConsolidationReport {
        ConsolidationPipeline::new(EngineConfig::default())
            .unwrap()
            .run(OTP_FLOW)
            .await
            .unwrap()
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn test_flags_parse() {
        let matches = cli()
            .try_get_matches_from(["brd-consolidate", "brd.txt", "--format", "csv", "--strict"])
            .unwrap();
        assert_eq!(matches.get_one::<PathBuf>("input"), Some(&PathBuf::from("brd.txt")));
        assert_eq!(matches.get_one::<String>("format").map(String::as_str), Some("csv"));
        assert!(matches.get_flag("strict"));
        assert!(!matches.get_flag("no-oracle"));

        assert!(cli()
            .try_get_matches_from(["brd-consolidate", "brd.txt", "--format", "xml"])
            .is_err());
    }

    #[test]
    fn test_binary_documents_are_rejected() {
        let err = read_document(Path::new("requirements.PDF")).unwrap_err();
        assert!(err.to_string().contains("convert it to plain text"));
    }

    #[test]
    fn test_config_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "strict_mode = true\nmin_fragment_words = 3").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert!(config.strict_mode);
        assert_eq!(config.min_fragment_words, 3);
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_fragment_words = 0").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }

    #[tokio::test]
    async fn test_json_output_is_records() {
        let rendered = render(&report().await, Format::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value[0]["requirement_id"], "REQ-001");
        assert_eq!(value[0]["session"], "Unclassified");
    }

    #[tokio::test]
    async fn test_audit_json_carries_the_full_report() {
        let report = report().await;
        let rendered = render(&report, Format::Json, true).unwrap();
        let back: ConsolidationReport = serde_json::from_str(&rendered).unwrap();
        assert_eq!(back, report);
    }

    #[tokio::test]
    async fn test_csv_output_has_header() {
        let rendered = render(&report().await, Format::Csv, false).unwrap();
        assert!(rendered.starts_with("requirement_id,session,source_texts,requirement_text\r\n"));
    }

    #[tokio::test]
    async fn test_empty_input_maps_to_exit_code_two() {
        let err = ConsolidationPipeline::new(EngineConfig::default())
            .unwrap()
            .run("")
            .await
            .map_err(anyhow::Error::from)
            .context("failed to consolidate empty.txt")
            .unwrap_err();
        assert_eq!(exit_code(&err), EXIT_EMPTY_INPUT);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), EXIT_RUN_FAILURE);
    }
}
