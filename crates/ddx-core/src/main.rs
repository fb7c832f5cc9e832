//! DDX - Diagnostic Reasoning Engine CLI
//!
//! Thin presentation shim over [`ddx_core::Engine`]:
//! - Session lifecycle (start, test-result, status, result)
//! - Similar-case lookup
//! - Knowledge-base inspection and validation
//!
//! Responses print as JSON on stdout; errors go to stderr with stable
//! exit codes.

use clap::{Args, Parser, Subcommand};
use ddx_common::{format_error_human, Error, OutputFormat, Region, Result, TestOutcome};
use ddx_core::engine::{Engine, EngineOptions, StartRequest};
use ddx_core::fusion::ImagingEvidence;
use ddx_core::logging;
use ddx_core::session::SessionStore;
use ddx_core::similar::{BoundedCaseIndex, CaseIndex, InMemoryCaseIndex};
use ddx_config::{load_knowledge_base, validate_knowledge_base};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// DDX - evidence-driven differential diagnosis engine
#[derive(Parser)]
#[command(name = "ddx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to a knowledge-base JSON file (defaults to builtin)
    #[arg(long, global = true)]
    kb: Option<PathBuf>,

    /// Session data directory
    #[arg(long, global = true, env = "DDX_DATA")]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a diagnostic session
    Start {
        /// Symptom label (repeatable)
        #[arg(long = "symptom")]
        symptoms: Vec<String>,

        /// Free-text symptom narrative
        #[arg(long)]
        text: Option<String>,

        /// Patient region
        #[arg(long, value_enum, default_value_t = Region::Global)]
        region: Region,

        /// Onset month (1-12)
        #[arg(long)]
        month: Option<u8>,

        /// Family-history term (repeatable)
        #[arg(long = "family-history")]
        family_history: Vec<String>,

        /// Genetic variant code, e.g. rs334 (repeatable)
        #[arg(long = "variant")]
        genetic_variants: Vec<String>,

        /// JSON file with imaging predictions (label→confidence map or
        /// full evidence bundle)
        #[arg(long)]
        imaging_json: Option<PathBuf>,
    },

    /// Submit a test result to a session
    TestResult {
        session_id: String,

        /// Test id from the recommended slate, e.g. T004
        #[arg(long)]
        test: String,

        /// Test outcome
        #[arg(long, value_enum)]
        result: TestOutcome,
    },

    /// Show the materialized state of a session
    Status { session_id: String },

    /// Produce the final result (treatment, trust report, summary)
    Result {
        session_id: String,

        /// Stated contraindication (repeatable)
        #[arg(long = "contraindication")]
        contraindications: Vec<String>,
    },

    /// Find similar historical cases for a symptom set
    Similar {
        /// Symptom label (repeatable)
        #[arg(long = "symptom")]
        symptoms: Vec<String>,

        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },

    /// Knowledge-base utilities
    Kb {
        #[command(subcommand)]
        command: KbCommands,
    },
}

#[derive(Subcommand)]
enum KbCommands {
    /// Validate the resolved knowledge base
    Validate,

    /// Print the resolved knowledge base as JSON
    Show,
}

fn print_output<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
    };
    println!("{rendered}");
    Ok(())
}

fn sessions_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| dirs::data_dir().map(|d| d.join("ddx")))
        .unwrap_or_else(|| PathBuf::from(".ddx"))
        .join("sessions")
}

fn read_imaging(path: &PathBuf) -> Result<ImagingEvidence> {
    let raw = std::fs::read_to_string(path)?;
    // Accept either the full bundle or a bare label→confidence map.
    if let Ok(evidence) = serde_json::from_str::<ImagingEvidence>(&raw) {
        if !evidence.predictions.is_empty() {
            return Ok(evidence);
        }
    }
    let predictions: BTreeMap<String, f64> = serde_json::from_str(&raw)?;
    Ok(ImagingEvidence {
        predictions,
        ..ImagingEvidence::default()
    })
}

fn build_engine(global: &GlobalOpts) -> Result<Engine> {
    let (kb, source) = load_knowledge_base(global.kb.as_deref())?;
    tracing::debug!(%source, "knowledge base resolved");

    let opts = EngineOptions::default();
    let store = SessionStore::at_dir(sessions_dir(global.data_dir.clone()), opts.retention)?;
    let case_index: Arc<dyn CaseIndex> = Arc::new(BoundedCaseIndex::new(
        Arc::new(InMemoryCaseIndex::with_reference_cases()),
        opts.similar_timeout,
    ));
    Ok(Engine::new(Arc::new(kb), store, case_index, opts))
}

fn run(cli: Cli) -> Result<()> {
    let format = cli.global.format;
    match cli.command {
        Commands::Start {
            symptoms,
            text,
            region,
            month,
            family_history,
            genetic_variants,
            imaging_json,
        } => {
            let imaging = match &imaging_json {
                Some(path) => Some(read_imaging(path)?),
                None => None,
            };
            let engine = build_engine(&cli.global)?;
            let response = engine.start_session(&StartRequest {
                symptoms,
                symptom_text: text,
                region,
                month,
                family_history,
                genetic_variants,
                imaging,
            })?;
            print_output(&response, format)
        }
        Commands::TestResult {
            session_id,
            test,
            result,
        } => {
            let engine = build_engine(&cli.global)?;
            let response = engine.submit_test_result(&session_id, &test, result)?;
            print_output(&response, format)
        }
        Commands::Status { session_id } => {
            let engine = build_engine(&cli.global)?;
            let response = engine.get_status(&session_id)?;
            print_output(&response, format)
        }
        Commands::Result {
            session_id,
            contraindications,
        } => {
            let engine = build_engine(&cli.global)?;
            let response = engine.get_result(&session_id, &contraindications)?;
            print_output(&response, format)
        }
        Commands::Similar { symptoms, top_k } => {
            let engine = build_engine(&cli.global)?;
            let response = engine.find_similar_cases(&symptoms, top_k);
            print_output(&response, format)
        }
        Commands::Kb { command } => {
            let (kb, source) = load_knowledge_base(cli.global.kb.as_deref())?;
            match command {
                KbCommands::Validate => {
                    validate_knowledge_base(&kb)
                        .map_err(|e| Error::InvalidKnowledgeBase(e.to_string()))?;
                    print_output(
                        &serde_json::json!({
                            "valid": true,
                            "source": source.to_string(),
                            "diseases": kb.diseases.len(),
                            "tests": kb.tests.len(),
                        }),
                        format,
                    )
                }
                KbCommands::Show => print_output(&kb, format),
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.global.verbose, cli.global.quiet);

    if let Err(err) = run(cli) {
        eprintln!("{}", format_error_human(&err, false));
        std::process::exit(err.exit_code());
    }
}
