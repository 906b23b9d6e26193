//! # Epsilon CLI
//!
//! Runs language models through Space Station Epsilon and reports on the results.
//!
//! Usage:
//!   epsilon eval --model <id> [--mode text|tools|both]
//!   epsilon eval --all [--models-file models.toml]
//!   epsilon play
//!   epsilon report [log-dir]
//!   epsilon tools
//!
//! Examples:
//!   epsilon eval --model openrouter/openai/gpt-oss-120b --mode both
//!   epsilon eval --model llama3 --base-url http://localhost:11434/v1
//!   epsilon eval --all --token-limit 30000
//!   epsilon report logs

mod config;
mod report;

use clap::{Parser, Subcommand, ValueEnum};
use config::ModelEntry;
use epsilon_agent::{
    tool_definitions, ControllerConfig, EngineExecutor, Modality, OpenAIProvider, RunRecord,
    ShellExecutor, TurnController,
};
use epsilon_error::{Error, Result};
use epsilon_game::{GameEngine, World};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "epsilon")]
#[command(author, version, about = "Epsilon - text adventure benchmark for language models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (raw replies and engine output)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only warnings and the final tables
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Let one or more models play the station
    Eval {
        /// Model id, optionally prefixed with `openrouter/`
        #[arg(short, long, conflicts_with = "all", required_unless_present = "all")]
        model: Option<String>,

        /// Evaluate every model in the roster file
        #[arg(long)]
        all: bool,

        /// Roster file with `[[models]]` entries
        #[arg(long, default_value = "models.toml")]
        models_file: PathBuf,

        /// Interaction modality
        #[arg(long, value_enum, default_value = "both")]
        mode: ModeArg,

        /// Cumulative prompt + completion token budget per playthrough
        #[arg(long, default_value = "50000")]
        token_limit: usize,

        /// Where result records are written
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,

        /// Play the text modality against a station directory tree instead of the engine
        #[arg(long)]
        station_dir: Option<PathBuf>,

        /// OpenAI-compatible server to use instead of OpenRouter / OpenAI
        #[arg(long)]
        base_url: Option<String>,

        /// Display label for a single `--model` run
        #[arg(long)]
        label: Option<String>,
    },
    /// Play the station yourself
    Play,
    /// Summarize saved result records
    Report {
        /// Directory holding result JSON files
        #[arg(default_value = "logs")]
        log_dir: PathBuf,
    },
    /// Print the tool schemas offered in the tools modality
    Tools,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Text,
    Tools,
    Both,
}

impl ModeArg {
    fn modalities(self) -> Vec<Modality> {
        match self {
            ModeArg::Text => vec![Modality::Text],
            ModeArg::Tools => vec![Modality::Tools],
            ModeArg::Both => vec![Modality::Text, Modality::Tools],
        }
    }
}

struct EvalOptions {
    modalities: Vec<Modality>,
    token_limit: usize,
    log_dir: PathBuf,
    station_dir: Option<PathBuf>,
    base_url: Option<String>,
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "epsilon=debug,epsilon_agent=debug,epsilon_game=debug"
    } else if quiet {
        "warn"
    } else {
        "epsilon=info,epsilon_agent=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_target(false))
        .init();
}

async fn run_eval(models: Vec<ModelEntry>, opts: &EvalOptions) -> Result<Vec<RunRecord>> {
    let world = Arc::new(World::station()?);
    let mut records = Vec::new();

    for entry in &models {
        let provider_config = config::provider_from_env(&entry.name, opts.base_url.as_deref())?;
        let model_id = provider_config
            .default_model
            .clone()
            .unwrap_or_else(|| entry.name.clone());
        let provider = OpenAIProvider::new(provider_config)?;

        let controller = TurnController::new(
            provider,
            ControllerConfig::new(model_id)
                .with_label(entry.label())
                .with_token_limit(opts.token_limit),
        );

        for &mode in &opts.modalities {
            tracing::info!(model = %entry.label(), %mode, "starting playthrough");

            let record = match mode {
                Modality::Text => run_text(&controller, &world, opts.station_dir.as_deref()).await,
                Modality::Tools => {
                    let mut engine = GameEngine::new(world.clone());
                    Ok(controller.run_tools(&mut engine).await)
                }
            };

            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    tracing::error!(model = %entry.label(), %mode, error = %err, "playthrough could not start");
                    continue;
                }
            };

            save_record(&record, &opts.log_dir);
            records.push(record);
        }
    }

    Ok(records)
}

/// A failed write is logged and the batch carries on
fn save_record(record: &RunRecord, log_dir: &Path) -> bool {
    match record.save(log_dir) {
        Ok(path) => {
            tracing::info!(model = %record.label, mode = %record.mode, path = %path.display(), "result saved");
            true
        }
        Err(err) => {
            tracing::error!(model = %record.label, mode = %record.mode, error = %err, "could not save result");
            false
        }
    }
}

async fn run_text(
    controller: &TurnController<OpenAIProvider>,
    world: &Arc<World>,
    station_dir: Option<&Path>,
) -> Result<RunRecord> {
    match station_dir {
        Some(dir) => {
            let mut shell = ShellExecutor::new(dir)?;
            shell.reset().await?;
            controller.run_text(&mut shell).await
        }
        None => {
            let mut executor = EngineExecutor::new(world.clone());
            controller.run_text(&mut executor).await
        }
    }
}

fn resolve_models(
    model: Option<String>,
    all: bool,
    models_file: &Path,
    label: Option<String>,
) -> Result<Vec<ModelEntry>> {
    if all {
        return config::load_models(models_file);
    }
    match model {
        Some(name) => Ok(vec![ModelEntry {
            label,
            ..ModelEntry::new(name)
        }]),
        None => Err(Error::config_invalid("pass --model <id> or --all").with_operation("cli::eval")),
    }
}

fn play() -> Result<()> {
    let world = Arc::new(World::station()?);
    let mut engine = GameEngine::new(world);

    println!("=== {} ===", engine.world().name());
    println!("Type 'help' for commands, 'status' for your state, 'quit' to leave.\n");
    println!("{}\n", engine.describe());

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        stdout.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };

        match line.trim() {
            "quit" | "exit" => break,
            "status" => println!("{}\n", engine.status()),
            input => println!("{}\n", engine.execute(input)),
        }

        if engine.is_won() {
            break;
        }
    }

    Ok(())
}

fn show_tools() -> Result<()> {
    let json = serde_json::to_string_pretty(&tool_definitions()).map_err(|e| {
        Error::serialization_failed(e.to_string())
            .with_operation("cli::tools")
            .set_source(e)
    })?;
    println!("{}", json);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Eval {
            model,
            all,
            models_file,
            mode,
            token_limit,
            log_dir,
            station_dir,
            base_url,
            label,
        } => {
            let models = resolve_models(model, all, &models_file, label)?;
            let opts = EvalOptions {
                modalities: mode.modalities(),
                token_limit,
                log_dir,
                station_dir,
                base_url,
            };

            let records = run_eval(models, &opts).await?;
            print!("{}", report::comparison_table(&records));
            Ok(())
        }
        Commands::Play => play(),
        Commands::Report { log_dir } => {
            let records = report::load_records(&log_dir)?;
            print!("{}", report::render_report(&records));
            Ok(())
        }
        Commands::Tools => show_tools(),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_eval_defaults() {
        let cli = Cli::try_parse_from(["epsilon", "eval", "--model", "gpt-4o-mini"]).unwrap();
        match cli.command {
            Commands::Eval {
                model,
                all,
                mode,
                token_limit,
                log_dir,
                ..
            } => {
                assert_eq!(model.as_deref(), Some("gpt-4o-mini"));
                assert!(!all);
                assert_eq!(mode, ModeArg::Both);
                assert_eq!(token_limit, 50_000);
                assert_eq!(log_dir, PathBuf::from("logs"));
            }
            _ => panic!("expected eval"),
        }
    }

    #[test]
    fn test_eval_needs_model_or_all() {
        assert!(Cli::try_parse_from(["epsilon", "eval"]).is_err());
        assert!(Cli::try_parse_from(["epsilon", "eval", "--all", "--model", "x"]).is_err());
        assert!(Cli::try_parse_from(["epsilon", "eval", "--all", "--mode", "tools"]).is_ok());
    }

    #[test]
    fn test_mode_modalities() {
        assert_eq!(ModeArg::Text.modalities(), vec![Modality::Text]);
        assert_eq!(ModeArg::Both.modalities(), vec![Modality::Text, Modality::Tools]);
    }

    #[test]
    fn test_save_record_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let record: RunRecord = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o",
            "label": "gpt-4o",
            "mode": "tools",
            "won": false,
            "gave_up": true,
            "termination": "gave-up",
            "prompt_tokens": 10,
            "completion_tokens": 2,
            "total_tokens": 12,
            "turns": 1,
            "commands": [],
            "timestamp": "2026-01-01T00:00:00Z"
        }))
        .unwrap();

        let blocked = dir.path().join("logs");
        std::fs::write(&blocked, "a file, not a directory").unwrap();
        assert!(!save_record(&record, &blocked));

        let logs = dir.path().join("results");
        assert!(save_record(&record, &logs));
        assert!(logs.join("gpt-4o_tools.json").is_file());
    }

    #[test]
    fn test_resolve_models() {
        let dir = TempDir::new().unwrap();
        let roster = dir.path().join("models.toml");
        std::fs::write(&roster, "[[models]]\nname = \"a\"\n\n[[models]]\nname = \"b\"\nlabel = \"bee\"\n").unwrap();

        let models = resolve_models(None, true, &roster, None).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[1].label(), "bee");

        let single = resolve_models(Some("gpt-4o".into()), false, &roster, Some("four".into())).unwrap();
        assert_eq!(single, vec![ModelEntry { name: "gpt-4o".into(), label: Some("four".into()) }]);

        assert!(resolve_models(None, false, &roster, None).is_err());
    }
}
