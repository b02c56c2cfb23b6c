// CLI binary: errors end the process with a message and exit code 1.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tunecue::action::catalog::action_catalog;
use tunecue::interpret::{heuristic, Interpretation, InterpretationSource, Interpreter};
use tunecue::orchestrator::CommandOrchestrator;
use tunecue::session::Session;
use tunecue::settings::{self, LlmConfigInfo, LlmProvider};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tunecue-cli", about = "TuneCue headless CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a command into a structured action without executing it
    Interpret {
        text: String,
        /// Skip the model and use the pattern rules only
        #[arg(long)]
        heuristic: bool,
    },
    /// Interpret and execute a command against the media API
    Run {
        text: String,
        /// Media API access token (defaults to TUNECUE_ACCESS_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },
    /// List the supported actions with parameter schemas
    Actions,
    /// Settings management
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the effective settings (API key redacted)
    Show,
    /// Configure the model provider used for interpretation
    SetLlm {
        /// anthropic, openai or gemini
        #[arg(long)]
        provider: String,
        /// API key, stored in the credentials file. Empty string removes it.
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
    },
}

// ── Output ───────────────────────────────────────────────────────

fn print_output<T: Serialize>(message: &str, data: &T, raw_json: bool) {
    if raw_json {
        println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
    } else {
        println!("{message}");
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}

#[derive(Serialize)]
struct SettingsView {
    config_dir: String,
    llm: LlmConfigInfo,
    media: settings::MediaApiConfig,
    server: settings::ServerConfig,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tunecue=warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = cli.config_dir.unwrap_or_else(tunecue::paths::default_config_dir);

    match cli.command {
        Commands::Interpret { text, heuristic: rules_only } => {
            let result = if rules_only {
                Interpretation {
                    action: heuristic::interpret(&text),
                    source: InterpretationSource::Heuristic,
                }
            } else {
                let settings = settings::load_effective_settings(&config_dir);
                Interpreter::from_config(&settings.llm).resolve(&text).await
            };
            let message = format!("{} ({:?})", result.action.description(), result.source);
            print_output(&message, &result, cli.json);
        }
        Commands::Run { text, token } => {
            let settings = settings::load_effective_settings(&config_dir);
            let session = match token {
                Some(token) => Session::from_token(Some(token)),
                None => Session::from_env(),
            };
            let orchestrator = CommandOrchestrator::from_settings(&settings).with_audit_dir(config_dir);
            let response = orchestrator.handle(Some(&text), &session).await;

            let message = match (&response.message, &response.details) {
                (Some(message), _) => message.clone(),
                (None, Some(details)) => details.clone(),
                (None, None) => String::new(),
            };
            if response.success {
                print_output(&message, &response, cli.json);
            } else if cli.json {
                print_output(&message, &response, true);
                process::exit(1);
            } else {
                fail(&message);
            }
        }
        Commands::Actions => {
            let catalog = action_catalog();
            let message = catalog
                .iter()
                .map(|entry| format!("{:<24}{}", entry.name, entry.description))
                .collect::<Vec<_>>()
                .join("\n");
            print_output(&message, &catalog, cli.json);
        }
        Commands::Settings { action } => run_settings(action, &config_dir, cli.json),
    }
}

fn run_settings(action: SettingsAction, config_dir: &std::path::Path, raw_json: bool) {
    match action {
        SettingsAction::Show => {
            let effective = settings::load_effective_settings(config_dir);
            let view = SettingsView {
                config_dir: config_dir.display().to_string(),
                llm: LlmConfigInfo::from_config(&effective.llm),
                media: effective.media,
                server: effective.server,
            };
            let message = serde_json::to_string_pretty(&view).unwrap_or_default();
            print_output(&message, &view, raw_json);
        }
        SettingsAction::SetLlm {
            provider,
            api_key,
            model,
            base_url,
        } => {
            let Some(provider) = LlmProvider::from_name(&provider) else {
                fail(&format!("Unknown provider: {provider}"));
            };
            let mut current = settings::load_settings(config_dir).unwrap_or_default();
            current.llm.provider = provider;
            if model.is_some() {
                current.llm.model = model;
            }
            if base_url.is_some() {
                current.llm.base_url = base_url;
            }
            if let Err(e) = settings::save_settings(config_dir, &current) {
                fail(&e.to_string());
            }
            if let Some(key) = api_key {
                if let Err(e) = settings::save_api_key(config_dir, key.trim()) {
                    fail(&e.to_string());
                }
                current.llm.api_key = Some(key).filter(|k| !k.trim().is_empty());
            }
            let info = LlmConfigInfo::from_config(&current.llm);
            print_output(&format!("Model provider set to {provider:?}"), &info, raw_json);
        }
    }
}
