//! CLI entry point for qory

mod models;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, ValueEnum};
use console::style;
use dialoguer::{Input, Password};
use qory_agent::{QueryRunner, SessionTarget};
use qory_core::config::{keys, ConfigDirs, ConfigStore, FileConfigStore, LoggingConfig};
use qory_core::logging::init_logging;
use qory_core::session::{Message, SessionManager, SessionPreview};
use qory_providers::{CompletionClient, OpenAIClient};
use tracing::{debug, info};

/// Number of sessions shown by `qory history`
const HISTORY_LENGTH: usize = 10;

/// Positional marker for following up on the most recent session
const LAST_SESSION_MARKER: &str = "^";

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

#[derive(Parser)]
#[command(name = "qory")]
#[command(about = "A language model in your terminal")]
#[command(
    long_about = "Query language models from your terminal, using free-form text and any \
                  local file as context.\n\nFollow up on the last query with `qory ^ <input...>`."
)]
#[command(version)]
struct Cli {
    /// Show recent sessions, or one session in full
    #[arg(
        short = 'H',
        long,
        value_name = "ID",
        num_args = 0..=1,
        conflicts_with_all = ["config", "session", "last"]
    )]
    history: Option<Option<String>>,

    /// Manage configuration: <api-key|base-url|model|prompt|retain> <get|set [VALUE]|unset>
    #[arg(
        short = 'c',
        long,
        num_args = 2..=3,
        value_names = ["KEY", "ACTION", "VALUE"],
        conflicts_with_all = ["session", "last"]
    )]
    config: Option<Vec<String>>,

    /// Continue (or create) a named session
    #[arg(short, long, value_name = "ID", conflicts_with = "last")]
    session: Option<String>,

    /// Follow up on the most recent session
    #[arg(short, long)]
    last: bool,

    /// Query text; arguments naming readable files are replaced by their content
    #[arg(
        required_unless_present_any = ["history", "config"],
        conflicts_with_all = ["history", "config"],
        num_args = 1..,
        trailing_var_arg = true,
        value_name = "INPUT"
    )]
    input: Vec<String>,

    /// Configuration directory
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConfigKey {
    /// API key sent to the provider (falls back to OPENAI_API_KEY)
    ApiKey,
    /// Base URL of the provider, ending with '/' (falls back to OPENAI_BASE_URL)
    BaseUrl,
    /// Model to query, e.g. gpt-4o
    Model,
    /// Persistent system prompt added to new sessions
    Prompt,
    /// Number of anonymous sessions to keep
    Retain,
}

impl ConfigKey {
    fn key(self) -> &'static str {
        match self {
            ConfigKey::ApiKey => keys::API_KEY,
            ConfigKey::BaseUrl => keys::BASE_URL,
            ConfigKey::Model => keys::MODEL,
            ConfigKey::Prompt => keys::PROMPT,
            ConfigKey::Retain => keys::RETAIN,
        }
    }

    fn description(self) -> &'static str {
        match self {
            ConfigKey::ApiKey => "API key",
            ConfigKey::BaseUrl => "base URL",
            ConfigKey::Model => "model",
            ConfigKey::Prompt => "prompt",
            ConfigKey::Retain => "retention",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ConfigAction {
    Get,
    /// Prompts when the value is omitted
    Set(Option<String>),
    Unset,
}

/// Split the values of `--config` into a key and an action
fn parse_config_args(args: &[String]) -> Result<(ConfigKey, ConfigAction)> {
    let (key, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("missing configuration key"))?;
    let key = ConfigKey::from_str(key, false).map_err(|_| {
        anyhow!(
            "unknown configuration key '{}', expected one of api-key, base-url, model, prompt, retain",
            key
        )
    })?;

    let action = match rest {
        [action] if action == "get" => ConfigAction::Get,
        [action] if action == "unset" => ConfigAction::Unset,
        [action] if action == "set" => ConfigAction::Set(None),
        [action, value] if action == "set" => ConfigAction::Set(Some(value.clone())),
        _ => bail!("expected `get`, `set [VALUE]` or `unset` after '{}'", args[0]),
    };
    Ok((key, action))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Provider failures were already printed while streaming
            let streamed = matches!(
                err.downcast_ref::<qory_core::Error>(),
                Some(qory_core::Error::Provider(_))
            );
            if !streamed {
                eprintln!("{} {:#}", style("Error:").red().bold(), err);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dirs = ConfigDirs::resolve(cli.config_dir)?;
    let _log_guard = init_logging(&LoggingConfig::with_dir(dirs.logs_dir()).verbose(cli.verbose));
    debug!("Using config directory {}", dirs.root().display());

    let config: Arc<dyn ConfigStore> = Arc::new(FileConfigStore::new(dirs.root()));

    if let Some(id) = cli.history {
        let sessions = SessionManager::new(dirs.sessions_dir())?;
        return match id {
            Some(id) => run_history_session(&sessions, &id),
            None => run_history(&sessions),
        };
    }

    if let Some(args) = cli.config {
        let (key, action) = parse_config_args(&args)?;
        return run_config(config.as_ref(), key, action).await;
    }

    let (target, input) = query_target(cli.session, cli.last, cli.input);
    run_query(&dirs, config, target, input).await
}

/// Work out which session a query continues and strip the `^` marker
fn query_target(
    session: Option<String>,
    last: bool,
    mut input: Vec<String>,
) -> (SessionTarget, Vec<String>) {
    if let Some(id) = session {
        return (SessionTarget::Named(id), input);
    }

    if input.first().map(String::as_str) == Some(LAST_SESSION_MARKER) {
        input.remove(0);
        return (SessionTarget::Last, input);
    }

    if last {
        (SessionTarget::Last, input)
    } else {
        (SessionTarget::Anonymous, input)
    }
}

fn build_client(config: &dyn ConfigStore) -> Result<CompletionClient> {
    let api_key = match config.get(keys::API_KEY)? {
        Some(key) => Some(key),
        None => std::env::var(API_KEY_ENV).ok(),
    };
    let api_base = match config.get(keys::BASE_URL)? {
        Some(base) => Some(base),
        None => std::env::var(BASE_URL_ENV).ok(),
    };

    let provider = OpenAIClient::new(api_key, api_base);
    debug!("Provider endpoint: {}", provider.api_base());
    Ok(CompletionClient::new(Arc::new(provider)))
}

/// Run a query, streaming the answer to stdout
async fn run_query(
    dirs: &ConfigDirs,
    config: Arc<dyn ConfigStore>,
    target: SessionTarget,
    input: Vec<String>,
) -> Result<()> {
    let sessions = SessionManager::new(dirs.sessions_dir())?;
    let client = build_client(config.as_ref())?;
    let runner = QueryRunner::new(sessions, config, client);

    let mut stdout = io::stdout().lock();
    let outcome = runner.run(target, &input, &mut stdout).await?;

    if outcome.persisted {
        info!("Saved session {}", outcome.session_id);
    } else {
        eprintln!(
            "{} the answer could not be saved to session {}",
            style("Warning:").yellow().bold(),
            outcome.session_id
        );
    }
    Ok(())
}

fn format_preview(preview: &SessionPreview) -> String {
    let snippet = preview.snippet.strip_suffix('\n').unwrap_or(&preview.snippet);
    format!(
        "=== {} ({}) ===\n{}",
        preview.id,
        preview.updated_at.format("%d %b %y %H:%M %Z"),
        snippet
    )
}

fn format_message(message: &Message) -> String {
    format!(
        "=== {} ===\n{}",
        message.role.as_str().to_uppercase(),
        message.content
    )
}

/// Show snippets of the most recent sessions
fn run_history(sessions: &SessionManager) -> Result<()> {
    let previews = sessions.enumerate(HISTORY_LENGTH)?;
    let mut stdout = io::stdout().lock();
    for preview in &previews {
        writeln!(stdout, "{}", format_preview(preview))?;
    }
    Ok(())
}

/// Show every message of one session
fn run_history_session(sessions: &SessionManager, id: &str) -> Result<()> {
    let session = sessions.load(id)?;
    let mut stdout = io::stdout().lock();
    for message in &session.messages {
        writeln!(stdout, "{}", format_message(message))?;
    }
    Ok(())
}

async fn run_config(config: &dyn ConfigStore, key: ConfigKey, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get => match config.get(key.key())? {
            Some(value) => println!("{}", value),
            None => println!("No value for {}", key.description()),
        },
        ConfigAction::Unset => {
            config.unset(key.key())?;
            println!("{} Unset {}", style("✓").green().bold(), key.description());
        }
        ConfigAction::Set(value) => {
            let value = match value {
                Some(value) => value,
                None => prompt_value(config, key).await?,
            };
            config.set(key.key(), &value)?;
            println!("{} Set {}", style("✓").green().bold(), key.description());
        }
    }
    Ok(())
}

async fn prompt_value(config: &dyn ConfigStore, key: ConfigKey) -> Result<String> {
    let value = match key {
        ConfigKey::Model => models::select_model(&build_client(config)?).await?,
        ConfigKey::ApiKey => Password::new().with_prompt("Enter value").interact()?,
        _ => Input::<String>::new()
            .with_prompt("Enter value")
            .interact_text()?,
    };
    Ok(value.trim().to_string())
}
