//! ollama-chat binary entry point

use std::{
    io::{self, Write},
    sync::Arc,
};

use color_eyre::Result;
use futures::StreamExt;
use ollama_chat::{
    cli::{Cli, Commands},
    config::{Config, OllamaOptions, SettingsFile},
    messages::Message,
    services::retry::with_retry,
    AdapterError, ChatAdapter, OllamaAdapter, StreamChunk, Usage,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Install error handler
    color_eyre::install()?;
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("ollama_chat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load()?;
    let overrides = cli.overrides();
    let options = config.resolve(SettingsFile::from_env(), overrides.clone());

    match cli.command {
        Commands::Chat { prompt, system } => chat(options, &system, prompt).await?,
        Commands::Model => {
            let adapter = OllamaAdapter::new(options)?;
            println!("{}", serde_json::to_string_pretty(&adapter.get_model())?);
        }
        Commands::Models => {
            let adapter = OllamaAdapter::new(options)?;
            for name in adapter.list_models().await? {
                println!("{name}");
            }
        }
        Commands::Config { save, global } => {
            if save {
                let path = if global {
                    Config::global_config_path()
                } else {
                    Config::project_config_path()
                };
                let existing = SettingsFile::load_from_path(&path)?;
                existing.merge(overrides).save_to_path(&path)?;
                println!("Saved configuration to {}", path.display());
            } else {
                println!("{}", serde_json::to_string_pretty(&options)?);
            }
        }
    }

    Ok(())
}

async fn chat(options: OllamaOptions, system: &str, prompt: String) -> Result<()> {
    let adapter = Arc::new(OllamaAdapter::new(options)?);

    let interrupt = {
        let adapter = Arc::clone(&adapter);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                adapter.abort_all();
            }
        })
    };

    let result = print_reply(&adapter, system, prompt).await;
    interrupt.abort();
    result
}

async fn print_reply(adapter: &OllamaAdapter, system: &str, prompt: String) -> Result<()> {
    let history = [Message::user(prompt)];
    let options = adapter.options();
    let mut stream = if options.streaming_enabled {
        adapter.create_message(system, &history).await?
    } else {
        with_retry(&options.retry, AdapterError::is_retryable, || {
            adapter.create_message(system, &history)
        })
        .await?
    };

    let mut stdout = io::stdout();
    let mut usage: Option<Usage> = None;

    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::Text { text } => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            StreamChunk::Usage(reported) => usage = Some(reported),
        }
    }
    writeln!(stdout)?;

    match usage {
        Some(usage) => eprintln!(
            "[tokens] input: {}, output: {}, total: {}",
            usage.input_tokens,
            usage.output_tokens,
            usage.total()
        ),
        None => tracing::debug!("Ollama did not report token usage"),
    }

    Ok(())
}
