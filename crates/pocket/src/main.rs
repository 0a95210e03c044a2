//! # Pocket: chat with local GGUF models
//!
//! `pocket models` lists the built-in catalog and what is already on disk,
//! `pocket download` fetches a model, `pocket chat` talks to one. Run with
//! no subcommand for a guided first-run flow.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use packrat::{DownloadController, ModelCatalog, ModelStore};
use pocketmind_core::{ModelDescriptor, SessionOptions};
use pocketmind_noggin::SessionManager;
use pocketmind_parley::ChatController;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog models and which are already downloaded
    Models,
    /// Download a model from the catalog
    Download {
        /// Model name or file name from the catalog
        model: String,
    },
    /// Start an interactive chat
    Chat {
        /// Model name, file name, or path to a .gguf file
        model: Option<String>,
        /// Sampling temperature
        #[arg(long, default_value = "0.7")]
        temperature: f32,
        /// Maximum tokens to generate per reply
        #[arg(long, default_value = "1024")]
        max_tokens: usize,
        /// Context size
        #[arg(long, default_value = "2048")]
        context_size: u32,
    },
}

#[async_std::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let catalog = ModelCatalog::builtin()?;
    let store = ModelStore::open()?;

    match cli.command {
        Some(Commands::Models) => {
            list_models(&catalog, &store);
        }
        Some(Commands::Download { model }) => {
            let descriptor = resolve_catalog(&catalog, &model)?;
            let path = download_model(store, &descriptor).await?;
            println!("✅ Saved to {}", path.display().to_string().green());
        }
        Some(Commands::Chat {
            model,
            temperature,
            max_tokens,
            context_size,
        }) => {
            let path = match model {
                Some(name) => resolve_model_path(&catalog, store.clone(), &name).await?,
                None => first_local_model(&store)?,
            };
            let mut options = SessionOptions::for_model(path.to_string_lossy().into_owned());
            options.temperature = temperature;
            options.max_tokens = max_tokens;
            options.context_size = context_size;
            run_chat(options).await?;
        }
        None => {
            guided_flow(&catalog, store).await?;
        }
    }

    Ok(())
}

fn list_models(catalog: &ModelCatalog, store: &ModelStore) {
    println!("{}", "Available models:".bold());
    for descriptor in catalog.descriptors() {
        let marker = if store.model_exists(&descriptor.local_file_name) {
            "✅".to_string()
        } else {
            "  ".to_string()
        };
        println!(
            "  {} {} ({}) -> {}",
            marker,
            descriptor.display_name.cyan(),
            descriptor.human_size,
            descriptor.local_file_name
        );
    }
}

fn resolve_catalog(catalog: &ModelCatalog, name: &str) -> Result<ModelDescriptor> {
    catalog
        .resolve(name)
        .cloned()
        .ok_or_else(|| anyhow!("model '{}' is not in the catalog; try `pocket models`", name))
}

/// Turn a user-supplied model argument into a local file path, downloading
/// from the catalog when needed.
async fn resolve_model_path(
    catalog: &ModelCatalog,
    store: ModelStore,
    name: &str,
) -> Result<PathBuf> {
    let as_path = PathBuf::from(name);
    if as_path.is_file() {
        return Ok(as_path);
    }

    if let Some(descriptor) = catalog.resolve(name) {
        let descriptor = descriptor.clone();
        if store.model_exists(&descriptor.local_file_name) {
            return Ok(store.model_path(&descriptor.local_file_name));
        }
        println!(
            "📥 {} is not downloaded yet",
            descriptor.display_name.cyan()
        );
        return download_model(store, &descriptor).await;
    }

    if store.model_exists(name) {
        return Ok(store.model_path(name));
    }

    Err(anyhow!(
        "'{}' is not a file, a catalog model, or a downloaded model",
        name
    ))
}

async fn download_model(store: ModelStore, descriptor: &ModelDescriptor) -> Result<PathBuf> {
    println!(
        "📥 Downloading {} ({})",
        descriptor.display_name.cyan(),
        descriptor.human_size
    );

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {percent}% {msg}")?
            .progress_chars("=> "),
    );
    bar.set_message(descriptor.local_file_name.clone());

    let mut controller = DownloadController::new(store);
    controller
        .download(descriptor, |fraction| {
            bar.set_position((fraction * 100.0) as u64);
        })
        .await?;
    bar.finish_and_clear();

    let (_, path) = controller
        .acknowledge()
        .ok_or_else(|| anyhow!("download finished but no file was recorded"))?;
    Ok(path)
}

fn first_local_model(store: &ModelStore) -> Result<PathBuf> {
    let local = store.list_local_models();
    let first = local
        .first()
        .ok_or_else(|| anyhow!("no downloaded models; run `pocket download <model>` first"))?;
    Ok(store.model_path(first))
}

/// First-run flow: pick a model from the catalog, download it, chat.
async fn guided_flow(catalog: &ModelCatalog, store: ModelStore) -> Result<()> {
    let local = store.list_local_models();
    if let Some(first) = local.first() {
        println!("💬 Using {}", first.cyan());
        let options = SessionOptions::for_model(store.model_path(first).to_string_lossy().into_owned());
        return run_chat(options).await;
    }

    println!("{}", "No models downloaded yet. Pick one:".bold());
    let descriptors = catalog.descriptors();
    for (i, descriptor) in descriptors.iter().enumerate() {
        println!(
            "  {}. {} ({})",
            i + 1,
            descriptor.display_name.cyan(),
            descriptor.human_size
        );
    }

    print!("Model number [1]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let choice = line.trim();
    let index = if choice.is_empty() {
        0
    } else {
        choice
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|&n| n < descriptors.len())
            .ok_or_else(|| anyhow!("invalid choice '{}'", choice))?
    };

    let descriptor = descriptors[index].clone();
    let path = download_model(store, &descriptor).await?;
    println!("✅ Download complete: {}", path.display().to_string().green());

    print!("Press Enter to start chatting...");
    io::stdout().flush()?;
    let mut ack = String::new();
    io::stdin().read_line(&mut ack)?;

    run_chat(SessionOptions::for_model(path.to_string_lossy().into_owned())).await
}

async fn run_chat(options: SessionOptions) -> Result<()> {
    println!("⏳ Loading model...");
    let mut chat = ChatController::new(SessionManager::new().await);
    chat.bind_with(options).await?;

    if let Some(welcome) = chat.messages().last() {
        println!("{} {}", "AI >".bright_green(), welcome.text);
    }
    println!("(Type 'exit' to quit)\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{} ", "YOU >".bright_white());
        io::stdout().flush()?;
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input == "exit" || input == "quit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        chat.send(input).await?;
        if let Some(reply) = chat.messages().last() {
            println!("{} {}", "AI >".bright_green(), reply.text);
        }
    }

    chat.unbind().await;
    Ok(())
}
