//! CLI for productswap - replace a product in a poster with your own.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use productswap::{
    acquire, render, Config, Controller, Download, EncodedImage, GeminiEditor, GeminiModel,
    SelectedFile, TriggerRejected, View,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "productswap")]
#[command(about = "Swap a product in a poster for your own product image (Gemini)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Model id (overrides PRODUCTSWAP_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one swap and save the result
    Swap(SwapArgs),

    /// Interactive session: set inputs, generate, save
    Session,
}

#[derive(Args)]
struct SwapArgs {
    /// Poster image containing the product to replace
    #[arg(long)]
    poster: PathBuf,

    /// Image of your product
    #[arg(long)]
    product: PathBuf,

    /// Name of the product in the poster to replace (e.g. "soda bottle")
    #[arg(short, long)]
    target: String,

    /// Output file path (default: ./brand-swap-result.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    // Refuse to start without a credential.
    let mut config = Config::from_env()?;
    if let Some(ref id) = cli.model {
        config.model = GeminiModel::from_id(id);
    }
    tracing::debug!(?config, "resolved configuration");

    let editor = GeminiEditor::from_config(&config)?;
    let controller = Arc::new(Controller::new(Arc::new(editor)));

    match cli.command {
        Commands::Swap(args) => swap(&controller, args).await?,
        Commands::Session => run_session(controller).await?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_image(path: &Path) -> anyhow::Result<EncodedImage> {
    let file = SelectedFile::from_path(path);
    acquire(&file)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?
        .with_context(|| format!("{} is not an image file", path.display()))
}

async fn swap(controller: &Controller, args: SwapArgs) -> anyhow::Result<()> {
    controller.set_poster(Some(load_image(&args.poster).await?));
    controller.set_product(Some(load_image(&args.product).await?));
    controller.set_target_label(args.target.as_str());

    controller.generate().await?;

    let (original, edited) = match render(&controller.snapshot()) {
        View::Comparison { original, edited } => (original, edited),
        View::Error(message) => anyhow::bail!(message),
        other => anyhow::bail!("unexpected result state: {other:?}"),
    };

    let download = Download::of(&edited)?;
    let output = match args.output {
        Some(path) => {
            download.save_as(&path)?;
            path
        }
        None => download.save_in(".")?,
    };

    if args.json {
        let result = serde_json::json!({
            "success": true,
            "output": output.display().to_string(),
            "size_bytes": download.bytes.len(),
            "mime_type": edited.mime_type(),
            "original_mime_type": original.mime_type(),
            "target": args.target,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Edited image: {} ({} bytes)",
            output.display(),
            download.bytes.len()
        );
    }

    Ok(())
}

/// One line of session input.
#[derive(Debug, PartialEq, Eq)]
enum SessionCommand {
    Poster(PathBuf),
    Product(PathBuf),
    Target(String),
    Generate,
    Status,
    Save(Option<PathBuf>),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<SessionCommand, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let path = |what: &str| {
        if rest.is_empty() {
            Err(format!("usage: {what} <path>"))
        } else {
            Ok(PathBuf::from(rest))
        }
    };

    match word {
        "poster" => path("poster").map(SessionCommand::Poster),
        "product" => path("product").map(SessionCommand::Product),
        "target" => Ok(SessionCommand::Target(rest.to_string())),
        "generate" | "go" => Ok(SessionCommand::Generate),
        "status" => Ok(SessionCommand::Status),
        "save" => Ok(SessionCommand::Save((!rest.is_empty()).then(|| PathBuf::from(rest)))),
        "help" | "?" => Ok(SessionCommand::Help),
        "quit" | "exit" => Ok(SessionCommand::Quit),
        other => Err(format!("unknown command {other:?}, try `help`")),
    }
}

const SESSION_HELP: &str = "\
commands:
  poster <path>    choose the poster image
  product <path>   choose your product image
  target <name>    name the product in the poster to replace
  generate         run the swap (one at a time)
  status           show inputs and the current result
  save [path]      save the edited image
  quit";

async fn run_session(controller: Arc<Controller>) -> anyhow::Result<()> {
    println!("{SESSION_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        match command {
            SessionCommand::Poster(path) => {
                if let Some(image) = select(&path).await {
                    controller.set_poster(image);
                }
            }
            SessionCommand::Product(path) => {
                if let Some(image) = select(&path).await {
                    controller.set_product(image);
                }
            }
            SessionCommand::Target(label) => controller.set_target_label(label),
            SessionCommand::Generate => {
                // Runs in the background so input stays live while pending.
                let task_controller = controller.clone();
                tasks.retain(|t| !t.is_finished());
                tasks.push(tokio::spawn(async move {
                    match task_controller.generate().await {
                        Ok(()) => println!("{}", describe(&render(&task_controller.snapshot()))),
                        Err(TriggerRejected::AlreadyPending) => {
                            eprintln!("still working on the previous request");
                        }
                        Err(rejected) => eprintln!("{rejected}"),
                    }
                }));
            }
            SessionCommand::Status => print_status(&controller),
            SessionCommand::Save(path) => {
                if let Err(e) = save(&controller, path.as_deref()) {
                    eprintln!("{e:#}");
                }
            }
            SessionCommand::Help => println!("{SESSION_HELP}"),
            SessionCommand::Quit => break,
        }
    }

    for task in tasks {
        task.await?;
    }
    Ok(())
}

/// Reads a selected file. `None` leaves the slot as it is.
async fn select(path: &Path) -> Option<Option<EncodedImage>> {
    match acquire(&SelectedFile::from_path(path)).await {
        Ok(Some(image)) => Some(Some(image)),
        Ok(None) => {
            eprintln!("{} is not an image, ignored", path.display());
            None
        }
        Err(e) => {
            eprintln!("could not read {}: {e}", path.display());
            Some(None)
        }
    }
}

fn save(controller: &Controller, path: Option<&Path>) -> anyhow::Result<()> {
    let download = render(&controller.snapshot())
        .download()
        .context("no edited image to save yet")??;
    let written = match path {
        Some(path) => {
            download.save_as(path)?;
            path.to_path_buf()
        }
        None => download.save_in(".")?,
    };
    println!("saved {}", written.display());
    Ok(())
}

fn print_status(controller: &Controller) {
    let state = controller.snapshot();
    let slot = |image: Option<&EncodedImage>| {
        image.map_or_else(|| "(none)".to_string(), |i| i.mime_type().to_string())
    };
    println!("poster:  {}", slot(state.poster()));
    println!("product: {}", slot(state.product()));
    println!("target:  {:?}", state.target_label());
    println!("result:  {}", describe(&render(&state)));
}

fn describe(view: &View) -> String {
    match view {
        View::Placeholder => "nothing generated yet".to_string(),
        View::Progress => "working...".to_string(),
        View::Error(message) => format!("error: {message}"),
        View::Comparison { original, edited } => format!(
            "done: original {} -> edited {} (use `save`)",
            original.mime_type(),
            edited.mime_type()
        ),
    }
}
