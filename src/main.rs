use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::style::Stylize;
use crossterm::terminal;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};
use filedock::config::Config;
use filedock::core::path::{format_size, normalize, parent};
use filedock::session::collect_selection;
use filedock::{
    ChannelPrompt,
    ConflictDecision,
    DirectoryBrowser,
    DirectoryListing,
    FileError,
    FileEvent,
    HttpFileStore,
    Notice,
    NoticeLevel,
    PendingConflict,
    UploadSessionManager,
};

#[derive(Parser, Debug)]
#[command(name = "filedock", version, about = "Client for the file manager HTTP API", long_about = None)]
struct Cli {
    /// Server base URL (overrides the config file)
    #[arg(long)]
    endpoint: Option<String>,
    /// Config file, defaults to ./filedock.toml
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List a directory
    Ls { path: Option<String> },
    /// List only the subdirectories of a directory
    Dirs { path: Option<String> },
    /// Upload files and folders
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Remote directory to upload into
        #[arg(long)]
        to: Option<String>,
        /// Overwrite every existing file without asking
        #[arg(long, conflicts_with = "skip_all")]
        yes_all: bool,
        /// Keep every existing file without asking
        #[arg(long)]
        skip_all: bool,
    },
    /// Create a folder
    Mkdir {
        name: String,
        /// Parent directory
        #[arg(long = "in")]
        in_dir: Option<String>,
    },
    /// Delete a file or folder
    Rm { path: String },
    /// Rename a file or folder
    Rename { path: String, new_name: String },
    /// Move a file or folder into another directory
    Mv { path: String, dest_dir: String },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("filedock=info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn print_notice(notice: &Notice) {
    let label = match notice.level {
        NoticeLevel::Info => "info".blue(),
        NoticeLevel::Success => "success".green(),
        NoticeLevel::Warning => "warning".yellow(),
        NoticeLevel::Error => "error".red(),
    };
    println!("[{}] {}", label, notice.message);
}

fn print_listing(listing: &DirectoryListing) {
    println!("{}", listing.current_path.as_str().bold());
    if listing.files.is_empty() {
        println!("  (empty directory)");
        return;
    }

    for entry in &listing.files {
        let name = if entry.is_dir {
            format!("{}/", entry.name)
        } else {
            entry.name.clone()
        };
        let size = if entry.is_dir { "-" } else { entry.size_formatted.as_str() };
        println!(
            "  {:<40} {:>10}  {}",
            name,
            size,
            entry.mod_time.format("%Y-%m-%d %H:%M")
        );
    }
}

/// Print whatever notices are already buffered.
fn flush_notices(events: &mut broadcast::Receiver<FileEvent>) {
    while let Ok(event) = events.try_recv() {
        if let FileEvent::Notice(notice) = event {
            print_notice(&notice);
        }
    }
}

/// Block until one of o / s / O / S (or Esc for skip) is pressed.
fn read_decision(filename: &str) -> std::io::Result<ConflictDecision> {
    println!(
        "File \"{}\" already exists. [o]verwrite, [s]kip, [O]verwrite all, [S]kip all",
        filename
    );

    terminal::enable_raw_mode()?;
    let decision = loop {
        match event::read() {
            Ok(Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. })) => match code {
                KeyCode::Char('o') => break Ok(ConflictDecision::overwrite()),
                KeyCode::Char('s') | KeyCode::Esc => break Ok(ConflictDecision::skip()),
                KeyCode::Char('O') => break Ok(ConflictDecision::overwrite_all()),
                KeyCode::Char('S') => break Ok(ConflictDecision::skip_all()),
                _ => continue,
            },
            Ok(_) => continue,
            Err(err) => break Err(err),
        }
    };
    terminal::disable_raw_mode()?;

    decision
}

async fn answer(pending: PendingConflict, preset: Option<ConflictDecision>) -> filedock::Result<()> {
    let decision = match preset {
        Some(decision) => decision,
        None => {
            let filename = pending.filename.clone();
            tokio::task::spawn_blocking(move || read_decision(&filename))
                .await
                .map_err(|err| FileError::internal(format!("Prompt task failed: {}", err)))??
        }
    };

    pending.resolve(decision);
    Ok(())
}

struct UploadArgs {
    paths: Vec<PathBuf>,
    to: Option<String>,
    preset: Option<ConflictDecision>,
}

async fn upload(
    browser: &DirectoryBrowser,
    store: Arc<HttpFileStore>,
    event_tx: broadcast::Sender<FileEvent>,
    events: &mut broadcast::Receiver<FileEvent>,
    args: UploadArgs,
) -> filedock::Result<()> {
    if let Some(to) = &args.to {
        browser.load(to).await?;
    } else {
        browser.refresh().await?;
    }

    let (selection, is_folder) = collect_selection(&args.paths)?;

    let (prompt, mut pending_rx) = ChannelPrompt::new();
    let handle = UploadSessionManager::new(store, Arc::new(prompt), browser.navigation(), event_tx);
    handle.manager.submit(selection, is_folder)?;

    loop {
        tokio::select! {
            Some(pending) = pending_rx.recv() => {
                answer(pending, args.preset).await?;
            }
            event = events.recv() => match event {
                Ok(FileEvent::Notice(notice)) => print_notice(&notice),
                Ok(FileEvent::SessionFinished(tally)) if tally.bytes_sent > 0 => {
                    print_notice(&Notice::info(format!("Sent {}", format_size(tally.bytes_sent))));
                }
                Ok(FileEvent::RefreshRequested { .. }) => {
                    if let Ok(listing) = browser.refresh().await {
                        print_listing(&listing);
                    }
                    break;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    handle.shutdown().await
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    let store = Arc::new(HttpFileStore::new(&config.endpoint, config.timeout())?);
    let (event_tx, mut events) = broadcast::channel(256);
    let browser = DirectoryBrowser::new(store.clone(), &config.start_path, event_tx.clone());

    let result = match cli.command {
        Commands::Ls { path } => {
            let path = path.unwrap_or_else(|| config.start_path.clone());
            browser.load(&path).await.map(|listing| print_listing(&listing))
        }
        Commands::Dirs { path } => {
            let path = path.unwrap_or_else(|| config.start_path.clone());
            browser.subdirectories(&path).await.map(|listing| print_listing(&listing))
        }
        Commands::Upload { paths, to, yes_all, skip_all } => {
            let preset = if yes_all {
                Some(ConflictDecision::overwrite_all())
            } else if skip_all {
                Some(ConflictDecision::skip_all())
            } else {
                None
            };
            let args = UploadArgs { paths, to, preset };
            upload(&browser, store, event_tx, &mut events, args).await
        }
        Commands::Mkdir { name, in_dir } => {
            let dir = in_dir.unwrap_or_else(|| config.start_path.clone());
            match browser.load(&dir).await {
                Ok(_) => browser.create_folder(&name).await,
                Err(err) => Err(err),
            }
        }
        Commands::Rm { path } => {
            let path = normalize(&path);
            let name = path.rsplit('/').next().unwrap_or_default().to_string();
            let _ = browser.load(&parent(&path).unwrap_or_else(|| "/".to_string())).await;
            browser.delete(&path, &name).await
        }
        Commands::Rename { path, new_name } => browser.rename(&normalize(&path), &new_name).await,
        Commands::Mv { path, dest_dir } => browser.move_to(&normalize(&path), &dest_dir).await,
    };

    flush_notices(&mut events);
    if let Err(err) = result {
        tracing::error!(error = %err, "command failed");
        std::process::exit(1);
    }

    Ok(())
}
