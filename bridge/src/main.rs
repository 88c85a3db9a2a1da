use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use immich_bridge::client::BridgeClient;
use immich_bridge::config::BridgeConfig;
use immich_bridge::immich::{ImmichClient, SearchResult};
use immich_bridge::import::ImageImporter;
use immich_bridge::media::LocalMediaStore;
use immich_bridge::nonce::NonceScope;
use immich_bridge::settings::{FileSettingsStore, Settings, SettingsStore};
use immich_bridge::web::{self, api::sanitize_text, ServeOptions};
use immich_bridge::widget::{ControllerDriver, ControllerOptions, EditorHost, Event, View};

#[derive(Parser)]
#[command(name = "immich-bridge")]
#[command(about = "Search an Immich library and import images into your content")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (otherwise .bridge.toml is searched for)
    #[arg(long, global = true, env = "BRIDGE_CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Listen address
        #[arg(long, env = "BRIDGE_BIND")]
        bind: Option<String>,
        /// Admin token (Bearer header or Basic password) for admin routes
        #[arg(long, env = "BRIDGE_ADMIN_TOKEN", hide_env_values = true)]
        admin_token: Option<String>,
        /// Open the editor page in a browser
        #[arg(long)]
        open: bool,
    },
    /// Show or change the Immich connection settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Search the Immich library directly
    Search {
        query: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Import an asset into local media and print the markup
    Import { id: String },
    /// Interactive picker against a running bridge
    Pick {
        /// Bridge base URL (defaults to the configured public URL)
        #[arg(long)]
        endpoint: Option<String>,
        /// Admin token to use; fetched from the bridge when omitted
        #[arg(long)]
        nonce: Option<String>,
        #[arg(long, env = "BRIDGE_ADMIN_TOKEN", hide_env_values = true)]
        admin_token: Option<String>,
    },
    /// Fetch an anti-forgery token from a running bridge
    Nonce {
        #[arg(long, default_value = "public")]
        scope: NonceScope,
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long, env = "BRIDGE_ADMIN_TOKEN", hide_env_values = true)]
        admin_token: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings (API key masked)
    Show,
    /// Update settings; omitted values are kept
    Set {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    bridge_common::init_tracing("immich_bridge")?;

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load_from_path(path)?,
        None => BridgeConfig::load()?,
    };

    match cli.command {
        Commands::Serve {
            bind,
            admin_token,
            open,
        } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if admin_token.is_some() {
                config.server.admin_token = admin_token;
            }
            open_settings(&config).await?;
            web::serve(config, ServeOptions { open_browser: open }).await?;
        }
        Commands::Settings { action } => run_settings(&config, action).await?,
        Commands::Search { query, json } => run_search(&config, &query, json).await?,
        Commands::Import { id } => run_import(&config, &id).await?,
        Commands::Pick {
            endpoint,
            nonce,
            admin_token,
        } => {
            let endpoint = endpoint.unwrap_or_else(|| config.public_url());
            run_pick(&config, &endpoint, nonce, admin_token).await?;
        }
        Commands::Nonce {
            scope,
            endpoint,
            admin_token,
        } => {
            let endpoint = endpoint.unwrap_or_else(|| config.public_url());
            let nonce = BridgeClient::issue_nonce(
                &reqwest::Client::new(),
                &endpoint,
                scope,
                admin_token.as_deref(),
            )
            .await
            .map_err(anyhow::Error::msg)?;
            println!("{}", nonce.token);
            eprintln!("expires {}", nonce.expires_at.to_rfc3339());
        }
    }

    Ok(())
}

/// Settings store for `config`, seeded from `IMMICH_URL`/`IMMICH_API_KEY`
/// when no settings file exists yet
async fn open_settings(config: &BridgeConfig) -> Result<FileSettingsStore> {
    let store = FileSettingsStore::new(config.settings_path()?);

    let url = std::env::var("IMMICH_URL").unwrap_or_default();
    let key = std::env::var("IMMICH_API_KEY").unwrap_or_default();
    if !url.is_empty() || !key.is_empty() {
        let seed = Settings::from_input(&url, &key).context("IMMICH_URL")?;
        store.seed_if_missing(&seed).await?;
    }

    Ok(store)
}

async fn immich_client(config: &BridgeConfig) -> Result<ImmichClient> {
    let settings = open_settings(config).await?.load().await?;
    let http = ImmichClient::http_client(&config.immich.user_agent)?;
    Ok(ImmichClient::new(http, &settings, config.thumbnail_source())?)
}

async fn run_settings(config: &BridgeConfig, action: SettingsAction) -> Result<()> {
    let store = open_settings(config).await?;
    let current = store.load().await?;

    match action {
        SettingsAction::Show => {
            println!("file:       {}", store.path().display());
            println!("server_url: {}", current.server_url);
            println!("api_key:    {}", current.masked_api_key());
            println!("configured: {}", current.is_configured());
        }
        SettingsAction::Set { url, api_key } => {
            let settings = Settings::from_input(
                url.as_deref().unwrap_or(&current.server_url),
                api_key.as_deref().unwrap_or(&current.api_key),
            )?;
            store.save(&settings).await?;
            println!("Saved settings to {}", store.path().display());
        }
    }
    Ok(())
}

async fn run_search(config: &BridgeConfig, query: &str, json: bool) -> Result<()> {
    let query = sanitize_text(query);
    let min = config.widget.min_query_chars;
    if query.chars().count() < min {
        bail!("Please enter at least {min} characters to search");
    }

    let results = immich_client(config).await?.search(&query).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No images found matching your search.");
    }
    for r in &results {
        println!("{}\t{}\t{}", r.id, r.filename, r.thumbnail_url);
    }
    Ok(())
}

async fn run_import(config: &BridgeConfig, id: &str) -> Result<()> {
    let client = immich_client(config).await?;
    let store = LocalMediaStore::new(config.media_dir()?, &config.public_url());
    store.ensure_dirs().await?;

    let asset = ImageImporter::new(&client, &store).import(id).await?;
    println!("{}", serde_json::to_string_pretty(&asset)?);
    Ok(())
}

/// Picker that draws into the terminal
struct TerminalHost {
    results: Arc<Mutex<Vec<SearchResult>>>,
}

impl EditorHost for TerminalHost {
    fn render(&mut self, view: &View) {
        let items = match view {
            View::Results(items) => items.clone(),
            other => {
                if let Some(message) = other.message() {
                    println!("{message}");
                }
                Vec::new()
            }
        };

        for (i, item) in items.iter().enumerate() {
            println!("  #{:<3} {}  ({})", i + 1, item.filename, item.id);
        }
        *self.results.lock().unwrap_or_else(|p| p.into_inner()) = items;
    }

    fn insert_markup(&mut self, html: &str) {
        println!("\n{html}\n");
    }

    fn alert(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn show_importing(&mut self, id: &str) {
        println!("Importing {id}...");
    }

    fn close_overlay(&mut self) {
        println!("Inserted. Type another query, or :q to quit.");
    }
}

async fn run_pick(
    config: &BridgeConfig,
    endpoint: &str,
    nonce: Option<String>,
    admin_token: Option<String>,
) -> Result<()> {
    let http = reqwest::Client::new();
    let nonce = match nonce {
        Some(nonce) => nonce,
        None => {
            BridgeClient::issue_nonce(&http, endpoint, NonceScope::Admin, admin_token.as_deref())
                .await
                .map_err(anyhow::Error::msg)?
                .token
        }
    };

    let results = Arc::new(Mutex::new(Vec::new()));
    let host = TerminalHost {
        results: Arc::clone(&results),
    };
    let options = ControllerOptions {
        debounce: config.debounce(),
        min_query_chars: config.widget.min_query_chars,
    };
    let api = Arc::new(BridgeClient::new(http, endpoint, nonce));
    let (tx, rx) = mpsc::channel(16);
    let picker = tokio::spawn(ControllerDriver::new(options, api, host).run(rx));

    println!("Type a query to search, #N to import result N, :q to quit.");
    let _ = tx.send(Event::OpenOverlay).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == ":q" {
            break;
        }

        let event = match line.strip_prefix('#').and_then(|n| n.parse::<usize>().ok()) {
            Some(n) => {
                let id = results
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .get(n.wrapping_sub(1))
                    .map(|r| r.id.clone());
                match id {
                    Some(id) => Event::Select(id),
                    None => {
                        eprintln!("No result #{n}");
                        continue;
                    }
                }
            }
            None => Event::Input(line.to_string()),
        };

        if tx.send(event).await.is_err() {
            break;
        }
    }

    drop(tx);
    picker.await?;
    Ok(())
}
