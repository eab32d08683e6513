use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lingo_cache::{CacheConfig, CacheHub, HttpTranslator, NowPlayingEntry, SystemClock};

#[derive(Parser)]
#[command(name = "lingo-cache")]
#[command(about = "Inspect and exercise the language-learning caches", long_about = None)]
struct Cli {
    /// Data directory (overrides LINGO_CACHE_DATA_DIR)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a word through the cache tiers
    Translate {
        word: String,

        /// Source language
        #[arg(short, long)]
        from: String,

        /// Target language
        #[arg(short, long)]
        to: String,
    },

    /// Record a video as recently played
    Play {
        /// Language partition
        lang: String,

        url: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        thumbnail: Option<String>,

        /// Display length, e.g. "12:03"
        #[arg(long)]
        length: Option<String>,
    },

    /// List recently played videos for a language
    Recent { lang: String },

    /// List recently seen words
    Seen,

    /// Show cache statistics
    Stats,
}

fn load_config(cli: &Cli) -> Result<CacheConfig> {
    let mut config = CacheConfig::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lingo_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let hub = CacheHub::open(config, Arc::new(SystemClock))?;

    match cli.command {
        Commands::Translate { ref word, ref from, ref to } => {
            let translator = HttpTranslator::new(&hub.config().translator_url, hub.config().lookup_timeout)?;
            let resolved = hub.translate(word, from, to, &translator).await;
            println!("{} ({})", resolved.text, resolved.source);
        }

        Commands::Play {
            ref lang,
            ref url,
            ref title,
            ref description,
            ref thumbnail,
            ref length,
        } => {
            let mut entry = NowPlayingEntry::new(lang.as_str(), url.as_str(), title.as_str(), Utc::now());
            if let Some(description) = description {
                entry = entry.with_description(description.as_str());
            }
            if let Some(thumbnail) = thumbnail {
                entry = entry.with_thumbnail(thumbnail.as_str());
            }
            if let Some(length) = length {
                entry = entry.with_length(length.as_str());
            }

            if hub.upsert_now_playing(entry).await {
                println!("Recorded {} under {}", url, lang);
            } else {
                println!("Ignored: language, url and title must be non-empty");
            }
        }

        Commands::Recent { ref lang } => {
            let entries = hub.list_now_playing(lang).await;
            if entries.is_empty() {
                println!("Nothing played for {}", lang);
            }
            for (i, entry) in entries.iter().enumerate() {
                let length = entry.length.as_deref().unwrap_or("-");
                println!("{:>2}. {} [{}] {}", i + 1, entry.title, length, entry.url);
            }
        }

        Commands::Seen => {
            let words = hub.recently_seen().await;
            if words.is_empty() {
                println!("No words seen yet");
            }
            for word in words {
                println!("{}", word);
            }
        }

        Commands::Stats => {
            println!("{}", hub.stats().await);
        }
    }

    hub.flush().await;
    Ok(())
}
