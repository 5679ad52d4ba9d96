use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use birdmedia::config::Config;
use birdmedia::db::{self, SqliteChannelStore};
use birdmedia::error::MediaError;
use birdmedia::media::{build_http_client, MediaService, Variant};
use birdmedia::species::SpeciesTable;
use birdmedia::spellcheck::spellcheck;

#[derive(Parser)]
#[command(name = "birdmedia")]
#[command(author, version, about = "Fetch and cache bird images and songs for the trivia bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the state record for a channel
    Setup { channel: String },

    /// Pick the next image of a bird for a channel
    Image {
        channel: String,
        bird: String,

        /// default, female or juvenile
        #[arg(short, long, default_value = "default")]
        variant: Variant,
    },

    /// Download a random recording of a bird
    Song { channel: String, bird: String },

    /// Download images for every bird on the list
    Precache,

    /// Abandon the current round in a channel
    Skip {
        channel: String,

        #[arg(long, conflicts_with = "goatsucker")]
        song: bool,

        #[arg(long)]
        goatsucker: bool,
    },

    /// Start a channel's image rotation over
    Reset { channel: String },

    /// Check an answer the way the bot grades it
    Check { guess: String, answer: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "birdmedia=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables if .env exists
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if let Commands::Check { guess, answer } = &cli.command {
        println!("{}", if spellcheck(guess, answer) { "correct" } else { "incorrect" });
        return Ok(());
    }

    tracing::info!("Initializing database at {}", config.database_path);
    let pool = db::create_pool(&config.database_path)?;
    db::init_database(&pool)?;
    let store = SqliteChannelStore::new(pool);

    let birds = Arc::new(SpeciesTable::load(
        &config.bird_list_path,
        &config.sci_bird_list_path,
    )?);
    let song_birds = Arc::new(SpeciesTable::load(
        &config.song_birds_path,
        &config.sci_song_birds_path,
    )?);

    let timeout = match cli.command {
        Commands::Precache => config.precache_timeout,
        _ => config.request_timeout,
    };
    let client = build_http_client(&config, timeout)?;
    let service = MediaService::new(
        &config,
        client,
        Arc::new(store.clone()),
        birds.clone(),
        song_birds,
    );

    match cli.command {
        Commands::Setup { channel } => {
            if store.setup_channel(&channel)? {
                println!("Ok, setup! I'm all ready to use!");
            }
        }
        Commands::Image {
            channel,
            bird,
            variant,
        } => {
            println!("**Fetching.** This may take a while.");
            match service.get_image(&channel, &bird, variant).await {
                Ok(file) => println!("{} (send as {})", file.path.display(), file.upload_name()),
                Err(e) => {
                    println!("{}", image_error_message(&e));
                    store.skip_image_round(&channel)?;
                }
            }
        }
        Commands::Song { channel, bird } => {
            println!("**Fetching.** This may take a while.");
            match service.fetch_song(&channel, &bird).await {
                Ok(file) => println!("{} (send as {})", file.path.display(), file.upload_name()),
                Err(e) => {
                    println!("{}", song_error_message(&e));
                    store.skip_song_round(&channel)?;
                }
            }
        }
        Commands::Precache => {
            let report = service.precache_images(&birds).await;
            println!("Cached {} image sets, {} failed", report.cached, report.failed);
        }
        Commands::Skip {
            channel,
            song,
            goatsucker,
        } => {
            if song {
                store.skip_song_round(&channel)?;
            } else if goatsucker {
                store.skip_goatsucker_round(&channel)?;
            } else {
                store.skip_image_round(&channel)?;
            }
            println!("Ok, skipped.");
        }
        Commands::Reset { channel } => {
            store.reset_rotation(&channel)?;
            println!("Ok, image rotation reset.");
        }
        // answered before the database was opened
        Commands::Check { .. } => {}
    }

    Ok(())
}

fn image_error_message(err: &MediaError) -> String {
    match err {
        MediaError::BlankSpecies => {
            "**There was an error fetching birds.**\n*Please try again.*".to_string()
        }
        other => format!(
            "**An error has occurred while fetching images.**\n*Please try again.*\n**Reason:** {}",
            other
        ),
    }
}

fn song_error_message(err: &MediaError) -> String {
    match err {
        MediaError::BlankSpecies => {
            "**There was an error fetching birds.**\n*Please try again.*".to_string()
        }
        MediaError::FileTooLarge { .. } => {
            "**Oops! File too large :(**\n*Please try again.*".to_string()
        }
        MediaError::NoMedia { .. } => "Unable to get song - bird was not found.".to_string(),
        MediaError::ProviderHttp { .. } | MediaError::Transport { .. } => {
            "**A GET error occurred when fetching the song.**\n*Please try again.*".to_string()
        }
        other => format!(
            "**An error has occurred while fetching the song.**\n*Please try again.*\n**Reason:** {}",
            other
        ),
    }
}
