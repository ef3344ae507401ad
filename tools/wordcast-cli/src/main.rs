//! Wordcast CLI: narrated, word-captioned vertical videos from JSON records.
//!
//! Usage:
//!   wordcast generate [OPTIONS]    Render every record into a video
//!   wordcast validate [OPTIONS]    Dry run: check records, images and outputs
//!   wordcast check                 Check external tools and fonts

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "wordcast",
    about = "Narrated vertical videos with word-timed captions",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the standard location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one video per record
    Generate {
        /// Folder of JSON record files
        #[arg(long)]
        json_folder: PathBuf,

        /// Folder of background images named by record id
        #[arg(long)]
        image_folder: PathBuf,

        /// Folder receiving the videos
        #[arg(long)]
        output_folder: PathBuf,

        /// Narration language code
        #[arg(long)]
        voice_lang: Option<String>,

        /// Caption font file
        #[arg(long)]
        font_path: Option<PathBuf>,

        /// Entries rendered in parallel (0 = one per CPU core)
        #[arg(long)]
        jobs: Option<usize>,

        /// Write a JSON run report here
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List what a generate run would do, without rendering
    Validate {
        /// Folder of JSON record files
        #[arg(long)]
        json_folder: PathBuf,

        /// Folder of background images named by record id
        #[arg(long)]
        image_folder: PathBuf,

        /// Folder that would receive the videos
        #[arg(long)]
        output_folder: Option<PathBuf>,
    },

    /// Check external tools and fonts
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => wordcast_common::config::AppConfig::load_from(path),
        None => wordcast_common::config::AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    wordcast_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Generate {
            json_folder,
            image_folder,
            output_folder,
            voice_lang,
            font_path,
            jobs,
            report,
        } => {
            if let Some(lang) = voice_lang {
                config.narration.language = lang;
            }
            if let Some(path) = font_path {
                config.style.font_path = path;
            }
            if let Some(jobs) = jobs {
                config.batch.jobs = jobs;
            }
            commands::generate::run(config, json_folder, image_folder, output_folder, report).await
        }
        Commands::Validate {
            json_folder,
            image_folder,
            output_folder,
        } => commands::validate::run(&config, json_folder, image_folder, output_folder),
        Commands::Check => commands::check::run(&config),
    }
}
