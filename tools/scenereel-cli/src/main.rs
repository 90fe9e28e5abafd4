//! SceneReel CLI: build slideshow videos from a scene manifest.
//!
//! Usage:
//!   scenereel init <MANIFEST>              Create an empty scene manifest
//!   scenereel add <MANIFEST> [OPTIONS]     Append a scene
//!   scenereel remove <MANIFEST> <SCENE>    Remove a scene by number
//!   scenereel list <MANIFEST>              List scenes
//!   scenereel audio <MANIFEST> [FILE]      Set or clear the soundtrack
//!   scenereel preview <MANIFEST> [SCENE]   Render one frame to PNG
//!   scenereel generate <MANIFEST>          Record the video
//!   scenereel check                        Check capture capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scenereel_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "scenereel",
    about = "Turn captioned images into a video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty scene manifest
    Init {
        /// Manifest file to create
        manifest: PathBuf,

        /// Video title
        #[arg(short, long, default_value = "")]
        title: String,
    },

    /// Append a scene
    Add {
        /// Manifest file
        manifest: PathBuf,

        /// Caption text
        #[arg(short, long)]
        caption: Option<String>,

        /// Image file (png, jpeg, ...)
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Duration in seconds (minimum 1)
        #[arg(short, long)]
        duration: Option<u32>,
    },

    /// Remove a scene
    Remove {
        /// Manifest file
        manifest: PathBuf,

        /// Scene number as shown by `list` (1-based)
        scene: usize,
    },

    /// List scenes
    List {
        /// Manifest file
        manifest: PathBuf,
    },

    /// Set the soundtrack, or clear it when no file is given
    Audio {
        /// Manifest file
        manifest: PathBuf,

        /// Audio file
        file: Option<PathBuf>,
    },

    /// Render a single frame to PNG
    Preview {
        /// Manifest file
        manifest: PathBuf,

        /// Scene number (1-based); omit for the idle frame
        scene: Option<usize>,

        /// Output PNG path
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
    },

    /// Record the video
    Generate {
        /// Manifest file
        manifest: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Preferred container: webm, mkv or mp4
        #[arg(long)]
        container: Option<String>,

        /// Frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Frame width
        #[arg(long)]
        width: Option<u32>,

        /// Frame height
        #[arg(long)]
        height: Option<u32>,

        /// Ignore the manifest soundtrack
        #[arg(long)]
        no_audio: bool,

        /// Run the timeline against the in-memory backend
        #[arg(long)]
        dry_run: bool,
    },

    /// Check capture capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    scenereel_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init { manifest, title } => commands::init::run(manifest, title),
        Commands::Add {
            manifest,
            caption,
            image,
            duration,
        } => commands::edit::add(&config, manifest, caption, image, duration),
        Commands::Remove { manifest, scene } => commands::edit::remove(manifest, scene),
        Commands::List { manifest } => commands::list::run(manifest),
        Commands::Audio { manifest, file } => commands::edit::set_audio(manifest, file),
        Commands::Preview {
            manifest,
            scene,
            output,
        } => commands::preview::run(&config, manifest, scene, output).await,
        Commands::Generate {
            manifest,
            output,
            container,
            fps,
            width,
            height,
            no_audio,
            dry_run,
        } => {
            commands::generate::run(
                &config,
                commands::generate::GenerateArgs {
                    manifest,
                    output,
                    container,
                    fps,
                    width,
                    height,
                    no_audio,
                    dry_run,
                },
            )
            .await
        }
        Commands::Check => commands::check::run(&config),
    }
}
