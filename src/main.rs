//! hat-designer command-line front end
//!
//! Fills in a hat draft from the command line, generates it onto a preview
//! surface and exports the result as `custom_hat.png`.
//!
//! # Usage
//!
//! ```bash
//! # Pink beanie with default settings, written to the current directory
//! hat-designer
//!
//! # Fedora with a caption and label, custom surface settings
//! hat-designer --style fedora --material wool --text "Doggo" \
//!     --settings surface.json --out-dir ./out
//!
//! # Dump the default surface settings as a starting point
//! hat-designer --print-settings > surface.json
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hat_designer::{
    DownloadDir, ExportOutcome, ExportPipeline, HatDesigner, PreviewSurface, SurfaceSettings,
};

/// Hat Designer - configure a hat and export a snapshot of it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Hat color, e.g. "#d48fa7"
    #[arg(short, long)]
    color: Option<String>,

    /// Material label shown in the caption
    #[arg(short, long, default_value = "")]
    material: String,

    /// Hat style: beanie, fedora or bucket (anything else draws a beanie)
    #[arg(short, long, default_value = "")]
    style: String,

    /// Free-text label shown bottom-left
    #[arg(short, long, default_value = "")]
    text: String,

    /// JSON file with preview surface settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory the exported image is written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Export without mounting a preview surface (produces no file)
    #[arg(long)]
    no_surface: bool,

    /// Print the effective surface settings as JSON and exit
    #[arg(long)]
    print_settings: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = match &args.settings {
        Some(path) => SurfaceSettings::load(path)
            .with_context(|| format!("Failed to load surface settings: {}", path.display()))?,
        None => SurfaceSettings::default(),
    };

    if args.print_settings {
        println!("{}", settings.to_json_pretty()?);
        return Ok(());
    }

    let exporter = ExportPipeline::new(DownloadDir::new(&args.out_dir));
    let mut designer = HatDesigner::new(exporter);
    if !args.no_surface {
        designer.mount_surface(PreviewSurface::new(&settings));
    }

    if let Some(color) = args.color {
        designer.set_color(color);
    }
    designer.set_material(args.material);
    designer.set_style(args.style);
    designer.set_text(args.text);
    designer.generate();

    match designer
        .export()
        .await
        .context("Failed to export hat image")?
    {
        ExportOutcome::Delivered(delivery) => {
            let path = delivery.path.unwrap_or_else(|| args.out_dir.join(delivery.file_name));
            info!("Saved {} ({} bytes)", path.display(), delivery.size);
        }
        ExportOutcome::NotCaptured(reason) => {
            info!("Nothing exported: {reason}");
        }
    }

    Ok(())
}
