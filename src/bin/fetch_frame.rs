//! fetch_frame - grab one still from an HTTP camera and save it.
//!
//! Useful for checking an ESP32 camera before pointing the tracker at it.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use person_tracker::ingest::http::fetch_still;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch a single still frame from an HTTP camera")]
struct Args {
    /// Camera snapshot URL.
    #[arg(long, env = "TRACKER_SOURCE_URL", default_value = "http://192.168.4.1/")]
    url: String,

    /// Where to write the image; the format follows the extension.
    #[arg(long, default_value = "frame.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let frame = fetch_still(&args.url)?;
    frame
        .to_image()?
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!(
        "saved {}x{} frame from {} to {}",
        frame.width,
        frame.height,
        args.url,
        args.output.display()
    );
    Ok(())
}
