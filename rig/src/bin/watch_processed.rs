//! Watch a drop directory for processed frames from the calibration
//! collaborator and log each one as it arrives.

use anyhow::Result;
use clap::Parser;
use image::GenericImageView;
use log::info;
use rig::mailbox::ShutdownFlag;
use rig::watch;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Poll a directory for processed frames")]
struct Args {
    /// Directory the collaborator drops frames into.
    #[arg(long, default_value = "processed")]
    dir: PathBuf,

    /// Seconds between sweeps.
    #[arg(long, default_value = "1")]
    interval_secs: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let shutdown = ShutdownFlag::new();
    info!(
        "watching {} every {}s",
        args.dir.display(),
        args.interval_secs
    );
    watch::watch_directory(
        &args.dir,
        Duration::from_secs(args.interval_secs),
        &shutdown,
        |path, frame| {
            let (w, h) = frame.dimensions();
            info!("received {} ({w}x{h})", path.display());
            Ok(())
        },
    )
}
