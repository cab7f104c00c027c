//! One-shot fusion of an IR/visible frame pair from disk.
//!
//! Loads the calibrated homography store, runs the full pipeline on the two
//! input frames, and writes the composited RGBA result.

use anyhow::{bail, Context, Result};
use clap::Parser;
use fusion::align::OffsetVector;
use fusion::frame;
use fusion::store::HomographyStore;
use fusion::threshold::ThresholdMode;
use fusion::{FusionConfig, FusionPipeline};
use image::GrayImage;
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fuse an IR frame with a visible frame")]
struct Args {
    /// Homography calibration JSON written by the chessboard calibrator.
    #[arg(long, default_value = "homography_store.json")]
    homography: PathBuf,

    /// IR input frame.
    #[arg(long)]
    ir: PathBuf,

    /// Visible-spectrum input frame.
    #[arg(long)]
    visible: PathBuf,

    /// Output path for the composited frame.
    #[arg(short, long, default_value = "fused.png")]
    output: PathBuf,

    /// Fraction of bright outliers the remap ceiling may clip.
    #[arg(long, default_value = "0.1")]
    top_k: f32,

    /// Horizontal mounting offset in pixels.
    #[arg(long, default_value = "-45", allow_negative_numbers = true)]
    offset_x: i32,

    /// Vertical mounting offset in pixels.
    #[arg(long, default_value = "90", allow_negative_numbers = true)]
    offset_y: i32,

    /// Threshold to pure black/white instead of keeping intensities.
    #[arg(long)]
    binary: bool,
}

fn load_gray(path: &Path) -> Result<GrayImage> {
    let img = image::open(path).with_context(|| format!("loading {}", path.display()))?;
    let gray = frame::to_gray8(&img);
    if gray.width() == 0 || gray.height() == 0 {
        bail!("{} decoded to an empty frame", path.display());
    }
    Ok(gray)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = HomographyStore::load(&args.homography)
        .with_context(|| format!("loading {}", args.homography.display()))?;

    let ir = load_gray(&args.ir)?;
    let visible = load_gray(&args.visible)?;
    info!(
        "fusing {}x{} IR with {}x{} visible",
        ir.width(),
        ir.height(),
        visible.width(),
        visible.height()
    );

    let config = FusionConfig {
        top_k: args.top_k,
        offset: OffsetVector::new(args.offset_x, args.offset_y),
        threshold_mode: if args.binary {
            ThresholdMode::Binary
        } else {
            ThresholdMode::ToZero
        },
        ..FusionConfig::default()
    };
    let pipeline = FusionPipeline::new(config, store.visible_to_ir())
        .context("invalid fusion configuration")?;

    let output = pipeline.fuse(&ir, &visible)?;
    info!(
        "threshold {} topk {}",
        output.threshold, output.topk
    );

    output
        .frame
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!("wrote {}", args.output.display());
    Ok(())
}
