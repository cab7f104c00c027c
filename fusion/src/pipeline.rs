//! The fixed enhancement-and-fusion pipeline.
//!
//! Stages run strictly forward once per frame pair: equalize, histogram,
//! threshold, binarize, remap, colorize + mask, align, composite. All
//! intermediates are transient; the only state shared across invocations is
//! the immutable configuration and homography.

use crate::align::{self, AlignError, Homography, OffsetVector};
use crate::colorize::{self, ColorRange};
use crate::composite::{self, BlendWeights};
use crate::equalize::{self, DEFAULT_CLIP_LIMIT, DEFAULT_TILE_SIZE};
use crate::frame;
use crate::histogram::Histogram;
use crate::remap;
use crate::threshold::{self, ThresholdMode};
use image::{GrayImage, RgbaImage};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline failure modes.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An input frame has zero area.
    #[error("{0} frame is empty")]
    EmptyFrame(&'static str),
    /// The configured bright-outlier fraction is outside (0, 1].
    #[error("top_k must be in (0, 1], got {0}")]
    InvalidTopK(f32),
    #[error(transparent)]
    Align(#[from] AlignError),
}

/// One parameterized pipeline configuration.
///
/// Consolidates what used to be near-identical per-rig processing variants:
/// every deployment-specific knob (offsets, weights, mask range, threshold
/// mode) lives here instead of in a copied pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// CLAHE clip limit (multiplier on the uniform bin count).
    pub clip_limit: f32,
    /// CLAHE tile edge length in pixels.
    pub tile_size: usize,
    /// How the Yen threshold is applied to the equalized frame.
    pub threshold_mode: ThresholdMode,
    /// Fraction of bright outliers the remap ceiling may clip, in (0, 1].
    pub top_k: f32,
    /// Physical sensor mounting offset.
    pub offset: OffsetVector,
    /// Colors erased by the alpha masker after colorization.
    pub background_range: ColorRange,
    /// Compositing weights.
    pub weights: BlendWeights,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            clip_limit: DEFAULT_CLIP_LIMIT,
            tile_size: DEFAULT_TILE_SIZE,
            threshold_mode: ThresholdMode::ToZero,
            top_k: 0.1,
            offset: OffsetVector::new(-45, 90),
            background_range: ColorRange::jet_background(),
            weights: BlendWeights::default(),
        }
    }
}

/// Composited result plus the per-frame diagnostics the operator tooling
/// reports.
#[derive(Debug, Clone)]
pub struct FusionOutput {
    /// The final blended frame.
    pub frame: RgbaImage,
    /// Threshold selected by Yen's method for this frame.
    pub threshold: u8,
    /// Top-k ceiling computed by the remapper.
    pub topk: u8,
}

/// The fusion pipeline: immutable configuration plus the visible-to-IR
/// homography loaded at startup.
#[derive(Debug, Clone)]
pub struct FusionPipeline {
    config: FusionConfig,
    visible_to_ir: Homography,
}

impl FusionPipeline {
    /// Build a pipeline, rejecting configurations whose `top_k` falls
    /// outside (0, 1].
    pub fn new(config: FusionConfig, visible_to_ir: Homography) -> Result<Self, PipelineError> {
        if !(config.top_k > 0.0 && config.top_k <= 1.0) {
            return Err(PipelineError::InvalidTopK(config.top_k));
        }
        Ok(Self {
            config,
            visible_to_ir,
        })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse one frame pair.
    ///
    /// Both inputs are 8-bit grayscale (16-bit sources must already be
    /// normalized). The visible frame is warped onto the IR frame's canvas,
    /// so the two may differ in size on entry.
    pub fn fuse(&self, ir: &GrayImage, visible: &GrayImage) -> Result<FusionOutput, PipelineError> {
        if ir.width() == 0 || ir.height() == 0 {
            return Err(PipelineError::EmptyFrame("ir"));
        }
        if visible.width() == 0 || visible.height() == 0 {
            return Err(PipelineError::EmptyFrame("visible"));
        }

        let equalized = equalize::clahe(ir, self.config.tile_size, self.config.clip_limit);
        let hist = Histogram::from_gray(&equalized);
        let thresh = threshold::yen_threshold(&hist);
        let thresholded = threshold::apply_threshold(&equalized, thresh, self.config.threshold_mode);
        let (remapped, topk) = remap::remap_frame(&thresholded, self.config.top_k, thresh);
        debug!("yen threshold {thresh}, top-k ceiling {topk}");

        let mut colored = colorize::colorize(&remapped);
        colorize::mask_background(&mut colored, &self.config.background_range);

        let ir_aligned = align::translate(&colored, self.config.offset);
        let warped =
            align::warp_perspective(visible, &self.visible_to_ir, ir.width(), ir.height())?;
        let visible_rgba = frame::gray_to_rgba(&warped);

        let fused = composite::blend(&ir_aligned, &visible_rgba, &self.config.weights);
        Ok(FusionOutput {
            frame: fused,
            threshold: thresh,
            topk,
        })
    }
}
