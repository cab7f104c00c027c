//! Dual-sensor IR/visible image fusion.
//!
//! Fuses a low-resolution infrared frame with a visible-light frame into a
//! single composited image. The pipeline runs strictly forward once per
//! frame pair:
//!
//! 1. CLAHE contrast equalization of the IR frame ([`equalize`])
//! 2. 256-bin histogramming ([`histogram`])
//! 3. Automatic threshold selection with Yen's method ([`threshold`])
//! 4. Binarization / zero-below-threshold ([`threshold`])
//! 5. Percentile-based intensity remapping ([`remap`])
//! 6. Jet colorization with alpha masking ([`colorize`])
//! 7. Geometric alignment: sensor offset + homography warp ([`align`])
//! 8. Weighted compositing ([`composite`])
//!
//! [`pipeline::FusionPipeline`] drives the stages; [`store`] loads the
//! persisted homography calibration the aligner consumes.

pub mod align;
pub mod colorize;
pub mod composite;
pub mod equalize;
pub mod frame;
pub mod histogram;
pub mod pipeline;
pub mod remap;
pub mod store;
pub mod threshold;

pub use pipeline::{FusionConfig, FusionOutput, FusionPipeline, PipelineError};
