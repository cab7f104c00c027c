//! Producer/consumer actors around the latest-frame mailboxes.
//!
//! One capture loop per sensor writes raw frames into its slot; the fusion
//! loop reads the current contents of both slots immediately before use.
//! Any producer failure raises the shared shutdown flag and everything winds
//! down — there is no automatic restart.

use crate::mailbox::{LatestSlot, ShutdownFlag};
use fusion::frame;
use fusion::pipeline::{FusionOutput, FusionPipeline};
use log::{error, info};
use ndarray::{s, Array2};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Capture-side failure modes. Each one halts the owning producer.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("sensor returned an empty frame")]
    EmptyFrame,
    #[error("sensor read failed: {0}")]
    Device(String),
}

/// A source of raw 16-bit sensor frames. Physical devices live behind this
/// seam; tests script it.
pub trait FrameSource: Send {
    /// Sensor name for diagnostics.
    fn name(&self) -> &str;

    /// Grab the next frame, blocking until the device produces one.
    fn grab(&mut self) -> Result<Array2<u16>, CaptureError>;
}

/// Per-sensor capture options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    /// Mirror frames horizontally (sensor mounted flipped).
    pub mirror: bool,
}

/// Run one producer loop until the shared shutdown flag is raised.
///
/// Each grabbed frame overwrites the slot. A grab failure or an empty frame
/// halts this producer and raises the flag for everyone else.
pub fn run_capture_loop<S: FrameSource>(
    mut source: S,
    slot: LatestSlot<Array2<u16>>,
    shutdown: ShutdownFlag,
    options: CaptureOptions,
) {
    while !shutdown.is_raised() {
        match source.grab() {
            Ok(frame) if frame.is_empty() => {
                error!("{}: {}; stopping capture", source.name(), CaptureError::EmptyFrame);
                shutdown.raise();
                break;
            }
            Ok(frame) => {
                let frame = if options.mirror {
                    mirror_horizontal(&frame)
                } else {
                    frame
                };
                slot.publish(frame);
            }
            Err(err) => {
                error!("{}: {err}; stopping capture", source.name());
                shutdown.raise();
                break;
            }
        }
    }
    info!("{}: capture loop exited", source.name());
}

/// Spawn a producer loop on its own thread, named after the sensor.
pub fn spawn_capture<S: FrameSource + 'static>(
    source: S,
    slot: LatestSlot<Array2<u16>>,
    shutdown: ShutdownFlag,
    options: CaptureOptions,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("capture-{}", source.name()))
        .spawn(move || run_capture_loop(source, slot, shutdown, options))
}

fn mirror_horizontal(frame: &Array2<u16>) -> Array2<u16> {
    frame.slice(s![.., ..;-1]).to_owned()
}

/// Run the consumer loop: normalize and fuse the latest frame pair from both
/// slots, handing each result to `sink`, until the shutdown flag is raised.
///
/// Slots are read non-blocking right before use; when either is still empty
/// the loop idles for `idle` and tries again. The two frames fused together
/// are whatever is newest in each slot, not a synchronized pair.
pub fn run_fusion_loop<F>(
    pipeline: &FusionPipeline,
    ir_slot: &LatestSlot<Array2<u16>>,
    visible_slot: &LatestSlot<Array2<u16>>,
    shutdown: &ShutdownFlag,
    idle: Duration,
    sink: &mut F,
) -> anyhow::Result<()>
where
    F: FnMut(FusionOutput) -> anyhow::Result<()>,
{
    while !shutdown.is_raised() {
        let (Some(ir_raw), Some(visible_raw)) = (ir_slot.latest(), visible_slot.latest()) else {
            thread::sleep(idle);
            continue;
        };

        let ir = frame::normalize_u16(&ir_raw);
        let visible = frame::normalize_u16(&visible_raw);
        let output = pipeline.fuse(&ir, &visible)?;
        sink(output)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion::align::{Homography, OffsetVector};
    use fusion::pipeline::FusionConfig;
    use ndarray::arr2;
    use std::collections::VecDeque;

    struct ScriptedSource {
        name: &'static str,
        frames: VecDeque<Array2<u16>>,
    }

    impl ScriptedSource {
        fn new(name: &'static str, frames: Vec<Array2<u16>>) -> Self {
            Self {
                name,
                frames: frames.into(),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn name(&self) -> &str {
            self.name
        }

        fn grab(&mut self) -> Result<Array2<u16>, CaptureError> {
            self.frames
                .pop_front()
                .ok_or_else(|| CaptureError::Device("device disconnected".to_string()))
        }
    }

    #[test]
    fn test_capture_loop_publishes_latest_and_raises_shutdown() {
        let frames = vec![
            Array2::from_elem((2, 2), 1u16),
            Array2::from_elem((2, 2), 2u16),
            Array2::from_elem((2, 2), 3u16),
        ];
        let source = ScriptedSource::new("ir", frames);
        let slot = LatestSlot::new();
        let shutdown = ShutdownFlag::new();

        run_capture_loop(source, slot.clone(), shutdown.clone(), CaptureOptions::default());

        // Source exhausted: the loop halted itself and signalled everyone.
        assert!(shutdown.is_raised());
        assert_eq!(slot.latest().unwrap()[[0, 0]], 3);
    }

    #[test]
    fn test_capture_loop_mirrors_frames() {
        let source = ScriptedSource::new("ir", vec![arr2(&[[1u16, 2], [3, 4]])]);
        let slot = LatestSlot::new();
        let shutdown = ShutdownFlag::new();

        run_capture_loop(
            source,
            slot.clone(),
            shutdown.clone(),
            CaptureOptions { mirror: true },
        );

        let frame = slot.latest().unwrap();
        assert_eq!(frame, arr2(&[[2u16, 1], [4, 3]]));
    }

    #[test]
    fn test_capture_loop_halts_on_empty_frame() {
        let frames = vec![Array2::from_elem((2, 2), 5u16), Array2::zeros((0, 0))];
        let source = ScriptedSource::new("visible", frames);
        let slot = LatestSlot::new();
        let shutdown = ShutdownFlag::new();

        run_capture_loop(source, slot.clone(), shutdown.clone(), CaptureOptions::default());

        assert!(shutdown.is_raised());
        // The good frame before the failure is still readable.
        assert_eq!(slot.latest().unwrap()[[1, 1]], 5);
    }

    #[test]
    fn test_capture_loop_observes_external_shutdown() {
        let source = ScriptedSource::new("ir", vec![]);
        let slot = LatestSlot::new();
        let shutdown = ShutdownFlag::new();
        shutdown.raise();

        // Raised before entry: the loop must exit without grabbing.
        run_capture_loop(source, slot.clone(), shutdown, CaptureOptions::default());
        assert!(slot.is_empty());
    }

    #[test]
    fn test_fusion_loop_consumes_latest_pair() {
        let config = FusionConfig {
            offset: OffsetVector::new(0, 0),
            ..FusionConfig::default()
        };
        let pipeline = FusionPipeline::new(config, Homography::identity()).unwrap();

        let ir_slot = LatestSlot::new();
        let visible_slot = LatestSlot::new();
        let shutdown = ShutdownFlag::new();

        let mut ir_raw = Array2::from_elem((16, 16), 100u16);
        ir_raw[[8, 8]] = 4000;
        ir_slot.publish(ir_raw);
        visible_slot.publish(Array2::from_elem((16, 16), 500u16));

        let mut outputs = Vec::new();
        let stop = shutdown.clone();
        run_fusion_loop(
            &pipeline,
            &ir_slot,
            &visible_slot,
            &shutdown,
            Duration::from_millis(1),
            &mut |out| {
                outputs.push(out);
                // One pair is enough for the test.
                stop.raise();
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].frame.dimensions(), (16, 16));
    }
}
