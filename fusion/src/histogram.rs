//! 256-bin intensity histograms.

use image::GrayImage;

/// Intensity histogram of an 8-bit grayscale frame.
///
/// Built once per frame and immutable afterwards; the threshold selector and
/// the remapper both consume it read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    bins: [u32; 256],
    total: u64,
}

impl Histogram {
    /// Count pixel intensities of `frame` into 256 bins.
    pub fn from_gray(frame: &GrayImage) -> Self {
        let mut bins = [0u32; 256];
        for p in frame.pixels() {
            bins[p.0[0] as usize] += 1;
        }
        let total = u64::from(frame.width()) * u64::from(frame.height());
        Self { bins, total }
    }

    /// Build directly from bin counts.
    pub fn from_bins(bins: [u32; 256]) -> Self {
        let total = bins.iter().map(|&c| u64::from(c)).sum();
        Self { bins, total }
    }

    /// Pixel count at the given intensity value.
    pub fn count(&self, value: u8) -> u32 {
        self.bins[value as usize]
    }

    /// Total number of counted pixels.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Running cumulative counts; `cumulative()[v]` counts pixels with
    /// intensity `<= v`.
    pub fn cumulative(&self) -> [u64; 256] {
        let mut cum = [0u64; 256];
        let mut running = 0u64;
        for (i, &c) in self.bins.iter().enumerate() {
            running += u64::from(c);
            cum[i] = running;
        }
        cum
    }

    /// Smallest intensity with a non-zero bin count.
    pub fn lowest_occupied(&self) -> Option<u8> {
        self.bins.iter().position(|&c| c > 0).map(|i| i as u8)
    }

    /// Largest intensity with a non-zero bin count (the effective signal
    /// ceiling).
    pub fn highest_occupied(&self) -> Option<u8> {
        self.bins.iter().rposition(|&c| c > 0).map(|i| i as u8)
    }

    /// Number of distinct occupied intensity values.
    pub fn occupied_bins(&self) -> usize {
        self.bins.iter().filter(|&&c| c > 0).count()
    }
}
