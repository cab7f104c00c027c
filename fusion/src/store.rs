//! Persisted homography calibration store.
//!
//! The chessboard calibration collaborator writes both transform directions
//! to a JSON file; the fusion path loads it once at startup and treats the
//! matrices as immutable for the process lifetime.

use crate::align::Homography;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Store load/save failure modes. Any of these is fatal at startup.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read homography store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse homography store: {0}")]
    Parse(#[from] serde_json::Error),
    /// A matrix is missing rows or columns (an empty matrix included).
    #[error("matrix `{0}` must be 3x3")]
    BadShape(&'static str),
}

const IR_TO_VISIBLE_KEY: &str = "irToVisibleHomography";
const VISIBLE_TO_IR_KEY: &str = "visibleToIRHomography";

/// Both calibrated transform directions, keyed as the calibration
/// collaborator writes them. Only one direction is used by the fusion path
/// per configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomographyStore {
    #[serde(rename = "irToVisibleHomography")]
    ir_to_visible: Vec<Vec<f64>>,
    #[serde(rename = "visibleToIRHomography")]
    visible_to_ir: Vec<Vec<f64>>,
}

impl HomographyStore {
    pub fn new(ir_to_visible: [[f64; 3]; 3], visible_to_ir: [[f64; 3]; 3]) -> Self {
        Self {
            ir_to_visible: ir_to_visible.iter().map(|r| r.to_vec()).collect(),
            visible_to_ir: visible_to_ir.iter().map(|r| r.to_vec()).collect(),
        }
    }

    /// Load and validate the store. Both matrices must be present and
    /// exactly 3x3.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        let store: Self = serde_json::from_str(&json)?;
        store.validate()?;
        Ok(store)
    }

    /// Persist the store as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), StoreError> {
        check_shape(&self.ir_to_visible, IR_TO_VISIBLE_KEY)?;
        check_shape(&self.visible_to_ir, VISIBLE_TO_IR_KEY)?;
        Ok(())
    }

    pub fn ir_to_visible(&self) -> Homography {
        to_homography(&self.ir_to_visible)
    }

    pub fn visible_to_ir(&self) -> Homography {
        to_homography(&self.visible_to_ir)
    }
}

fn check_shape(matrix: &[Vec<f64>], key: &'static str) -> Result<(), StoreError> {
    if matrix.len() != 3 || matrix.iter().any(|row| row.len() != 3) {
        return Err(StoreError::BadShape(key));
    }
    Ok(())
}

/// Precondition: shape already validated.
fn to_homography(matrix: &[Vec<f64>]) -> Homography {
    let mut rows = [[0.0f64; 3]; 3];
    for (i, row) in matrix.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            rows[i][j] = v;
        }
    }
    Homography::from_rows(rows)
}
