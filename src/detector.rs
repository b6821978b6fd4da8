use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::debug;

use crate::classifier::Cascade;
use crate::error::{Error, Result};
use crate::integral::{IntegralTables, TableSet};
use crate::merge::{merge_rectangles, DEFAULT_OVERLAP};
use crate::pixels::PixelBuffer;
use crate::scanner::{MultiScaleScanner, ScanParams};
use crate::types::{Detection, Rect};

/// Cascade object detector: integral tables, multi-scale scan, merge.
///
/// A `Detector` holds only the shared, immutable cascade and its settings.
/// Every call builds its own tables and clustering state, so one detector
/// can serve concurrent calls on different buffers.
///
/// # Usage
///
/// ```
/// use cascade_detect::{Cascade, Detector};
///
/// let cascade = Cascade::from_flat(&[
///     20.0, 20.0,
///     -1.0, 1.0,
///     0.0, 1.0, 0.0, 0.0, 20.0, 20.0, 1.0, 0.0, 1.0, 1.0,
/// ])
/// .unwrap();
/// let detector = Detector::new(cascade).edges_density(0.0);
///
/// let pixels = vec![128u8; 64 * 64 * 4];
/// let detections = detector.detect(&pixels, 64, 64).unwrap();
/// assert!(!detections.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Detector {
    cascade: Arc<Cascade>,
    params: ScanParams,
    overlap: f64,
}

impl Detector {
    pub fn new(cascade: impl Into<Arc<Cascade>>) -> Self {
        Self {
            cascade: cascade.into(),
            params: ScanParams::default(),
            overlap: DEFAULT_OVERLAP,
        }
    }

    pub fn params(mut self, params: ScanParams) -> Self {
        self.params = params;
        self
    }

    pub fn initial_scale(mut self, value: f64) -> Self {
        self.params.initial_scale = value;
        self
    }

    pub fn scale_factor(mut self, value: f64) -> Self {
        self.params.scale_factor = value;
        self
    }

    pub fn step_size(mut self, value: f64) -> Self {
        self.params.step_size = value;
        self
    }

    pub fn edges_density(mut self, value: f64) -> Self {
        self.params.edges_density = value;
        self
    }

    /// Overlap threshold used when merging raw windows.
    pub fn overlap(mut self, value: f64) -> Self {
        self.overlap = value;
        self
    }

    pub fn scan_params(&self) -> &ScanParams {
        &self.params
    }

    pub fn cascade(&self) -> &Arc<Cascade> {
        &self.cascade
    }

    /// Check every setting; called before any scanning begins.
    pub fn validate(&self) -> Result<()> {
        validate_settings(&self.params, self.overlap)
    }

    /// The tables a scan with these settings reads.
    pub fn required_tables(&self) -> TableSet {
        TableSet::for_cascade(self.params.edges_density > 0.0)
    }

    /// Detect objects in an RGBA buffer of `width * height * 4` bytes.
    pub fn detect(&self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let tables = self.prepare(pixels, width, height)?;
        self.detect_in(&tables)
    }

    /// Like [`Detector::detect`], checking `cancel` between scale iterations.
    pub fn detect_with_cancel(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        cancel: &AtomicBool,
    ) -> Result<Vec<Detection>> {
        let tables = self.prepare(pixels, width, height)?;
        let candidates = self.scanner(&tables)?.scan_with_cancel(cancel)?;
        Ok(self.merge(&candidates))
    }

    /// Detect using tables that were already computed for this image.
    pub fn detect_in(&self, tables: &IntegralTables) -> Result<Vec<Detection>> {
        let candidates = self.candidates(tables)?;
        Ok(self.merge(&candidates))
    }

    /// The raw accepted windows, before merging.
    pub fn candidates(&self, tables: &IntegralTables) -> Result<Vec<Rect>> {
        self.validate()?;
        Ok(self.scanner(tables)?.scan())
    }

    fn prepare(&self, pixels: &[u8], width: u32, height: u32) -> Result<IntegralTables> {
        self.validate()?;
        let image = PixelBuffer::new(pixels, width, height)?;
        IntegralTables::compute(&image, self.required_tables())
    }

    fn scanner<'a>(&'a self, tables: &'a IntegralTables) -> Result<MultiScaleScanner<'a>> {
        MultiScaleScanner::new(tables, &self.cascade, self.params)
    }

    fn merge(&self, candidates: &[Rect]) -> Vec<Detection> {
        let detections = merge_rectangles(candidates, self.overlap);
        debug!(
            "{} raw windows merged into {} detections",
            candidates.len(),
            detections.len()
        );
        detections
    }
}

pub(crate) fn validate_settings(params: &ScanParams, overlap: f64) -> Result<()> {
    params.validate()?;
    if !overlap.is_finite() || overlap < 0.0 {
        return Err(Error::InvalidParameter {
            name: "overlap",
            value: overlap,
        });
    }
    Ok(())
}

/// One-shot detection with an unparsed classifier blob.
///
/// The blob is validated along with every other argument before scanning.
#[allow(clippy::too_many_arguments)]
pub fn detect(
    pixels: &[u8],
    width: u32,
    height: u32,
    initial_scale: f64,
    scale_factor: f64,
    step_size: f64,
    edges_density: f64,
    classifier: &[f64],
) -> Result<Vec<Detection>> {
    let cascade = Cascade::from_flat(classifier)?;
    Detector::new(cascade)
        .params(ScanParams {
            initial_scale,
            scale_factor,
            step_size,
            edges_density,
        })
        .detect(pixels, width, height)
}
