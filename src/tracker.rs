//! A common tracking interface over RGBA frames.
//!
//! [`ObjectTracker`] is the cascade-based implementation: it runs one or more
//! named cascades over each frame and reports their merged detections.

use std::sync::Arc;

use serde::Serialize;

use crate::classifier::Cascade;
use crate::detector::{validate_settings, Detector};
use crate::error::{Error, Result};
use crate::integral::{IntegralTables, TableSet};
use crate::merge::DEFAULT_OVERLAP;
use crate::pixels::PixelBuffer;
use crate::registry::ClassifierRegistry;
use crate::scanner::ScanParams;
use crate::types::Detection;

/// The result of tracking one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackEvent {
    pub data: Vec<Detection>,
}

/// Something that can look at a frame and report what it found.
pub trait Tracker {
    fn track(&self, pixels: &[u8], width: u32, height: u32) -> Result<TrackEvent>;
}

/// Tracks objects with boosted cascades.
#[derive(Debug, Clone)]
pub struct ObjectTracker {
    classifiers: Vec<(String, Arc<Cascade>)>,
    params: ScanParams,
    overlap: f64,
}

impl ObjectTracker {
    pub fn new() -> Self {
        Self {
            classifiers: Vec::new(),
            params: ScanParams::default(),
            overlap: DEFAULT_OVERLAP,
        }
    }

    /// Build a tracker from registry entries, in the order given.
    pub fn from_registry(registry: &ClassifierRegistry, names: &[&str]) -> Result<Self> {
        let mut tracker = Self::new();
        for name in names {
            tracker = tracker.classifier(*name, registry.require(name)?);
        }
        Ok(tracker)
    }

    pub fn classifier(mut self, name: impl Into<String>, cascade: impl Into<Arc<Cascade>>) -> Self {
        self.classifiers.push((name.into(), cascade.into()));
        self
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

    pub fn overlap(mut self, value: f64) -> Self {
        self.overlap = value;
        self
    }

    pub fn classifier_names(&self) -> impl Iterator<Item = &str> {
        self.classifiers.iter().map(|(name, _)| name.as_str())
    }

    /// Per-classifier detections, in classifier order.
    pub fn track_by_classifier(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<(String, Vec<Detection>)>> {
        if self.classifiers.is_empty() {
            return Err(Error::InvalidClassifier(
                "tracker has no classifiers".into(),
            ));
        }
        validate_settings(&self.params, self.overlap)?;

        let image = PixelBuffer::new(pixels, width, height)?;
        let tables = IntegralTables::compute(
            &image,
            TableSet::for_cascade(self.params.edges_density > 0.0),
        )?;

        self.classifiers
            .iter()
            .map(|(name, cascade)| {
                let detections = Detector::new(Arc::clone(cascade))
                    .params(self.params)
                    .overlap(self.overlap)
                    .detect_in(&tables)?;
                Ok((name.clone(), detections))
            })
            .collect()
    }
}

impl Default for ObjectTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker for ObjectTracker {
    fn track(&self, pixels: &[u8], width: u32, height: u32) -> Result<TrackEvent> {
        let data = self
            .track_by_classifier(pixels, width, height)?
            .into_iter()
            .flat_map(|(_, detections)| detections)
            .collect();
        Ok(TrackEvent { data })
    }
}
