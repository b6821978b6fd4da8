//! # cascade-detect
//!
//! Pure Rust object detection with boosted cascades of weak classifiers
//! (Viola-Jones style) evaluated over integral images.
//!
//! This crate provides:
//! - **Integral images**: plain, squared, 45° tilted and Sobel-edge summed-area tables
//! - **Cascade evaluation**: early-exit stage machine over rectangle features
//! - **Multi-scale scanning**: sliding windows over a growing scale schedule
//! - **Merging**: union-find clustering of overlapping windows into detections
//!
//! ## Algorithm Overview
//!
//! 1. Compute the integral tables of the frame once
//! 2. For each scale, slide a window over the image:
//!    - Optionally skip windows with too little edge energy
//!    - Normalize by the window's mean and standard deviation
//!    - Run each stage; the first failing stage rejects the window
//! 3. Cluster accepted windows that overlap and average each cluster
//!
//! ## Quick Start
//!
//! ```rust
//! use cascade_detect::{Cascade, Detector};
//!
//! // Classifiers are flat arrays of numbers (see the `classifier` module).
//! // Load a trained one with `Cascade::load("face.json")`, or build one:
//! let cascade = Cascade::from_flat(&[
//!     20.0, 20.0, // window size
//!     -1.0, 1.0, // stage threshold, node count
//!     0.0, 1.0, 0.0, 0.0, 20.0, 20.0, 1.0, 0.0, 1.0, 1.0,
//! ])
//! .unwrap();
//!
//! let detector = Detector::new(cascade)
//!     .scale_factor(1.25)
//!     .step_size(1.5)
//!     .edges_density(0.0);
//!
//! // RGBA, row-major, 4 bytes per pixel.
//! let (width, height) = (96, 72);
//! let pixels = vec![255u8; (width * height * 4) as usize];
//!
//! for face in detector.detect(&pixels, width, height).unwrap() {
//!     println!("{}x{} at ({}, {}), {} windows", face.width, face.height, face.x, face.y, face.total);
//! }
//! ```
//!
//! ## Multiple Classifiers
//!
//! Keep named cascades in a [`ClassifierRegistry`] and run several at once
//! through an [`ObjectTracker`]:
//!
//! ```rust,no_run
//! use cascade_detect::{ClassifierRegistry, ObjectTracker, Tracker};
//!
//! let mut registry = ClassifierRegistry::new();
//! registry.load("face", "classifiers/face.json")?;
//! registry.load("eye", "classifiers/eye.json")?;
//!
//! let tracker = ObjectTracker::from_registry(&registry, &["face", "eye"])?;
//! # let (pixels, width, height) = (vec![0u8; 64 * 64 * 4], 64, 64);
//! let event = tracker.track(&pixels, width, height)?;
//! println!("{} objects", event.data.len());
//! # Ok::<(), cascade_detect::Error>(())
//! ```

pub mod classifier;
pub mod config;
mod detector;
mod disjoint_set;
mod error;
pub mod evaluator;
pub mod integral;
mod merge;
mod pixels;
mod registry;
pub mod scanner;
mod tracker;
mod types;

pub use classifier::{Cascade, FeatureRect, Stage, WeakNode};
pub use config::{load_config, DetectorConfig};
pub use detector::{detect, Detector};
pub use disjoint_set::DisjointSet;
pub use error::{Error, Result};
pub use evaluator::{CascadeEvaluator, Trace, Verdict, Window, WindowStats};
pub use integral::{IntegralTables, Table, TableSet};
pub use merge::{merge_rectangles, should_merge, DEFAULT_OVERLAP};
pub use pixels::{gray_rgba_from_fn, luma, rgba_from_fn, PixelBuffer};
pub use registry::ClassifierRegistry;
pub use scanner::{MultiScaleScanner, ScaleLevel, ScaleSchedule, ScanParams};
pub use tracker::{ObjectTracker, TrackEvent, Tracker};
pub use types::{Detection, Rect};
