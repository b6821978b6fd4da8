//! Boosted cascade classifiers and their flat wire format.
//!
//! A classifier blob is a flat array of `f64`, read positionally:
//!
//! ```text
//! [0] minWindowWidth
//! [1] minWindowHeight
//! repeated until the end of the array:
//!   stageThreshold
//!   nodeCount
//!   nodeCount x {
//!     tiltedFlag (0 | 1)
//!     rectCount
//!     rectCount x { x, y, w, h, weight }
//!     nodeThreshold
//!     leftValue
//!     rightValue
//!   }
//! ```
//!
//! [`Cascade::from_flat`] validates a blob and turns it into a typed
//! structure; [`Cascade::to_flat`] writes it back out.
//!
//! # Example
//!
//! ```
//! use cascade_detect::Cascade;
//!
//! // 20x20 window, one stage with one single-rectangle node.
//! let blob = [
//!     20.0, 20.0,
//!     -1.0, 1.0,
//!     0.0, 1.0, 0.0, 0.0, 20.0, 20.0, 1.0, 0.0, 1.0, 1.0,
//! ];
//! let cascade = Cascade::from_flat(&blob).unwrap();
//! assert_eq!(cascade.num_stages(), 1);
//! assert_eq!(cascade.to_flat(), blob.to_vec());
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bzip2::read::BzDecoder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One weighted rectangle of a weak node, in window-normalized units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
}

/// A weak threshold classifier over a weighted sum of rectangle features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakNode {
    /// Rectangles are 45° rotated and read from the tilted table.
    pub tilted: bool,
    pub rects: Vec<FeatureRect>,
    pub threshold: f64,
    /// Added to the stage sum when the feature response is below threshold.
    pub left: f64,
    /// Added to the stage sum otherwise.
    pub right: f64,
}

/// One boosted stage. A window fails the stage when the summed node
/// votes fall below `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub threshold: f64,
    pub nodes: Vec<WeakNode>,
}

/// A parsed, immutable classifier cascade.
///
/// Nothing inside a `Cascade` is mutated after construction, so one instance
/// can be shared (e.g. behind an `Arc`) by any number of concurrent scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cascade {
    min_width: f64,
    min_height: f64,
    stages: Vec<Stage>,
}

impl Cascade {
    /// Create a cascade from already-typed parts, applying the same checks
    /// as [`Cascade::from_flat`].
    pub fn new(min_width: f64, min_height: f64, stages: Vec<Stage>) -> Result<Self> {
        let cascade = Self {
            min_width,
            min_height,
            stages,
        };
        cascade.validate()?;
        Ok(cascade)
    }

    /// Parse the flat wire format.
    pub fn from_flat(blob: &[f64]) -> Result<Self> {
        let mut r = BlobReader::new(blob);

        if blob.len() < 2 {
            return Err(Error::InvalidClassifier(format!(
                "blob has {} values, need at least the 2-value window header",
                blob.len()
            )));
        }
        let min_width = r.read_float()?;
        let min_height = r.read_float()?;

        let mut stages = Vec::new();
        while !r.is_at_end() {
            stages.push(parse_stage(&mut r)?);
        }

        Self::new(min_width, min_height, stages)
    }

    /// Parse a JSON array of numbers in the flat wire format.
    pub fn from_json(json: &str) -> Result<Self> {
        let blob: Vec<f64> = serde_json::from_str(json)?;
        Self::from_flat(&blob)
    }

    /// Re-emit the flat wire format.
    pub fn to_flat(&self) -> Vec<f64> {
        let mut out = vec![self.min_width, self.min_height];
        for stage in &self.stages {
            out.push(stage.threshold);
            out.push(stage.nodes.len() as f64);
            for node in &stage.nodes {
                out.push(if node.tilted { 1.0 } else { 0.0 });
                out.push(node.rects.len() as f64);
                for rect in &node.rects {
                    out.extend_from_slice(&[rect.x, rect.y, rect.width, rect.height, rect.weight]);
                }
                out.push(node.threshold);
                out.push(node.left);
                out.push(node.right);
            }
        }
        out
    }

    /// Load a classifier file.
    ///
    /// `.json` files hold the flat array; anything else is the bincode
    /// encoding written by [`Cascade::save`]. A trailing `.bz2` is
    /// decompressed first, so `face.json.bz2` works too.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let is_bz2 = path.extension().is_some_and(|ext| ext == "bz2");
        let inner = if is_bz2 {
            path.file_stem().map(Path::new)
        } else {
            Some(path)
        };
        let is_json = inner
            .and_then(|p| p.extension())
            .is_some_and(|ext| ext == "json");

        let mut bytes = Vec::new();
        if is_bz2 {
            BzDecoder::new(reader).read_to_end(&mut bytes)?;
        } else {
            reader.read_to_end(&mut bytes)?;
        }

        if is_json {
            let blob: Vec<f64> = serde_json::from_slice(&bytes)?;
            Self::from_flat(&blob)
        } else {
            let cascade: Self = bincode::deserialize(&bytes)?;
            cascade.validate()?;
            Ok(cascade)
        }
    }

    /// Save the parsed cascade as bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let bytes = bincode::serialize(self)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    pub fn min_width(&self) -> f64 {
        self.min_width
    }

    pub fn min_height(&self) -> f64 {
        self.min_height
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.stages.iter().map(|s| s.nodes.len()).sum()
    }

    pub fn num_tilted_nodes(&self) -> usize {
        self.stages
            .iter()
            .flat_map(|s| s.nodes.iter())
            .filter(|n| n.tilted)
            .count()
    }

    pub fn num_rects(&self) -> usize {
        self.stages
            .iter()
            .flat_map(|s| s.nodes.iter())
            .map(|n| n.rects.len())
            .sum()
    }

    fn validate(&self) -> Result<()> {
        for (name, v) in [("width", self.min_width), ("height", self.min_height)] {
            if !v.is_finite() || v < 1.0 {
                return Err(Error::InvalidClassifier(format!(
                    "window {} must be a finite value >= 1, got {}",
                    name, v
                )));
            }
        }
        if self.stages.is_empty() {
            return Err(Error::InvalidClassifier("cascade has no stages".into()));
        }
        for (stage_idx, stage) in self.stages.iter().enumerate() {
            if !stage.threshold.is_finite() {
                return Err(Error::InvalidClassifier(format!(
                    "stage {} threshold is not finite",
                    stage_idx
                )));
            }
            for (node_idx, node) in stage.nodes.iter().enumerate() {
                if node.rects.is_empty() {
                    return Err(Error::InvalidClassifier(format!(
                        "stage {} node {} has no rectangles",
                        stage_idx, node_idx
                    )));
                }
                let finite = [node.threshold, node.left, node.right]
                    .into_iter()
                    .chain(
                        node.rects
                            .iter()
                            .flat_map(|r| [r.x, r.y, r.width, r.height, r.weight]),
                    )
                    .all(f64::is_finite);
                if !finite {
                    return Err(Error::InvalidClassifier(format!(
                        "stage {} node {} has a non-finite value",
                        stage_idx, node_idx
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Positional reader over a flat blob. Errors name the offset they hit.
struct BlobReader<'a> {
    blob: &'a [f64],
    pos: usize,
}

impl<'a> BlobReader<'a> {
    fn new(blob: &'a [f64]) -> Self {
        Self { blob, pos: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.blob.len()
    }

    fn read_float(&mut self) -> Result<f64> {
        let v = *self.blob.get(self.pos).ok_or_else(|| {
            Error::InvalidClassifier(format!("blob truncated at offset {}", self.pos))
        })?;
        if !v.is_finite() {
            return Err(Error::InvalidClassifier(format!(
                "non-finite value at offset {}",
                self.pos
            )));
        }
        self.pos += 1;
        Ok(v)
    }

    /// Read a non-negative integral count.
    fn read_count(&mut self) -> Result<usize> {
        let offset = self.pos;
        let v = self.read_float()?;
        if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
            return Err(Error::InvalidClassifier(format!(
                "expected a count at offset {}, got {}",
                offset, v
            )));
        }
        Ok(v as usize)
    }

    fn read_flag(&mut self) -> Result<bool> {
        let offset = self.pos;
        let v = self.read_float()?;
        if v == 0.0 {
            Ok(false)
        } else if v == 1.0 {
            Ok(true)
        } else {
            Err(Error::InvalidClassifier(format!(
                "tilted flag at offset {} must be 0 or 1, got {}",
                offset, v
            )))
        }
    }

    fn remaining(&self) -> usize {
        self.blob.len().saturating_sub(self.pos)
    }
}

fn parse_stage(r: &mut BlobReader<'_>) -> Result<Stage> {
    let threshold = r.read_float()?;
    let node_count = r.read_count()?;

    // Each node takes at least 2 + 5 + 3 values.
    if node_count.saturating_mul(10) > r.remaining() {
        return Err(Error::InvalidClassifier(format!(
            "stage declares {} nodes but only {} values remain",
            node_count,
            r.remaining()
        )));
    }

    let mut nodes = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        nodes.push(parse_node(r)?);
    }

    Ok(Stage { threshold, nodes })
}

fn parse_node(r: &mut BlobReader<'_>) -> Result<WeakNode> {
    let tilted = r.read_flag()?;
    let offset = r.pos;
    let rect_count = r.read_count()?;
    if rect_count == 0 {
        return Err(Error::InvalidClassifier(format!(
            "node at offset {} has no rectangles",
            offset
        )));
    }
    if rect_count > r.remaining() / 5 {
        return Err(Error::InvalidClassifier(format!(
            "node at offset {} declares {} rectangles but only {} values remain",
            offset,
            rect_count,
            r.remaining()
        )));
    }

    let mut rects = Vec::with_capacity(rect_count);
    for _ in 0..rect_count {
        rects.push(FeatureRect {
            x: r.read_float()?,
            y: r.read_float()?,
            width: r.read_float()?,
            height: r.read_float()?,
            weight: r.read_float()?,
        });
    }

    Ok(WeakNode {
        tilted,
        rects,
        threshold: r.read_float()?,
        left: r.read_float()?,
        right: r.read_float()?,
    })
}
