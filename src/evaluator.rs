//! Evaluation of one cascade at one window position and scale.
//!
//! A window is normalized by its own mean and standard deviation, then run
//! through the stages in order. Each stage sums the votes of its weak nodes;
//! the first stage whose sum falls below its threshold rejects the window.
//! A window that passes every stage is accepted.

use crate::classifier::{Cascade, FeatureRect, WeakNode};
use crate::error::{Error, Result};
use crate::integral::{IntegralTables, Table};
use crate::types::Rect;

/// A window position and size at a given scale.
///
/// `x` is the column and `y` the row of the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub scale: f64,
}

impl Window {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }
}

/// Mean and spread of the luma values under a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub variance: f64,
    /// `sqrt(variance)`, or 1 when the variance is not positive.
    pub std_dev: f64,
}

/// How the stage machine ended for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// Stage `stage` summed below its threshold.
    Rejected { stage: usize },
    /// Skipped by the edge-density reject before any stage ran.
    EdgeRejected,
}

/// Full record of one evaluation, including every stage sum computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub verdict: Verdict,
    pub stage_sums: Vec<f64>,
}

/// Round-half-up: `floor(v + 0.5)`.
///
/// Shipped cascades are tuned against exactly this rule.
#[inline]
pub fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// Evaluates one cascade against one set of integral tables.
pub struct CascadeEvaluator<'a> {
    cascade: &'a Cascade,
    sum: &'a Table,
    square: &'a Table,
    tilted: Option<&'a Table>,
    sobel: Option<&'a Table>,
    edges_density: f64,
}

impl<'a> CascadeEvaluator<'a> {
    /// Bind a cascade to the tables of one image.
    ///
    /// The plain and squared tables are always required, the tilted table
    /// only if the cascade has tilted nodes, and the Sobel table only when
    /// `edges_density > 0`.
    pub fn new(tables: &'a IntegralTables, cascade: &'a Cascade, edges_density: f64) -> Result<Self> {
        if !edges_density.is_finite() || edges_density < 0.0 {
            return Err(Error::InvalidParameter {
                name: "edges_density",
                value: edges_density,
            });
        }

        let sum = tables.sum().ok_or(Error::MissingTable("sum"))?;
        let square = tables.square().ok_or(Error::MissingTable("square"))?;
        let tilted = tables.tilted();
        if tilted.is_none() && cascade.num_tilted_nodes() > 0 {
            return Err(Error::MissingTable("tilted"));
        }
        let sobel = tables.sobel();
        if sobel.is_none() && edges_density > 0.0 {
            return Err(Error::MissingTable("sobel"));
        }

        Ok(Self {
            cascade,
            sum,
            square,
            tilted,
            sobel,
            edges_density,
        })
    }

    pub fn cascade(&self) -> &Cascade {
        self.cascade
    }

    /// Evaluate a window, returning its rectangle if every stage passes.
    #[inline]
    pub fn evaluate(&self, window: &Window) -> Option<Rect> {
        if self.is_trivially_excluded(window) {
            return None;
        }
        match self.run_stages(window, |_, _| {}) {
            Verdict::Accepted => Some(window.rect()),
            _ => None,
        }
    }

    /// Like [`CascadeEvaluator::evaluate`], but records every stage sum.
    pub fn evaluate_traced(&self, window: &Window) -> Trace {
        if self.is_trivially_excluded(window) {
            return Trace {
                verdict: Verdict::EdgeRejected,
                stage_sums: Vec::new(),
            };
        }
        let mut stage_sums = Vec::with_capacity(self.cascade.num_stages());
        let verdict = self.run_stages(window, |_, sum| stage_sums.push(sum));
        Trace {
            verdict,
            stage_sums,
        }
    }

    /// Edge-density reject: `sobelSum / (area * 255) < edges_density`.
    ///
    /// Always false when the threshold is 0.
    pub fn is_trivially_excluded(&self, window: &Window) -> bool {
        if self.edges_density <= 0.0 {
            return false;
        }
        let Some(sobel) = self.sobel else {
            return false;
        };
        let edges = sobel.rect_sum(
            window.x as i64,
            window.y as i64,
            window.width as i64,
            window.height as i64,
        ) as f64;
        edges / (window.area() * 255.0) < self.edges_density
    }

    pub fn window_stats(&self, window: &Window) -> WindowStats {
        let inverse_area = 1.0 / window.area();
        let (x, y) = (window.x as i64, window.y as i64);
        let (w, h) = (window.width as i64, window.height as i64);

        let mean = self.sum.rect_sum(x, y, w, h) as f64 * inverse_area;
        let variance = self.square.rect_sum(x, y, w, h) as f64 * inverse_area - mean * mean;
        let std_dev = if variance > 0.0 { variance.sqrt() } else { 1.0 };

        WindowStats {
            mean,
            variance,
            std_dev,
        }
    }

    fn run_stages<F>(&self, window: &Window, mut on_stage: F) -> Verdict
    where
        F: FnMut(usize, f64),
    {
        let inverse_area = 1.0 / window.area();
        let std_dev = self.window_stats(window).std_dev;

        for (stage_idx, stage) in self.cascade.stages().iter().enumerate() {
            let mut stage_sum = 0.0;
            for node in &stage.nodes {
                let rects_sum = self.node_response(node, window);
                stage_sum += if rects_sum * inverse_area < node.threshold * std_dev {
                    node.left
                } else {
                    node.right
                };
            }
            on_stage(stage_idx, stage_sum);
            if stage_sum < stage.threshold {
                return Verdict::Rejected { stage: stage_idx };
            }
        }
        Verdict::Accepted
    }

    /// Signed, weighted sum of a node's rectangle sums at this window.
    #[inline]
    fn node_response(&self, node: &WeakNode, window: &Window) -> f64 {
        let mut rects_sum = 0.0;
        for rect in &node.rects {
            let (left, top, width, height) = scale_rect(rect, window);
            let sum = match (node.tilted, self.tilted) {
                (true, Some(tilted)) => tilted_rect_sum(tilted, left, top, width, height),
                _ => self.sum.rect_sum(left, top, width, height),
            };
            rects_sum += sum as f64 * rect.weight;
        }
        rects_sum
    }
}

/// Scale a window-normalized rectangle to image pixels, rounding each
/// coordinate half-up.
#[inline]
fn scale_rect(rect: &FeatureRect, window: &Window) -> (i64, i64, i64, i64) {
    let s = window.scale;
    (
        round_half_up(window.x as f64 + rect.x * s),
        round_half_up(window.y as f64 + rect.y * s),
        round_half_up(rect.width * s),
        round_half_up(rect.height * s),
    )
}

/// Sum over a 45° rotated rectangle:
/// `R(x-h+w, y+w+h-1) + R(x, y-1) - R(x-h, y+h-1) - R(x+w, y+w-1)`.
#[inline]
pub fn tilted_rect_sum(table: &Table, x: i64, y: i64, w: i64, h: i64) -> i64 {
    table.at(x - h + w, y + w + h - 1) + table.at(x, y - 1)
        - table.at(x - h, y + h - 1)
        - table.at(x + w, y + w - 1)
}
