use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::classifier::Cascade;
use crate::error::{Error, Result};
use crate::evaluator::{CascadeEvaluator, Window};
use crate::integral::IntegralTables;
use crate::types::Rect;

/// Sliding-window scan settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    /// Starting scale; the first window evaluated is `initial_scale * scale_factor`.
    pub initial_scale: f64,
    /// Growth per scale iteration (> 1).
    pub scale_factor: f64,
    /// Pixel step multiplier; the step at scale `s` is `floor(s * step_size + 0.5)`.
    pub step_size: f64,
    /// Edge-density reject threshold. 0 disables it.
    pub edges_density: f64,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            initial_scale: 1.0,
            scale_factor: 1.25,
            step_size: 1.5,
            edges_density: 0.2,
        }
    }
}

impl ScanParams {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("initial_scale", self.initial_scale, self.initial_scale > 0.0),
            ("scale_factor", self.scale_factor, self.scale_factor > 1.0),
            ("step_size", self.step_size, self.step_size > 0.0),
            ("edges_density", self.edges_density, self.edges_density >= 0.0),
        ];
        for (name, value, ok) in checks {
            if !value.is_finite() || !ok {
                return Err(Error::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// One scale iteration of a scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub scale: f64,
    pub width: u32,
    pub height: u32,
    pub step: u32,
}

/// The sequence of window sizes a scan visits, smallest first.
///
/// Ends as soon as the window is no narrower or no shorter than the image.
#[derive(Debug, Clone)]
pub struct ScaleSchedule {
    scale: f64,
    scale_factor: f64,
    step_size: f64,
    min_width: f64,
    min_height: f64,
    image_width: u32,
    image_height: u32,
    done: bool,
}

impl ScaleSchedule {
    pub fn new(params: &ScanParams, cascade: &Cascade, image_width: u32, image_height: u32) -> Self {
        Self {
            scale: params.initial_scale * params.scale_factor,
            scale_factor: params.scale_factor,
            step_size: params.step_size,
            min_width: cascade.min_width(),
            min_height: cascade.min_height(),
            image_width,
            image_height,
            done: false,
        }
    }
}

impl Iterator for ScaleSchedule {
    type Item = ScaleLevel;

    fn next(&mut self) -> Option<ScaleLevel> {
        while !self.done {
            let scale = self.scale;
            let width = (scale * self.min_width).floor();
            let height = (scale * self.min_height).floor();

            if width >= self.image_width as f64 || height >= self.image_height as f64 {
                self.done = true;
                break;
            }
            self.scale *= self.scale_factor;

            // Very small initial scales can round a window down to nothing.
            if width < 1.0 || height < 1.0 {
                continue;
            }

            let step = ((scale * self.step_size + 0.5).floor() as u32).max(1);
            return Some(ScaleLevel {
                scale,
                width: width as u32,
                height: height as u32,
                step,
            });
        }
        None
    }
}

/// Drives a [`CascadeEvaluator`] over every scale and position of an image.
///
/// Candidates come out in a fixed order: ascending scale, then row-major.
pub struct MultiScaleScanner<'a> {
    evaluator: CascadeEvaluator<'a>,
    params: ScanParams,
    width: u32,
    height: u32,
}

impl<'a> MultiScaleScanner<'a> {
    pub fn new(tables: &'a IntegralTables, cascade: &'a Cascade, params: ScanParams) -> Result<Self> {
        params.validate()?;
        let evaluator = CascadeEvaluator::new(tables, cascade, params.edges_density)?;
        Ok(Self {
            evaluator,
            params,
            width: tables.width(),
            height: tables.height(),
        })
    }

    pub fn schedule(&self) -> ScaleSchedule {
        ScaleSchedule::new(
            &self.params,
            self.evaluator.cascade(),
            self.width,
            self.height,
        )
    }

    /// Scan every scale and return the accepted windows.
    pub fn scan(&self) -> Vec<Rect> {
        let mut candidates = Vec::new();
        for level in self.schedule() {
            self.scan_level(&level, &mut candidates);
        }
        candidates
    }

    /// Like [`MultiScaleScanner::scan`], but checks `cancel` before each
    /// scale iteration and returns [`Error::Cancelled`] once it is set.
    pub fn scan_with_cancel(&self, cancel: &AtomicBool) -> Result<Vec<Rect>> {
        let mut candidates = Vec::new();
        for level in self.schedule() {
            if cancel.load(Ordering::Relaxed) {
                warn!(
                    "scan cancelled before scale {:.3} with {} candidates",
                    level.scale,
                    candidates.len()
                );
                return Err(Error::Cancelled);
            }
            self.scan_level(&level, &mut candidates);
        }
        Ok(candidates)
    }

    /// Evaluate every position of one scale level, appending accepted windows.
    pub fn scan_level(&self, level: &ScaleLevel, out: &mut Vec<Rect>) {
        let before = out.len();
        let step = level.step as usize;

        for y in (0..self.height - level.height).step_by(step) {
            for x in (0..self.width - level.width).step_by(step) {
                let window = Window {
                    x,
                    y,
                    width: level.width,
                    height: level.height,
                    scale: level.scale,
                };
                if let Some(rect) = self.evaluator.evaluate(&window) {
                    out.push(rect);
                }
            }
        }

        debug!(
            "scale {:.3}: window {}x{}, step {}, {} accepted",
            level.scale,
            level.width,
            level.height,
            level.step,
            out.len() - before
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{FeatureRect, Stage, WeakNode};
    use crate::integral::TableSet;
    use crate::pixels::{gray_rgba_from_fn, PixelBuffer};

    fn constant_cascade(size: f64, stage_threshold: f64) -> Cascade {
        Cascade::new(
            size,
            size,
            vec![Stage {
                threshold: stage_threshold,
                nodes: vec![WeakNode {
                    tilted: false,
                    rects: vec![FeatureRect {
                        x: 0.0,
                        y: 0.0,
                        width: size,
                        height: size,
                        weight: 1.0,
                    }],
                    threshold: 0.0,
                    left: 1.0,
                    right: 1.0,
                }],
            }],
        )
        .unwrap()
    }

    fn no_edges() -> ScanParams {
        ScanParams {
            edges_density: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn default_params() {
        let p = ScanParams::default();
        assert_eq!(p.initial_scale, 1.0);
        assert_eq!(p.scale_factor, 1.25);
        assert_eq!(p.step_size, 1.5);
        assert_eq!(p.edges_density, 0.2);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn rejects_bad_params() {
        let bad = [
            ScanParams {
                scale_factor: 1.0,
                ..Default::default()
            },
            ScanParams {
                initial_scale: 0.0,
                ..Default::default()
            },
            ScanParams {
                step_size: -1.5,
                ..Default::default()
            },
            ScanParams {
                edges_density: f64::NAN,
                ..Default::default()
            },
        ];
        for params in bad {
            assert!(matches!(
                params.validate(),
                Err(Error::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn window_sizes_grow_until_image_is_covered() {
        let cascade = constant_cascade(20.0, 0.0);
        let schedule = ScaleSchedule::new(&ScanParams::default(), &cascade, 100, 100);
        let sizes: Vec<u32> = schedule.map(|l| l.width).collect();
        assert_eq!(sizes, vec![25, 31, 39, 48, 61, 76, 95]);
    }

    #[test]
    fn schedule_stops_on_the_shorter_side() {
        let cascade = constant_cascade(20.0, 0.0);
        let schedule = ScaleSchedule::new(&ScanParams::default(), &cascade, 200, 40);
        let sizes: Vec<u32> = schedule.map(|l| l.height).collect();
        assert_eq!(sizes, vec![25, 31, 39]);
    }

    #[test]
    fn step_tracks_scale() {
        let cascade = constant_cascade(20.0, 0.0);
        let levels: Vec<ScaleLevel> =
            ScaleSchedule::new(&ScanParams::default(), &cascade, 100, 100).collect();
        // floor(1.25 * 1.5 + 0.5) = 2, floor(1.5625 * 1.5 + 0.5) = 2
        assert_eq!(levels[0].step, 2);
        assert_eq!(levels[1].step, 2);
        for level in &levels {
            let expected = (level.scale * 1.5 + 0.5).floor() as u32;
            assert_eq!(level.step, expected);
        }
    }

    #[test]
    fn tiny_initial_scale_skips_empty_windows() {
        let cascade = constant_cascade(20.0, 0.0);
        let params = ScanParams {
            initial_scale: 0.01,
            ..Default::default()
        };
        for level in ScaleSchedule::new(&params, &cascade, 100, 100) {
            assert!(level.width >= 1 && level.height >= 1);
        }
    }

    #[test]
    fn accepts_every_position_with_passing_cascade() {
        let data = gray_rgba_from_fn(100, 100, |x, y| ((x + y) % 256) as u8);
        let image = PixelBuffer::new(&data, 100, 100).unwrap();
        let tables = IntegralTables::compute(&image, TableSet::for_cascade(false)).unwrap();
        let cascade = constant_cascade(20.0, -1.0e9);
        let scanner = MultiScaleScanner::new(&tables, &cascade, no_edges()).unwrap();

        let candidates = scanner.scan();
        let expected: usize = scanner
            .schedule()
            .map(|l| {
                let step = l.step;
                let cols = (100 - l.width).div_ceil(step) as usize;
                let rows = (100 - l.height).div_ceil(step) as usize;
                cols * rows
            })
            .sum();
        assert_eq!(candidates.len(), expected);
        assert_eq!(candidates[0], Rect::new(0, 0, 25, 25));
        assert_eq!(candidates[1], Rect::new(2, 0, 25, 25));
    }

    #[test]
    fn candidate_order_is_scale_then_row_major() {
        let data = gray_rgba_from_fn(60, 50, |x, y| ((x * 3 + y * 5) % 256) as u8);
        let image = PixelBuffer::new(&data, 60, 50).unwrap();
        let tables = IntegralTables::compute(&image, TableSet::for_cascade(false)).unwrap();
        let cascade = constant_cascade(20.0, -1.0e9);
        let scanner = MultiScaleScanner::new(&tables, &cascade, no_edges()).unwrap();

        let first = scanner.scan();
        let second = scanner.scan();
        assert_eq!(first, second);

        let keys: Vec<(u32, u32, u32)> = first.iter().map(|r| (r.width, r.y, r.x)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn failing_cascade_yields_nothing() {
        let data = gray_rgba_from_fn(80, 80, |x, y| ((x * y) % 256) as u8);
        let image = PixelBuffer::new(&data, 80, 80).unwrap();
        let tables = IntegralTables::compute(&image, TableSet::for_cascade(true)).unwrap();
        let cascade = constant_cascade(20.0, 1.0e9);
        let scanner = MultiScaleScanner::new(&tables, &cascade, ScanParams::default()).unwrap();
        assert!(scanner.scan().is_empty());
    }

    #[test]
    fn cancel_flag_stops_scan() {
        let data = gray_rgba_from_fn(64, 64, |_, _| 10);
        let image = PixelBuffer::new(&data, 64, 64).unwrap();
        let tables = IntegralTables::compute(&image, TableSet::for_cascade(false)).unwrap();
        let cascade = constant_cascade(20.0, -1.0e9);
        let scanner = MultiScaleScanner::new(&tables, &cascade, no_edges()).unwrap();

        let cancel = AtomicBool::new(true);
        assert!(matches!(
            scanner.scan_with_cancel(&cancel),
            Err(Error::Cancelled)
        ));

        let cancel = AtomicBool::new(false);
        assert_eq!(scanner.scan_with_cancel(&cancel).unwrap(), scanner.scan());
    }
}
