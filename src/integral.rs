//! Summed-area tables over the luma channel of an RGBA buffer.
//!
//! Four tables can be produced in a single pass:
//! - `sum`: plain summed-area table, `SAT(x,y) = SAT(x,y-1) + SAT(x-1,y) + I(x,y) - SAT(x-1,y-1)`
//! - `square`: the same recurrence over `I(x,y)^2`
//! - `tilted`: 45° rotated table, `RSAT(x,y) = RSAT(x-1,y-1) + RSAT(x+1,y-1) - RSAT(x,y-2) + I(x,y) + I(x,y-1)`
//! - `sobel`: plain recurrence over the Sobel edge magnitude
//!
//! Every lookup outside the grid reads as zero.

use crate::error::{Error, Result};
use crate::pixels::PixelBuffer;

/// Selects which tables [`IntegralTables::compute`] should build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableSet {
    pub sum: bool,
    pub square: bool,
    pub tilted: bool,
    pub sobel: bool,
}

impl TableSet {
    pub const ALL: TableSet = TableSet {
        sum: true,
        square: true,
        tilted: true,
        sobel: true,
    };

    /// The tables a cascade scan needs, with the Sobel table only when the
    /// edge-density reject is enabled.
    pub fn for_cascade(with_sobel: bool) -> Self {
        Self {
            sum: true,
            square: true,
            tilted: true,
            sobel: with_sobel,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.sum || self.square || self.tilted || self.sobel)
    }
}

/// A single `width x height` grid of running sums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    width: u32,
    height: u32,
    data: Vec<i64>,
}

impl Table {
    fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.data
    }

    /// Entry at (x, y), or 0 outside the grid.
    #[inline]
    pub fn at(&self, x: i64, y: i64) -> i64 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Four-corner difference `T(x,y) - T(x+w,y) - T(x,y+h) + T(x+w,y+h)`.
    ///
    /// The corners are inclusive table entries, so this is the sum over
    /// the block `(x, x+w] x (y, y+h]`.
    #[inline]
    pub fn rect_sum(&self, x: i64, y: i64, w: i64, h: i64) -> i64 {
        self.at(x, y) - self.at(x + w, y) - self.at(x, y + h) + self.at(x + w, y + h)
    }

    /// The bottom-right entry: the sum over the whole image.
    pub fn total(&self) -> i64 {
        self.data.last().copied().unwrap_or(0)
    }

    #[inline]
    fn sat_step(&mut self, x: usize, y: usize, value: i64) {
        let w = self.width as usize;
        let up = if y > 0 { self.data[(y - 1) * w + x] } else { 0 };
        let left = if x > 0 { self.data[y * w + x - 1] } else { 0 };
        let diag = if x > 0 && y > 0 {
            self.data[(y - 1) * w + x - 1]
        } else {
            0
        };
        self.data[y * w + x] = up + left + value - diag;
    }

    #[inline]
    fn rsat_step(&mut self, x: usize, y: usize, value: i64, above: i64) {
        let w = self.width as usize;
        let up_left = if x > 0 && y > 0 {
            self.data[(y - 1) * w + x - 1]
        } else {
            0
        };
        let up_right = if y > 0 && x + 1 < w {
            self.data[(y - 1) * w + x + 1]
        } else {
            0
        };
        let up_up = if y > 1 { self.data[(y - 2) * w + x] } else { 0 };
        self.data[y * w + x] = up_left + up_right - up_up + value + above;
    }
}

/// The integral tables for one detection call.
#[derive(Debug, Clone)]
pub struct IntegralTables {
    width: u32,
    height: u32,
    sum: Option<Table>,
    square: Option<Table>,
    tilted: Option<Table>,
    sobel: Option<Table>,
}

impl IntegralTables {
    /// Build the requested tables from `image`.
    ///
    /// Requesting no tables is a configuration error.
    pub fn compute(image: &PixelBuffer<'_>, tables: TableSet) -> Result<Self> {
        if tables.is_empty() {
            return Err(Error::NoTablesRequested);
        }

        let width = image.width();
        let height = image.height();
        let mut sum = tables.sum.then(|| Table::zeros(width, height));
        let mut square = tables.square.then(|| Table::zeros(width, height));
        let mut tilted = tables.tilted.then(|| Table::zeros(width, height));
        let mut sobel = tables.sobel.then(|| Table::zeros(width, height));

        let edges = tables
            .sobel
            .then(|| sobel_magnitude(&image.grayscale(), width as usize, height as usize));

        let w = width as usize;
        let mut prev_row = vec![0i64; w];
        let mut row = vec![0i64; w];

        for y in 0..height as usize {
            for x in 0..w {
                let pixel = image.luma(x as u32, y as u32) as i64;
                row[x] = pixel;

                if let Some(t) = sum.as_mut() {
                    t.sat_step(x, y, pixel);
                }
                if let Some(t) = square.as_mut() {
                    t.sat_step(x, y, pixel * pixel);
                }
                if let Some(t) = tilted.as_mut() {
                    t.rsat_step(x, y, pixel, prev_row[x]);
                }
                if let (Some(t), Some(e)) = (sobel.as_mut(), edges.as_ref()) {
                    t.sat_step(x, y, e[y * w + x] as i64);
                }
            }
            std::mem::swap(&mut prev_row, &mut row);
        }

        Ok(Self {
            width,
            height,
            sum,
            square,
            tilted,
            sobel,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sum(&self) -> Option<&Table> {
        self.sum.as_ref()
    }

    pub fn square(&self) -> Option<&Table> {
        self.square.as_ref()
    }

    pub fn tilted(&self) -> Option<&Table> {
        self.tilted.as_ref()
    }

    pub fn sobel(&self) -> Option<&Table> {
        self.sobel.as_ref()
    }
}

const SOBEL_SIGN: [f64; 3] = [-1.0, 0.0, 1.0];
const SOBEL_SCALE: [f64; 3] = [1.0, 2.0, 1.0];

/// Sobel edge magnitude `sqrt(h^2 + v^2)` of a single-channel image.
///
/// `h` is the vertical `[1,2,1]` pass followed by the horizontal `[-1,0,1]`
/// pass; `v` swaps the two kernels. Samples past the border are clamped to
/// the nearest edge pixel.
pub fn sobel_magnitude(gray: &[u8], width: usize, height: usize) -> Vec<f64> {
    let src: Vec<f64> = gray.iter().map(|&p| p as f64).collect();

    let h = horizontal_convolve(
        &vertical_convolve(&src, width, height, &SOBEL_SCALE),
        width,
        height,
        &SOBEL_SIGN,
    );
    let v = horizontal_convolve(
        &vertical_convolve(&src, width, height, &SOBEL_SIGN),
        width,
        height,
        &SOBEL_SCALE,
    );

    h.iter()
        .zip(v.iter())
        .map(|(h, v)| (h * h + v * v).sqrt())
        .collect()
}

fn horizontal_convolve(src: &[f64], width: usize, height: usize, kernel: &[f64; 3]) -> Vec<f64> {
    let mut out = vec![0.0; width * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - 1).clamp(0, width as isize - 1) as usize;
                acc += row[sx] * weight;
            }
            out[y * width + x] = acc;
        }
    }
    out
}

fn vertical_convolve(src: &[f64], width: usize, height: usize, kernel: &[f64; 3]) -> Vec<f64> {
    let mut out = vec![0.0; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - 1).clamp(0, height as isize - 1) as usize;
                acc += src[sy * width + x] * weight;
            }
            out[y * width + x] = acc;
        }
    }
    out
}
