use crate::error::{Error, Result};

/// A borrowed RGBA pixel buffer: `width * height * 4` bytes, row-major,
/// channels interleaved as R, G, B, A.
///
/// The buffer is only read for the duration of a detection call; nothing in
/// the crate keeps a reference to it afterwards.
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> PixelBuffer<'a> {
    /// Wrap a caller-owned RGBA buffer, validating its dimensions and length.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(Error::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(Error::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &'a [u8] {
        self.data
    }

    /// The four channels of the pixel at (x, y). Coordinates must be in range.
    #[inline]
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    /// Integer luma `0.299R + 0.587G + 0.114B`, truncated toward zero.
    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> u32 {
        let [r, g, b, _] = self.rgba(x, y);
        luma(r, g, b)
    }

    /// Single-channel grayscale copy, rounded to the nearest level and
    /// clamped to `0..=255`. This is the input to the Sobel pass.
    pub fn grayscale(&self) -> Vec<u8> {
        self.data
            .chunks_exact(4)
            .map(|px| {
                let v = px[0] as f64 * 0.299 + px[1] as f64 * 0.587 + px[2] as f64 * 0.114;
                v.round().clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}

#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u32 {
    (r as f64 * 0.299 + g as f64 * 0.587 + b as f64 * 0.114) as u32
}

/// Build an owned RGBA buffer by evaluating `f` at every pixel.
pub fn rgba_from_fn<F>(width: u32, height: u32, f: F) -> Vec<u8>
where
    F: Fn(u32, u32) -> [u8; 4],
{
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&f(x, y));
        }
    }
    data
}

/// Build an owned gray RGBA buffer (R = G = B = value, opaque alpha).
pub fn gray_rgba_from_fn<F>(width: u32, height: u32, f: F) -> Vec<u8>
where
    F: Fn(u32, u32) -> u8,
{
    rgba_from_fn(width, height, |x, y| {
        let v = f(x, y);
        [v, v, v, 255]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_truncates() {
        assert_eq!(luma(0, 0, 0), 0);
        // 0.299 * 100 = 29.9
        assert_eq!(luma(100, 0, 0), 29);
        // 0.587 * 10 = 5.87
        assert_eq!(luma(0, 10, 0), 5);
    }

    #[test]
    fn rejects_length_mismatch() {
        let data = vec![0u8; 10];
        let err = PixelBuffer::new(&data, 2, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferLength {
                expected: 16,
                actual: 10
            }
        ));
    }

    #[test]
    fn rejects_zero_dimensions() {
        let data: Vec<u8> = Vec::new();
        assert!(matches!(
            PixelBuffer::new(&data, 0, 5),
            Err(Error::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn pixel_access_is_row_major() {
        let data = rgba_from_fn(3, 2, |x, y| [x as u8, y as u8, 0, 255]);
        let buf = PixelBuffer::new(&data, 3, 2).unwrap();
        assert_eq!(buf.rgba(2, 1), [2, 1, 0, 255]);
        assert_eq!(buf.rgba(0, 1), [0, 1, 0, 255]);
    }

    #[test]
    fn grayscale_rounds() {
        // 0.299 * 200 = 59.8 -> 60
        let data = vec![200, 0, 0, 255];
        let buf = PixelBuffer::new(&data, 1, 1).unwrap();
        assert_eq!(buf.grayscale(), vec![60]);
        assert_eq!(buf.luma(0, 0), 59);
    }
}
