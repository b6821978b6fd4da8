//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use cascade_detect::{gray_rgba_from_fn, Cascade};

pub const SQUARE_X: u32 = 40;
pub const SQUARE_Y: u32 = 30;
pub const SQUARE_SIZE: u32 = 16;

/// Flat classifier with one stage and one full-window node.
pub fn single_node_blob(size: f64, stage_threshold: f64) -> Vec<f64> {
    vec![
        size,
        size,
        stage_threshold,
        1.0,
        0.0,
        1.0,
        0.0,
        0.0,
        size,
        size,
        1.0,
        0.0,
        1.0,
        1.0,
    ]
}

/// A stage that every window passes.
pub fn always_pass(size: f64) -> Cascade {
    Cascade::from_flat(&single_node_blob(size, -1.0e9)).unwrap()
}

/// A first stage that no window passes.
pub fn never_pass(size: f64) -> Cascade {
    Cascade::from_flat(&single_node_blob(size, 1.0e9)).unwrap()
}

/// Fires when the middle of a 20x20 window is brighter than the window mean.
pub fn bright_center_blob() -> Vec<f64> {
    vec![
        20.0, 20.0, // window
        0.5, 1.0, // stage threshold, node count
        0.0, 2.0, // not tilted, two rects
        5.0, 5.0, 10.0, 10.0, 1.0, // center
        0.0, 0.0, 20.0, 20.0, -0.25, // whole window
        0.3, 0.0, 1.0, // threshold, left, right
    ]
}

/// Black 96x80 frame with one white square.
pub fn bright_square_frame() -> (Vec<u8>, u32, u32) {
    let (width, height) = (96, 80);
    let pixels = gray_rgba_from_fn(width, height, |x, y| {
        let inside = (SQUARE_X..SQUARE_X + SQUARE_SIZE).contains(&x)
            && (SQUARE_Y..SQUARE_Y + SQUARE_SIZE).contains(&y);
        if inside {
            255
        } else {
            0
        }
    });
    (pixels, width, height)
}

/// Diagonal stripes with plenty of edges everywhere.
pub fn textured_frame(width: u32, height: u32) -> Vec<u8> {
    gray_rgba_from_fn(width, height, |x, y| if ((x + y) / 3) % 2 == 0 { 30 } else { 220 })
}

/// A fresh scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "cascade-detect-{}-{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
