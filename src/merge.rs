//! Clustering of overlapping raw windows into final detections.
//!
//! Two windows join the same cluster when they intersect and both
//!
//! ```text
//! overlap / (area_i * (area_i / area_j))
//! overlap / (area_j * (area_i / area_j))
//! ```
//!
//! reach the overlap threshold. This is not intersection-over-union; the
//! default threshold of 0.5 is calibrated against this exact formula.
//! Clusters are built with a [`DisjointSet`] and reported as the rounded
//! mean of their members.

use std::collections::HashMap;

use crate::disjoint_set::DisjointSet;
use crate::types::{Detection, Rect};

pub const DEFAULT_OVERLAP: f64 = 0.5;

#[derive(Debug, Default, Clone, Copy)]
struct ClusterAccumulator {
    count: usize,
    x: u64,
    y: u64,
    width: u64,
    height: u64,
}

impl ClusterAccumulator {
    fn add(&mut self, rect: &Rect) {
        self.count += 1;
        self.x += rect.x as u64;
        self.y += rect.y as u64;
        self.width += rect.width as u64;
        self.height += rect.height as u64;
    }

    fn mean(sum: u64, count: usize) -> u32 {
        (sum as f64 / count as f64 + 0.5).floor() as u32
    }

    fn finish(&self) -> Detection {
        Detection {
            x: Self::mean(self.x, self.count),
            y: Self::mean(self.y, self.count),
            width: Self::mean(self.width, self.count),
            height: Self::mean(self.height, self.count),
            total: self.count,
        }
    }
}

/// Whether `a` and `b` are close enough to merge under `overlap`.
pub fn should_merge(a: &Rect, b: &Rect, overlap: f64) -> bool {
    if !a.intersects(b) {
        return false;
    }
    let area_a = a.area() as f64;
    let area_b = b.area() as f64;
    if area_a == 0.0 || area_b == 0.0 {
        return false;
    }
    let inter = a.overlap_area(b) as f64;
    let ratio = area_a / area_b;
    inter / (area_a * ratio) >= overlap && inter / (area_b * ratio) >= overlap
}

/// Cluster `rects` and average each cluster into one [`Detection`].
///
/// Detections are returned in order of each cluster's first member.
pub fn merge_rectangles(rects: &[Rect], overlap: f64) -> Vec<Detection> {
    let mut set = DisjointSet::new(rects.len());

    for (i, a) in rects.iter().enumerate() {
        for (j, b) in rects.iter().enumerate() {
            if should_merge(a, b, overlap) {
                set.union(i, j);
            }
        }
    }

    let mut order: Vec<usize> = Vec::new();
    let mut clusters: HashMap<usize, ClusterAccumulator> = HashMap::new();
    for (k, rect) in rects.iter().enumerate() {
        let root = set.find(k);
        clusters
            .entry(root)
            .or_insert_with(|| {
                order.push(root);
                ClusterAccumulator::default()
            })
            .add(rect);
    }

    order
        .iter()
        .filter_map(|root| clusters.get(root))
        .map(ClusterAccumulator::finish)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_rect_is_its_own_cluster() {
        let merged = merge_rectangles(&[Rect::new(0, 0, 20, 20)], DEFAULT_OVERLAP);
        assert_eq!(
            merged,
            vec![Detection {
                x: 0,
                y: 0,
                width: 20,
                height: 20,
                total: 1
            }]
        );
    }

    #[test]
    fn overlapping_pair_collapses_to_rounded_mean() {
        // Same size, shifted by 3 px: overlap 17*20 = 340 of 400, ratio 0.85.
        let rects = [Rect::new(10, 10, 20, 20), Rect::new(13, 10, 20, 20)];
        let merged = merge_rectangles(&rects, DEFAULT_OVERLAP);
        assert_eq!(merged.len(), 1);
        let d = merged[0];
        assert_eq!(d.total, 2);
        // (10 + 13) / 2 = 11.5 -> 12
        assert_eq!(d.x, 12);
        assert_eq!(d.y, 10);
        assert_eq!(d.width, 20);
        assert_eq!(d.height, 20);
    }

    #[test]
    fn distant_rects_stay_apart() {
        let rects = [Rect::new(0, 0, 10, 10), Rect::new(50, 50, 10, 10)];
        let merged = merge_rectangles(&rects, DEFAULT_OVERLAP);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|d| d.total == 1));
        assert_eq!(merged[0].rect(), rects[0]);
        assert_eq!(merged[1].rect(), rects[1]);
    }

    #[test]
    fn low_overlap_does_not_merge() {
        // Overlap 5*20 = 100 of 400: ratio 0.25.
        let rects = [Rect::new(0, 0, 20, 20), Rect::new(15, 0, 20, 20)];
        assert_eq!(merge_rectangles(&rects, DEFAULT_OVERLAP).len(), 2);
    }

    #[test]
    fn ratio_formula_is_asymmetric_in_size() {
        // A 10x10 box fully inside a 20x20 box: overlap 100.
        // area ratio 100 / 400 = 0.25
        // 100 / (100 * 0.25) = 4.0, 100 / (400 * 0.25) = 1.0 -> both >= 0.5.
        let small = Rect::new(5, 5, 10, 10);
        let big = Rect::new(0, 0, 20, 20);
        assert!(should_merge(&small, &big, DEFAULT_OVERLAP));
        // Reversed, ratio = 4: 100 / (400 * 4) and 100 / (100 * 4) both < 0.5.
        assert!(!should_merge(&big, &small, DEFAULT_OVERLAP));

        // The pairwise pass visits both orders, so they still cluster.
        let merged = merge_rectangles(&[big, small], DEFAULT_OVERLAP);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].total, 2);
    }

    #[test]
    fn merging_is_transitive() {
        let rects = [
            Rect::new(0, 0, 20, 20),
            Rect::new(4, 0, 20, 20),
            Rect::new(8, 0, 20, 20),
            Rect::new(100, 100, 20, 20),
        ];
        let merged = merge_rectangles(&rects, DEFAULT_OVERLAP);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].total, 3);
        assert_eq!(merged[0].x, 4);
        assert_eq!(merged[1].total, 1);
    }

    #[test]
    fn remerging_with_full_overlap_is_a_no_op() {
        let rects = [
            Rect::new(10, 10, 20, 20),
            Rect::new(12, 11, 20, 20),
            Rect::new(60, 60, 30, 30),
            Rect::new(62, 61, 30, 30),
            Rect::new(150, 10, 25, 25),
        ];
        let merged = merge_rectangles(&rects, DEFAULT_OVERLAP);
        let as_rects: Vec<Rect> = merged.iter().map(Detection::rect).collect();
        let again = merge_rectangles(&as_rects, 1.0);

        assert_eq!(again.len(), merged.len());
        for (a, b) in again.iter().zip(merged.iter()) {
            assert_eq!(a.rect(), b.rect());
            assert_eq!(a.total, 1);
        }
    }

    #[test]
    fn empty_input() {
        assert!(merge_rectangles(&[], DEFAULT_OVERLAP).is_empty());
    }
}
