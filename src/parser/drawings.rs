//! Vector drawing clustering.

use crate::model::{BBox, DrawingCluster};

/// Union-merge primitive boxes until no two clusters overlap, then keep
/// clusters of at least `min_area`.
///
/// Each pass is quadratic in the cluster count; pages carry few enough
/// primitives for this to stay cheap.
pub fn cluster_drawings(boxes: &[BBox], padding: f32, min_area: f32) -> Vec<DrawingCluster> {
    let mut clusters: Vec<(BBox, usize)> = boxes
        .iter()
        .filter(|b| b.width() > 0.0 && b.height() > 0.0)
        .map(|b| (*b, 1))
        .collect();

    let mut merged = true;
    while merged {
        merged = false;
        let mut i = 0;
        while i < clusters.len() {
            let mut j = i + 1;
            while j < clusters.len() {
                if clusters[i].0.overlaps(&clusters[j].0, padding) {
                    let (other, count) = clusters.remove(j);
                    clusters[i].0 = clusters[i].0.union(&other);
                    clusters[i].1 += count;
                    merged = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }

    let kept: Vec<DrawingCluster> = clusters
        .into_iter()
        .map(|(bbox, count)| DrawingCluster::new(bbox, count))
        .filter(|c| c.area >= min_area)
        .collect();
    log::debug!("Drawings: {} primitives, {} clusters kept", boxes.len(), kept.len());
    kept
}
