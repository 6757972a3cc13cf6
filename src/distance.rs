//! Narrow phase: centroid distance for candidate pairs.

use crate::candidate_search::CandidatePair;
use crate::projection::planar_distance;
use geo::Centroid;
use geo_types::{Geometry, Point};

/// A candidate pair verified against the acceptance threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinedPair {
    pub a: usize,
    pub b: usize,
    pub distance_m: f64,
}

/// Centroids of already-projected geometries. `None` where undefined.
pub fn centroids(geometries: &[Geometry<f64>]) -> Vec<Option<Point<f64>>> {
    geometries.iter().map(|g| g.centroid()).collect()
}

/// Keeps candidates whose projected centroids are at most `threshold_m` apart.
pub fn refine_candidates(
    candidates: &[CandidatePair],
    a_centroids: &[Option<Point<f64>>],
    b_centroids: &[Option<Point<f64>>],
    threshold_m: f64,
) -> Vec<RefinedPair> {
    candidates
        .iter()
        .filter_map(|pair| {
            let ca = (*a_centroids.get(pair.a)?)?;
            let cb = (*b_centroids.get(pair.b)?)?;
            let distance_m = planar_distance(ca, cb);

            (distance_m <= threshold_m).then_some(RefinedPair {
                a: pair.a,
                b: pair.b,
                distance_m,
            })
        })
        .collect()
}
