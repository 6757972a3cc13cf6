//! The matching pipeline: project, broad phase, narrow phase, sample.

use crate::candidate_search::find_candidates;
use crate::config::{DistanceStrategy, MatchConfig};
use crate::distance::{RefinedPair, centroids, refine_candidates};
use crate::models::{Feature, Match};
use crate::projection::{Projection, utm_centroid_distance};
use crate::sampler::sample_matches;
use geo_types::Geometry;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, info};

pub struct FeatureMatcher {
    config: MatchConfig,
}

impl FeatureMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// All pairs (a from `a`, b from `b`) within the acceptance threshold.
    pub fn find_matches(&self, a: &[Feature], b: &[Feature]) -> Vec<Match> {
        if a.is_empty() || b.is_empty() {
            debug!(
                "Skipping match search: {} features on A, {} on B",
                a.len(),
                b.len()
            );
            return Vec::new();
        }

        let refined = match self.config.distance_strategy {
            DistanceStrategy::WebMercatorIndexed => self.indexed_pairs(a, b),
            DistanceStrategy::UtmExhaustive => self.exhaustive_pairs(a, b),
        };

        refined
            .into_iter()
            .map(|pair| Match {
                a: a[pair.a].clone(),
                b: b[pair.b].clone(),
                distance_m: pair.distance_m,
            })
            .collect()
    }

    fn indexed_pairs(&self, a: &[Feature], b: &[Feature]) -> Vec<RefinedPair> {
        let a_proj = project_all(a, Projection::WebMercator);
        let b_proj = project_all(b, Projection::WebMercator);

        let a_centroids = centroids(&a_proj);
        let b_centroids = centroids(&b_proj);

        let candidates = find_candidates(
            &a_proj,
            &a_centroids,
            &b_proj,
            &b_centroids,
            self.config.buffer_m(),
        );
        debug!(
            "Broad phase kept {} of {} possible pairs",
            candidates.len(),
            a.len() * b.len()
        );

        let refined = refine_candidates(
            &candidates,
            &a_centroids,
            &b_centroids,
            self.config.distance_threshold_m,
        );
        info!(
            "{} of {} candidates within {} m",
            refined.len(),
            candidates.len(),
            self.config.distance_threshold_m
        );
        refined
    }

    fn exhaustive_pairs(&self, a: &[Feature], b: &[Feature]) -> Vec<RefinedPair> {
        let threshold = self.config.distance_threshold_m;

        let per_a: Vec<Vec<RefinedPair>> = a
            .par_iter()
            .enumerate()
            .map(|(a_idx, fa)| {
                b.iter()
                    .enumerate()
                    .filter_map(|(b_idx, fb)| {
                        let distance_m = utm_centroid_distance(&fa.geometry, &fb.geometry)?;
                        (distance_m <= threshold).then_some(RefinedPair {
                            a: a_idx,
                            b: b_idx,
                            distance_m,
                        })
                    })
                    .collect()
            })
            .collect();

        per_a.into_iter().flatten().collect()
    }

    /// Caps `matches` at `max_results` using the configured seed.
    pub fn select(&self, matches: Vec<Match>) -> Vec<Match> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        sample_matches(matches, self.config.max_results, &mut rng)
    }

    /// `find_matches` followed by `select`.
    pub fn run(&self, a: &[Feature], b: &[Feature]) -> Vec<Match> {
        let matches = self.find_matches(a, b);
        info!("Found {} match(es) before selection", matches.len());
        self.select(matches)
    }
}

fn project_all(features: &[Feature], projection: Projection) -> Vec<Geometry<f64>> {
    features
        .par_iter()
        .map(|f| projection.project(&f.geometry))
        .collect()
}

/// UTM distance for an already accepted match, for cross-checking the bulk path.
pub fn validation_distance(m: &Match) -> Option<f64> {
    utm_centroid_distance(&m.a.geometry, &m.b.geometry)
}
