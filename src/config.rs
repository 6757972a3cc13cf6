use crate::error::{FinderError, io_err};
use crate::tag_filter::TagMatchStrategy;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_DISTANCE_THRESHOLD_METERS: f64 = 2000.0;
pub const DEFAULT_BUFFER_FACTOR: f64 = 2.0;
pub const DEFAULT_MAX_RESULTS: usize = 3;
/// Result count behind the `--10x` flag.
pub const EXPANDED_MAX_RESULTS: usize = 30;

/// Which distance convention decides acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceStrategy {
    /// Both sides in EPSG:3857, R-tree broad phase, centroid narrow phase.
    #[default]
    WebMercatorIndexed,
    /// Every pair measured in its own UTM zone. Quadratic, for validation.
    UtmExhaustive,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    pub distance_threshold_m: f64,
    /// The broad phase buffers A geometries by `threshold * buffer_factor`.
    pub buffer_factor: f64,
    pub max_results: usize,
    pub distance_strategy: DistanceStrategy,
    pub tag_match: TagMatchStrategy,
    /// Seed for the sampler. Unseeded runs draw from the OS.
    pub seed: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            distance_threshold_m: DEFAULT_DISTANCE_THRESHOLD_METERS,
            buffer_factor: DEFAULT_BUFFER_FACTOR,
            max_results: DEFAULT_MAX_RESULTS,
            distance_strategy: DistanceStrategy::default(),
            tag_match: TagMatchStrategy::default(),
            seed: None,
        }
    }
}

impl MatchConfig {
    pub fn buffer_m(&self) -> f64 {
        // never buffer tighter than the threshold itself
        self.distance_threshold_m * self.buffer_factor.max(1.0)
    }

    pub fn threshold_km(&self) -> f64 {
        self.distance_threshold_m / 1000.0
    }

    /// Reads a RON file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, FinderError> {
        let text = std::fs::read_to_string(path).map_err(|e| io_err!(path, e))?;
        Self::from_ron(&text).map_err(|reason| FinderError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_ron(text: &str) -> Result<Self, String> {
        let config: MatchConfig = ron::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.distance_threshold_m.is_finite() || self.distance_threshold_m <= 0.0 {
            return Err(format!(
                "distance_threshold_m must be a positive number, got {}",
                self.distance_threshold_m
            ));
        }
        if !self.buffer_factor.is_finite() {
            return Err("buffer_factor must be finite".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.distance_threshold_m, 2000.0);
        assert_eq!(config.buffer_m(), 4000.0);
        assert_eq!(config.max_results, 3);
        assert_eq!(config.threshold_km(), 2.0);
        assert_eq!(config.distance_strategy, DistanceStrategy::WebMercatorIndexed);
    }

    #[test]
    fn test_partial_ron() {
        let config = MatchConfig::from_ron(
            "(max_results: 30, distance_strategy: utm_exhaustive, tag_match: exact, seed: Some(9))",
        )
        .unwrap();

        assert_eq!(config.max_results, 30);
        assert_eq!(config.distance_strategy, DistanceStrategy::UtmExhaustive);
        assert_eq!(config.tag_match, TagMatchStrategy::Exact);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.distance_threshold_m, 2000.0);
    }

    #[test]
    fn test_buffer_never_below_threshold() {
        let config = MatchConfig {
            buffer_factor: 0.5,
            ..Default::default()
        };
        assert_eq!(config.buffer_m(), 2000.0);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(MatchConfig::from_ron("(distance_threshold_m: -1.0)").is_err());
    }
}
