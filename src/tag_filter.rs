//! Per-source selection of records whose tags agree with the query.

use crate::models::{
    Feature, OsmRecord, OsmTagColumn, OsmTagValues, OvertureLevel, OvertureRecord, Source,
};
use geo::HasDimensions;
use geo_types::Geometry;
use serde::Deserialize;

/// How an OSM column value is compared against a query tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMatchStrategy {
    /// Equality, after stripping an embedded `key=value` or `"key"=>"value"` key.
    Exact,
    /// `Exact`, or the raw value contains the tag quoted as `"tag"`.
    #[default]
    Embedded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagQuery {
    pub tags: Vec<String>,
    pub name: Option<String>,
    pub strategy: TagMatchStrategy,
}

impl TagQuery {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            name: None,
            strategy: TagMatchStrategy::default(),
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        // an empty substring matches every name, which is not what `--name ""` means
        self.name = name.filter(|n| !n.is_empty());
        self
    }

    pub fn with_strategy(mut self, strategy: TagMatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Case-insensitive substring test against the optional name filter.
    pub fn name_matches(&self, name: Option<&str>) -> bool {
        match &self.name {
            None => true,
            Some(needle) => name.is_some_and(|n| n.to_lowercase().contains(&needle.to_lowercase())),
        }
    }

    /// Whether a single OSM column value matches any query tag.
    pub fn osm_value_matches(&self, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }

        let stripped = strip_embedded_key(value);

        self.tags.iter().any(|tag| {
            if value == tag || stripped == tag {
                return true;
            }

            match self.strategy {
                TagMatchStrategy::Exact => false,
                TagMatchStrategy::Embedded => value.contains(&format!("\"{tag}\"")),
            }
        })
    }

    /// First column, in priority order, whose value matches.
    pub fn first_osm_match<'a>(
        &self,
        tags: &'a OsmTagValues,
    ) -> Option<(OsmTagColumn, &'a str)> {
        tags.iter()
            .find(|(_, value)| self.osm_value_matches(value))
    }

    /// First taxonomy level, in priority order, equal to a query tag.
    pub fn first_overture_match<'a>(
        &self,
        record: &'a OvertureRecord,
    ) -> Option<(OvertureLevel, &'a str)> {
        OvertureLevel::ALL.iter().find_map(|level| {
            let value = record.taxonomy.get(*level)?;
            self.tags
                .iter()
                .any(|tag| tag == value)
                .then_some((*level, value))
        })
    }
}

/// Strips an embedded key from `key=value` or `"key"=>"value"` forms.
///
/// Values without an embedded key are returned unchanged.
pub fn strip_embedded_key(value: &str) -> &str {
    if let Some((_, rhs)) = value.split_once("=>") {
        return rhs.trim().trim_matches('"');
    }

    if let Some((_, rhs)) = value.split_once('=') {
        return rhs.trim();
    }

    value
}

fn usable_geometry(geometry: Option<&Geometry<f64>>) -> bool {
    geometry.is_some_and(|g| !g.is_empty())
}

/// Selects OSM records matching the query and converts them to features.
pub fn filter_osm_records(records: Vec<OsmRecord>, query: &TagQuery) -> Vec<Feature> {
    if query.tags.is_empty() {
        return Vec::new();
    }

    records
        .into_iter()
        .filter(|record| query.name_matches(record.name.as_deref()))
        .filter_map(|record| {
            let (column, value) = query.first_osm_match(&record.tags)?;
            let source_value = value.to_string();

            let id = record
                .osm_id
                .as_ref()
                .filter(|id| !id.is_empty())
                .or(record.osm_way_id.as_ref().filter(|id| !id.is_empty()))?
                .clone();

            if !usable_geometry(record.geometry.as_ref()) {
                return None;
            }

            Some(Feature {
                id,
                source: Source::Osm {
                    layer: record.layer,
                },
                source_tag: column.key().to_string(),
                source_value,
                name: record.name,
                geometry: record.geometry?,
                confidence: None,
                extra_attributes: record.other_tags,
            })
        })
        .collect()
}

/// Selects Overture records matching the query and converts them to features.
pub fn filter_overture_records(records: Vec<OvertureRecord>, query: &TagQuery) -> Vec<Feature> {
    if query.tags.is_empty() {
        return Vec::new();
    }

    records
        .into_iter()
        .filter(|record| !record.id.is_empty())
        .filter(|record| query.name_matches(record.name.as_deref()))
        .filter(|record| usable_geometry(record.geometry.as_ref()))
        .filter_map(|record| {
            let (level, value) = query.first_overture_match(&record)?;
            let source_value = value.to_string();

            Some(Feature {
                id: record.id,
                source_tag: level.as_str().to_string(),
                source_value,
                name: record.name,
                geometry: record.geometry?,
                confidence: record.confidence,
                extra_attributes: None,
                source: Source::Overture {
                    theme: record.theme,
                    kind: record.kind,
                    taxonomy: record.taxonomy,
                },
            })
        })
        .collect()
}
