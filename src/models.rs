use geo_types::Geometry;
use std::fmt;

/// Layers of an OSM extract, mirroring the layers GDAL's OSM driver exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsmLayer {
    Points,
    Lines,
    Multipolygons,
}

impl OsmLayer {
    pub const ALL: [OsmLayer; 3] = [OsmLayer::Points, OsmLayer::Lines, OsmLayer::Multipolygons];

    pub fn as_str(&self) -> &'static str {
        match self {
            OsmLayer::Points => "points",
            OsmLayer::Lines => "lines",
            OsmLayer::Multipolygons => "multipolygons",
        }
    }
}

impl fmt::Display for OsmLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The OSM keys promoted to their own attribute columns, in match priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsmTagColumn {
    Aeroway,
    Amenity,
    Leisure,
    Tourism,
    Landuse,
    Natural,
    Shop,
    Historic,
    Building,
    Highway,
    Railway,
    Waterway,
    Boundary,
    Place,
    ManMade,
    Craft,
    Office,
    Sport,
}

impl OsmTagColumn {
    pub const COUNT: usize = 18;

    pub const ALL: [OsmTagColumn; Self::COUNT] = [
        OsmTagColumn::Aeroway,
        OsmTagColumn::Amenity,
        OsmTagColumn::Leisure,
        OsmTagColumn::Tourism,
        OsmTagColumn::Landuse,
        OsmTagColumn::Natural,
        OsmTagColumn::Shop,
        OsmTagColumn::Historic,
        OsmTagColumn::Building,
        OsmTagColumn::Highway,
        OsmTagColumn::Railway,
        OsmTagColumn::Waterway,
        OsmTagColumn::Boundary,
        OsmTagColumn::Place,
        OsmTagColumn::ManMade,
        OsmTagColumn::Craft,
        OsmTagColumn::Office,
        OsmTagColumn::Sport,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            OsmTagColumn::Aeroway => "aeroway",
            OsmTagColumn::Amenity => "amenity",
            OsmTagColumn::Leisure => "leisure",
            OsmTagColumn::Tourism => "tourism",
            OsmTagColumn::Landuse => "landuse",
            OsmTagColumn::Natural => "natural",
            OsmTagColumn::Shop => "shop",
            OsmTagColumn::Historic => "historic",
            OsmTagColumn::Building => "building",
            OsmTagColumn::Highway => "highway",
            OsmTagColumn::Railway => "railway",
            OsmTagColumn::Waterway => "waterway",
            OsmTagColumn::Boundary => "boundary",
            OsmTagColumn::Place => "place",
            OsmTagColumn::ManMade => "man_made",
            OsmTagColumn::Craft => "craft",
            OsmTagColumn::Office => "office",
            OsmTagColumn::Sport => "sport",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|column| column.key() == key)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Values of the fixed OSM tag columns for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsmTagValues([Option<String>; OsmTagColumn::COUNT]);

impl OsmTagValues {
    pub fn get(&self, column: OsmTagColumn) -> Option<&str> {
        self.0[column.index()].as_deref()
    }

    pub fn set(&mut self, column: OsmTagColumn, value: impl Into<String>) {
        self.0[column.index()] = Some(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Populated columns in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (OsmTagColumn, &str)> {
        OsmTagColumn::ALL
            .iter()
            .filter_map(|column| self.get(*column).map(|value| (*column, value)))
    }
}

/// A row as read from one OSM layer, before tag filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct OsmRecord {
    pub layer: OsmLayer,
    pub osm_id: Option<String>,
    /// Set instead of `osm_id` for areas built from closed ways.
    pub osm_way_id: Option<String>,
    pub name: Option<String>,
    pub tags: OsmTagValues,
    pub other_tags: Option<String>,
    pub geometry: Option<Geometry<f64>>,
}

/// Levels of the Overture category taxonomy, in match priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OvertureLevel {
    PrimaryCategory,
    BasicCategory,
    Subtype,
    Class,
}

impl OvertureLevel {
    pub const ALL: [OvertureLevel; 4] = [
        OvertureLevel::PrimaryCategory,
        OvertureLevel::BasicCategory,
        OvertureLevel::Subtype,
        OvertureLevel::Class,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OvertureLevel::PrimaryCategory => "categories.primary",
            OvertureLevel::BasicCategory => "basic_category",
            OvertureLevel::Subtype => "subtype",
            OvertureLevel::Class => "class",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OvertureTaxonomy {
    pub primary_category: Option<String>,
    pub basic_category: Option<String>,
    pub subtype: Option<String>,
    pub class: Option<String>,
}

impl OvertureTaxonomy {
    pub fn get(&self, level: OvertureLevel) -> Option<&str> {
        match level {
            OvertureLevel::PrimaryCategory => self.primary_category.as_deref(),
            OvertureLevel::BasicCategory => self.basic_category.as_deref(),
            OvertureLevel::Subtype => self.subtype.as_deref(),
            OvertureLevel::Class => self.class.as_deref(),
        }
    }
}

/// A row as read from an Overture GeoParquet file, before tag filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OvertureRecord {
    pub id: String,
    pub name: Option<String>,
    pub theme: Option<String>,
    pub kind: Option<String>,
    pub taxonomy: OvertureTaxonomy,
    pub confidence: Option<f64>,
    pub geometry: Option<Geometry<f64>>,
}

/// Where a feature came from, with the per-source fields kept for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Osm {
        layer: OsmLayer,
    },
    Overture {
        theme: Option<String>,
        kind: Option<String>,
        taxonomy: OvertureTaxonomy,
    },
}

/// A record admitted into the matching pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub source: Source,
    pub source_tag: String,
    pub source_value: String,
    pub name: Option<String>,
    pub geometry: Geometry<f64>,
    pub confidence: Option<f64>,
    pub extra_attributes: Option<String>,
}

/// Two features from different sources within the acceptance distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub a: Feature,
    pub b: Feature,
    pub distance_m: f64,
}
