//! Reads OSM PBF extracts as the three layers GDAL's OSM driver exposes.
//!
//! * `points`: tagged nodes
//! * `lines`: ways that are not areas
//! * `multipolygons`: closed area ways and `multipolygon`/`boundary` relations

use crate::error::{FinderError, io_err};
use crate::models::{OsmLayer, OsmRecord, OsmTagColumn, OsmTagValues};
use crate::tag_filter::TagQuery;
use geo::Contains;
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use osmpbfreader::{Node, OsmId, OsmObj, OsmPbfReader, Relation, Tags, Way};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Keys that make a closed way an area (GDAL's `closed_ways_are_polygons`).
const AREA_KEYS: [&str; 16] = [
    "aeroway", "amenity", "boundary", "building", "craft", "geological", "historic", "landuse",
    "leisure", "military", "natural", "office", "place", "shop", "sport", "tourism",
];

/// Keys never carried into the `other_tags` blob.
const UNLISTED_KEYS: [&str; 2] = ["name", "created_by"];

pub fn tag_values(tags: &Tags) -> OsmTagValues {
    let mut values = OsmTagValues::default();
    for (key, value) in tags.iter() {
        if let Some(column) = OsmTagColumn::from_key(key.as_str()) {
            values.set(column, value.as_str());
        }
    }
    values
}

/// Remaining tags serialised as `"key"=>"value"` pairs.
pub fn other_tags(tags: &Tags) -> Option<String> {
    let escape = |s: &str| s.replace('\\', "\\\\").replace('"', "\\\"");

    let mut pairs: Vec<String> = tags
        .iter()
        .filter(|(key, _)| OsmTagColumn::from_key(key.as_str()).is_none())
        .filter(|(key, _)| !UNLISTED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| format!("\"{}\"=>\"{}\"", escape(key.as_str()), escape(value.as_str())))
        .collect();

    if pairs.is_empty() {
        return None;
    }

    pairs.sort();
    Some(pairs.join(","))
}

fn tag(tags: &Tags, key: &str) -> Option<String> {
    tags.get(key).map(|v| v.as_str().to_string())
}

/// Cheap check on raw tags so geometry is only assembled for candidates.
fn wanted(tags: &Tags, query: &TagQuery) -> bool {
    query.name_matches(tags.get("name").map(|v| v.as_str()))
        && query.first_osm_match(&tag_values(tags)).is_some()
}

fn is_closed(way: &Way) -> bool {
    way.nodes.len() >= 4 && way.nodes.first() == way.nodes.last()
}

fn is_area_way(way: &Way) -> bool {
    if !is_closed(way) {
        return false;
    }

    match way.tags.get("area").map(|v| v.as_str()) {
        Some("no") => false,
        Some("yes") => true,
        _ => AREA_KEYS.iter().any(|key| way.tags.contains_key(*key)),
    }
}

fn is_area_relation(relation: &Relation) -> bool {
    matches!(
        relation.tags.get("type").map(|v| v.as_str()),
        Some("multipolygon") | Some("boundary")
    )
}

fn record(layer: OsmLayer, tags: &Tags, geometry: Option<Geometry<f64>>) -> OsmRecord {
    OsmRecord {
        layer,
        osm_id: None,
        osm_way_id: None,
        name: tag(tags, "name"),
        tags: tag_values(tags),
        other_tags: other_tags(tags),
        geometry,
    }
}

fn node_coord(node: &Node) -> Coord<f64> {
    Coord {
        x: node.lon(),
        y: node.lat(),
    }
}

fn way_coords(way: &Way, objs: &BTreeMap<OsmId, OsmObj>) -> Vec<Coord<f64>> {
    way.nodes
        .iter()
        .filter_map(|id| match objs.get(&OsmId::Node(*id)) {
            Some(OsmObj::Node(node)) => Some(node_coord(node)),
            _ => None,
        })
        .collect()
}

/// Joins way segments end to end into closed rings. Unclosable leftovers are dropped.
pub fn stitch_rings(mut segments: Vec<Vec<Coord<f64>>>) -> Vec<LineString<f64>> {
    let mut rings = Vec::new();
    segments.retain(|s| s.len() >= 2);

    while let Some(mut ring) = segments.pop() {
        loop {
            let (first, last) = (ring[0], ring[ring.len() - 1]);
            if ring.len() >= 4 && first == last {
                rings.push(LineString::new(ring));
                break;
            }

            let Some(pos) = segments
                .iter()
                .position(|s| s[0] == last || s[s.len() - 1] == last)
            else {
                debug!("Dropping unclosed ring with {} points", ring.len());
                break;
            };

            let mut next = segments.swap_remove(pos);
            if next[0] != last {
                next.reverse();
            }
            ring.extend(next.into_iter().skip(1));
        }
    }

    rings
}

/// Builds a multipolygon from outer and inner rings, assigning each inner ring
/// to the first outer ring containing it.
pub fn assemble_multipolygon(
    outers: Vec<LineString<f64>>,
    inners: Vec<LineString<f64>>,
) -> Option<MultiPolygon<f64>> {
    if outers.is_empty() {
        return None;
    }

    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); outers.len()];
    for inner in inners {
        let Some(probe) = inner.0.first().map(|c| Point::from(*c)) else {
            continue;
        };
        if let Some(idx) = outers
            .iter()
            .position(|outer| Polygon::new(outer.clone(), vec![]).contains(&probe))
        {
            holes[idx].push(inner);
        }
    }

    Some(MultiPolygon::new(
        outers
            .into_iter()
            .zip(holes)
            .map(|(outer, inner)| Polygon::new(outer, inner))
            .collect(),
    ))
}

fn relation_geometry(
    relation: &Relation,
    objs: &BTreeMap<OsmId, OsmObj>,
) -> Option<Geometry<f64>> {
    let mut outer_segments = Vec::new();
    let mut inner_segments = Vec::new();

    for member in &relation.refs {
        let Some(OsmObj::Way(way)) = objs.get(&member.member) else {
            continue;
        };
        let coords = way_coords(way, objs);
        if member.role.as_str() == "inner" {
            inner_segments.push(coords);
        } else {
            outer_segments.push(coords);
        }
    }

    assemble_multipolygon(stitch_rings(outer_segments), stitch_rings(inner_segments))
        .map(Geometry::MultiPolygon)
}

fn open_reader(path: &Path) -> Result<OsmPbfReader<BufReader<File>>, FinderError> {
    let file = File::open(path).map_err(|e| io_err!(path, e))?;
    Ok(OsmPbfReader::new(BufReader::new(file)))
}

/// Whether `obj` belongs on `layer` and its tags could satisfy `query`.
pub fn selects(layer: OsmLayer, obj: &OsmObj, query: &TagQuery) -> bool {
    match (layer, obj) {
        (OsmLayer::Points, OsmObj::Node(node)) => wanted(&node.tags, query),
        (OsmLayer::Lines, OsmObj::Way(way)) => !is_area_way(way) && wanted(&way.tags, query),
        (OsmLayer::Multipolygons, OsmObj::Way(way)) => {
            is_area_way(way) && wanted(&way.tags, query)
        }
        (OsmLayer::Multipolygons, OsmObj::Relation(rel)) => {
            is_area_relation(rel) && wanted(&rel.tags, query)
        }
        _ => false,
    }
}

/// Builds the record for an object already accepted by [`selects`].
///
/// `objs` must hold the nodes and member ways the object references.
pub fn layer_record(layer: OsmLayer, obj: &OsmObj, objs: &BTreeMap<OsmId, OsmObj>) -> OsmRecord {
    match obj {
        OsmObj::Node(node) => {
            let mut r = record(
                layer,
                &node.tags,
                Some(Point::from(node_coord(node)).into()),
            );
            r.osm_id = Some(node.id.0.to_string());
            r
        }
        OsmObj::Way(way) if layer == OsmLayer::Lines => {
            let coords = way_coords(way, objs);
            let geometry =
                (coords.len() >= 2).then(|| Geometry::LineString(LineString::new(coords)));
            let mut r = record(layer, &way.tags, geometry);
            r.osm_id = Some(way.id.0.to_string());
            r
        }
        OsmObj::Way(way) => {
            let geometry =
                assemble_multipolygon(stitch_rings(vec![way_coords(way, objs)]), Vec::new())
                    .map(Geometry::MultiPolygon);
            let mut r = record(layer, &way.tags, geometry);
            r.osm_way_id = Some(way.id.0.to_string());
            r
        }
        OsmObj::Relation(rel) => {
            let mut r = record(layer, &rel.tags, relation_geometry(rel, objs));
            r.osm_id = Some(rel.id.0.to_string());
            r
        }
    }
}

/// Records for every object in `objs` that `layer` selects, in id order.
pub fn records_from_objs(
    layer: OsmLayer,
    objs: &BTreeMap<OsmId, OsmObj>,
    query: &TagQuery,
) -> Vec<OsmRecord> {
    objs.values()
        .filter(|obj| selects(layer, obj, query))
        .map(|obj| layer_record(layer, obj, objs))
        .collect()
}

/// Reads one layer, keeping only objects whose tags could satisfy `query`.
pub fn read_layer(
    path: &Path,
    layer: OsmLayer,
    query: &TagQuery,
) -> Result<Vec<OsmRecord>, FinderError> {
    let mut reader = open_reader(path)?;

    let records = match layer {
        OsmLayer::Points => {
            // nodes carry their own geometry, so no dependency pass is needed
            let empty = BTreeMap::new();
            let mut records = Vec::new();
            for obj in reader.iter() {
                let obj = obj?;
                if selects(layer, &obj, query) {
                    records.push(layer_record(layer, &obj, &empty));
                }
            }
            records
        }
        OsmLayer::Lines | OsmLayer::Multipolygons => {
            let objs = reader.get_objs_and_deps(|obj| selects(layer, obj, query))?;
            records_from_objs(layer, &objs, query)
        }
    };

    debug!(
        "Read {} candidate records from layer {} of {:?}",
        records.len(),
        layer,
        path
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmpbfreader::{NodeId, Ref, RelationId, WayId};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string().into(), v.to_string().into()))
            .collect()
    }

    fn node(id: i64, lon: f64, lat: f64, t: &[(&str, &str)]) -> Node {
        Node {
            id: NodeId(id),
            tags: tags(t),
            decimicro_lat: (lat * 1e7).round() as i32,
            decimicro_lon: (lon * 1e7).round() as i32,
        }
    }

    fn way(id: i64, nodes: &[i64], t: &[(&str, &str)]) -> Way {
        Way {
            id: WayId(id),
            tags: tags(t),
            nodes: nodes.iter().map(|n| NodeId(*n)).collect(),
        }
    }

    fn relation(id: i64, outer: i64, t: &[(&str, &str)]) -> Relation {
        Relation {
            id: RelationId(id),
            tags: tags(t),
            refs: vec![Ref {
                member: OsmId::Way(WayId(outer)),
                role: "outer".to_string().into(),
            }],
        }
    }

    fn store(objs: Vec<OsmObj>) -> BTreeMap<OsmId, OsmObj> {
        objs.into_iter().map(|obj| (obj.id(), obj)).collect()
    }

    /// A small airfield: four corner nodes, a tagged node and several ways and relations.
    fn airfield() -> BTreeMap<OsmId, OsmObj> {
        store(vec![
            node(1, 0.0, 0.0, &[]).into(),
            node(2, 0.001, 0.0, &[]).into(),
            node(3, 0.001, 0.001, &[]).into(),
            node(4, 0.0, 0.001, &[]).into(),
            node(100, 0.0005, 0.0005, &[("aeroway", "aerodrome"), ("name", "Test Field")]).into(),
            way(10, &[1, 2], &[("aeroway", "runway")]).into(),
            way(11, &[1, 2, 3, 1], &[("railway", "platform")]).into(),
            way(12, &[1, 2, 3, 4, 1], &[("aeroway", "aerodrome")]).into(),
            way(20, &[1, 2, 3, 4, 1], &[]).into(),
            relation(30, 20, &[("type", "multipolygon"), ("aeroway", "aerodrome")]).into(),
            relation(31, 20, &[("type", "route"), ("aeroway", "aerodrome")]).into(),
        ])
    }

    fn query() -> TagQuery {
        TagQuery::new(["aerodrome", "runway", "platform"])
    }

    #[test]
    fn test_tag_columns_and_other_tags() {
        let t = tags(&[
            ("aeroway", "aerodrome"),
            ("name", "Oakland"),
            ("created_by", "JOSM"),
            ("note", "say \"hi\""),
            ("iata", "OAK"),
        ]);

        let values = tag_values(&t);
        assert_eq!(values.get(OsmTagColumn::Aeroway), Some("aerodrome"));
        assert!(values.get(OsmTagColumn::Amenity).is_none());

        assert_eq!(
            other_tags(&t).as_deref(),
            Some(r#""iata"=>"OAK","note"=>"say \"hi\"""#)
        );
    }

    #[test]
    fn test_other_tags_absent_when_only_columns_and_name() {
        let t = tags(&[("amenity", "cafe"), ("name", "Blue Bottle")]);
        assert!(other_tags(&t).is_none());
    }

    #[test]
    fn test_area_way_rules() {
        let square = [1, 2, 3, 4, 1];

        assert!(is_area_way(&way(1, &square, &[("building", "yes")])));
        assert!(!is_area_way(&way(1, &square, &[("highway", "pedestrian")])));
        assert!(is_area_way(&way(
            1,
            &square,
            &[("highway", "pedestrian"), ("area", "yes")]
        )));
        assert!(!is_area_way(&way(
            1,
            &square,
            &[("building", "yes"), ("area", "no")]
        )));
        // open, and closed but too short to be a ring
        assert!(!is_area_way(&way(1, &[1, 2, 3, 4], &[("building", "yes")])));
        assert!(!is_area_way(&way(1, &[1, 2, 1], &[("building", "yes")])));
    }

    #[test]
    fn test_area_relation_types() {
        assert!(is_area_relation(&relation(1, 2, &[("type", "multipolygon")])));
        assert!(is_area_relation(&relation(1, 2, &[("type", "boundary")])));
        assert!(!is_area_relation(&relation(1, 2, &[("type", "route")])));
        assert!(!is_area_relation(&relation(1, 2, &[])));
    }

    #[test]
    fn test_points_layer() {
        let records = records_from_objs(OsmLayer::Points, &airfield(), &query());
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.osm_id.as_deref(), Some("100"));
        assert!(r.osm_way_id.is_none());
        assert_eq!(r.name.as_deref(), Some("Test Field"));
        assert!(matches!(r.geometry, Some(Geometry::Point(_))));
    }

    #[test]
    fn test_lines_layer_takes_open_and_non_area_closed_ways() {
        let records = records_from_objs(OsmLayer::Lines, &airfield(), &query());
        let ids: Vec<_> = records.iter().map(|r| r.osm_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("10"), Some("11")]);
        assert!(
            records
                .iter()
                .all(|r| matches!(r.geometry, Some(Geometry::LineString(_))))
        );
    }

    #[test]
    fn test_multipolygons_layer_ids() {
        let records = records_from_objs(OsmLayer::Multipolygons, &airfield(), &query());
        assert_eq!(records.len(), 2);

        // closed area way
        assert_eq!(records[0].osm_way_id.as_deref(), Some("12"));
        assert!(records[0].osm_id.is_none());
        let Some(Geometry::MultiPolygon(mp)) = &records[0].geometry else {
            panic!("area way should be a multipolygon");
        };
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].exterior().0.len(), 5);

        // multipolygon relation; the route relation is ignored
        assert_eq!(records[1].osm_id.as_deref(), Some("30"));
        assert!(records[1].osm_way_id.is_none());
        assert!(matches!(records[1].geometry, Some(Geometry::MultiPolygon(_))));
    }

    #[test]
    fn test_name_filter_applies_before_assembly() {
        let objs = airfield();
        let hit = query().with_name(Some("field".to_string()));
        let miss = query().with_name(Some("harbour".to_string()));

        assert_eq!(records_from_objs(OsmLayer::Points, &objs, &hit).len(), 1);
        assert!(records_from_objs(OsmLayer::Points, &objs, &miss).is_empty());
        assert!(records_from_objs(OsmLayer::Multipolygons, &objs, &miss).is_empty());
    }

    #[test]
    fn test_stitch_two_halves() {
        let rings = stitch_rings(vec![
            vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0)],
            vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0)],
        ]);

        assert_eq!(rings.len(), 1);
        let ring = &rings[0];
        assert_eq!(ring.0.len(), 5);
        assert_eq!(ring.0.first(), ring.0.last());
    }

    #[test]
    fn test_stitch_drops_open_ring() {
        let rings = stitch_rings(vec![vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0)]]);
        assert!(rings.is_empty());
    }

    #[test]
    fn test_closed_way_passes_through() {
        let closed = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 0.0)];
        let rings = stitch_rings(vec![closed.clone()]);
        assert_eq!(rings, vec![LineString::new(closed)]);
    }

    #[test]
    fn test_inner_ring_assigned_to_containing_outer() {
        let outer_a = LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let outer_b = LineString::from(vec![(20.0, 0.0), (30.0, 0.0), (30.0, 10.0), (20.0, 10.0), (20.0, 0.0)]);
        let hole = LineString::from(vec![(22.0, 2.0), (24.0, 2.0), (24.0, 4.0), (22.0, 2.0)]);

        let mp = assemble_multipolygon(vec![outer_a, outer_b], vec![hole]).unwrap();
        assert_eq!(mp.0.len(), 2);
        assert!(mp.0[0].interiors().is_empty());
        assert_eq!(mp.0[1].interiors().len(), 1);
    }

    #[test]
    fn test_no_outer_no_geometry() {
        assert!(assemble_multipolygon(vec![], vec![]).is_none());
    }
}
