use crate::models::{Feature, Match, Source};
use crate::projection::utm_centroid_distance;

fn display_opt(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}

fn line(out: &mut String, text: impl AsRef<str>) {
    out.push_str(text.as_ref());
    out.push('\n');
}

fn push_osm(out: &mut String, feature: &Feature) {
    line(out, "  OSM:");
    line(out, format!("    ID: {}", feature.id));
    if let Source::Osm { layer } = &feature.source {
        line(out, format!("    Layer: {}", layer));
    }
    line(out, format!("    Name: {}", display_opt(feature.name.as_deref())));
    line(
        out,
        format!("    Tag: {}={}", feature.source_tag, feature.source_value),
    );
}

fn push_overture(out: &mut String, feature: &Feature) {
    line(out, "  Overture:");
    line(out, format!("    ID: {}", feature.id));
    line(out, format!("    Name: {}", display_opt(feature.name.as_deref())));
    if let Source::Overture {
        theme,
        kind,
        taxonomy,
    } = &feature.source
    {
        line(out, format!("    Theme: {}", display_opt(theme.as_deref())));
        line(out, format!("    Type: {}", display_opt(kind.as_deref())));
        line(
            out,
            format!("    Subtype: {}", display_opt(taxonomy.subtype.as_deref())),
        );
        line(
            out,
            format!("    Class: {}", display_opt(taxonomy.class.as_deref())),
        );
        line(
            out,
            format!(
                "    Basic Category: {}",
                display_opt(taxonomy.basic_category.as_deref())
            ),
        );
        line(
            out,
            format!(
                "    Primary Category: {}",
                display_opt(taxonomy.primary_category.as_deref())
            ),
        );
    }
    if let Some(confidence) = feature.confidence {
        line(out, format!("    Confidence: {:.2}", confidence));
    }
}

/// Renders matches for the terminal.
pub fn format_matches(matches: &[Match], threshold_km: f64) -> String {
    if matches.is_empty() {
        return "No matches found.".to_string();
    }

    let mut out = String::new();
    line(
        &mut out,
        format!(
            "Found {} match(es) within {:.1} km:\n",
            matches.len(),
            threshold_km
        ),
    );

    for (i, m) in matches.iter().enumerate() {
        line(&mut out, format!("Match {}:", i + 1));
        push_osm(&mut out, &m.a);
        push_overture(&mut out, &m.b);
        line(
            &mut out,
            format!("  Distance: {:.2} km", m.distance_m / 1000.0),
        );
        if let Some(utm) = utm_centroid_distance(&m.a.geometry, &m.b.geometry) {
            line(&mut out, format!("  UTM Distance: {:.2} km", utm / 1000.0));
        }
        line(&mut out, "");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OsmLayer, OvertureTaxonomy};
    use geo_types::Point;

    fn sample_match() -> Match {
        Match {
            a: Feature {
                id: "123".to_string(),
                source: Source::Osm {
                    layer: OsmLayer::Multipolygons,
                },
                source_tag: "aeroway".to_string(),
                source_value: "aerodrome".to_string(),
                name: Some("Oakland International Airport".to_string()),
                geometry: Point::new(-122.22, 37.72).into(),
                confidence: None,
                extra_attributes: None,
            },
            b: Feature {
                id: "08f2".to_string(),
                source: Source::Overture {
                    theme: Some("places".to_string()),
                    kind: Some("place".to_string()),
                    taxonomy: OvertureTaxonomy {
                        primary_category: Some("airport".to_string()),
                        basic_category: Some("airport".to_string()),
                        subtype: None,
                        class: None,
                    },
                },
                source_tag: "categories.primary".to_string(),
                source_value: "airport".to_string(),
                name: Some("Oakland Airport".to_string()),
                geometry: Point::new(-122.21, 37.71).into(),
                confidence: Some(0.954),
                extra_attributes: None,
            },
            distance_m: 1234.0,
        }
    }

    #[test]
    fn test_no_matches() {
        assert_eq!(format_matches(&[], 2.0), "No matches found.");
    }

    #[test]
    fn test_layout() {
        let text = format_matches(&[sample_match()], 2.0);

        assert!(text.starts_with("Found 1 match(es) within 2.0 km:\n\nMatch 1:\n  OSM:\n"));
        assert!(text.contains("    Layer: multipolygons\n"));
        assert!(text.contains("    Tag: aeroway=aerodrome\n"));
        assert!(text.contains("    Subtype: None\n"));
        assert!(text.contains("    Primary Category: airport\n"));
        assert!(text.contains("    Confidence: 0.95\n"));
        assert!(text.contains("  Distance: 1.23 km\n"));
        // about 1.4 km between the two points in zone 10
        assert!(text.contains("  UTM Distance: 1.4"));
    }

    #[test]
    fn test_confidence_omitted_when_absent() {
        let mut m = sample_match();
        m.b.confidence = None;
        assert!(!format_matches(&[m], 2.0).contains("Confidence"));
    }

    #[test]
    fn test_threshold_printed_with_one_decimal() {
        let text = format_matches(&[sample_match()], 0.5);
        assert!(text.starts_with("Found 1 match(es) within 0.5 km:\n"));
    }
}
