// ===========================================================================
// Metric projections: Web Mercator (EPSG:3857) and northern UTM (EPSG:326xx)
// ===========================================================================
use geo::{Centroid, MapCoords};
use geo_types::{Coord, Geometry, Point};

pub const EARTH_RADIUS: f64 = 6378137.0;

/// Latitude limit of the square Web Mercator world.
pub const WEB_MERC_MAX_LAT: f64 = 85.051_128_78;

const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;
const UTM_SCALE_FACTOR: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    WebMercator,
    /// Northern hemisphere UTM zone, 1..=60.
    Utm { zone: u8 },
}

impl Projection {
    pub fn epsg(&self) -> u32 {
        match self {
            Projection::WebMercator => 3857,
            Projection::Utm { zone } => 32600 + *zone as u32,
        }
    }

    pub fn project_coord(&self, coord: Coord<f64>) -> Coord<f64> {
        let (x, y) = match self {
            Projection::WebMercator => lat_lng_to_web_merc(coord.x, coord.y),
            Projection::Utm { zone } => lat_lng_to_utm(coord.x, coord.y, *zone),
        };
        Coord { x, y }
    }

    pub fn project(&self, geometry: &Geometry<f64>) -> Geometry<f64> {
        geometry.map_coords(|coord| self.project_coord(coord))
    }
}

/// Convert lat/lng (EPSG:4326) to Web Mercator (EPSG:3857)
/// Input: (longitude, latitude) in degrees
/// Output: (x, y) in meters
pub fn lat_lng_to_web_merc(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-WEB_MERC_MAX_LAT, WEB_MERC_MAX_LAT);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * ((std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan()).ln();
    (x, y)
}

/// UTM zone number for a longitude. Zones are 6 degrees wide starting at -180.
pub fn utm_zone(lon: f64) -> u8 {
    let zone = ((lon + 180.0) / 6.0).floor() as i64 + 1;
    zone.clamp(1, 60) as u8
}

/// Northern hemisphere EPSG code (326xx) for a longitude.
pub fn utm_epsg(lon: f64) -> u32 {
    Projection::Utm { zone: utm_zone(lon) }.epsg()
}

/// Transverse Mercator forward projection on the WGS84 ellipsoid (Snyder, USGS PP 1395).
/// No false northing is applied, so southern latitudes come out negative.
pub fn lat_lng_to_utm(lon: f64, lat: f64, zone: u8) -> (f64, f64) {
    let a = EARTH_RADIUS;
    let e2 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let central_meridian = (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0;

    let phi = lat.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = phi.tan();

    let n = a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let big_a = cos_phi * (lon - central_meridian).to_radians();

    let m = a
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

    let x = UTM_SCALE_FACTOR
        * n
        * (big_a
            + (1.0 - t + c) * big_a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * big_a.powi(5) / 120.0)
        + UTM_FALSE_EASTING;

    let y = UTM_SCALE_FACTOR
        * (m + n
            * tan_phi
            * (big_a.powi(2) / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * big_a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * big_a.powi(6) / 720.0));

    (x, y)
}

/// Centroid distance in the UTM zone of the pair's mean centroid longitude.
///
/// Both geometries are in lon/lat. Returns `None` when either centroid is undefined.
pub fn utm_centroid_distance(a: &Geometry<f64>, b: &Geometry<f64>) -> Option<f64> {
    let avg_lon = (a.centroid()?.x() + b.centroid()?.x()) / 2.0;
    let projection = Projection::Utm {
        zone: utm_zone(avg_lon),
    };

    let ca = projection.project(a).centroid()?;
    let cb = projection.project(b).centroid()?;
    Some(planar_distance(ca, cb))
}

pub fn planar_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    (a.x() - b.x()).hypot(a.y() - b.y())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    #[test]
    fn test_utm_zone_numbers() {
        assert_eq!(utm_zone(-180.0), 1);
        assert_eq!(utm_zone(-122.27), 10);
        assert_eq!(utm_zone(0.0), 31);
        assert_eq!(utm_zone(179.9), 60);
        assert_eq!(utm_zone(180.0), 60);
        assert_eq!(utm_epsg(-122.27), 32610);
        assert_eq!(Projection::WebMercator.epsg(), 3857);
    }

    #[test]
    fn test_web_merc_equator_is_metric() {
        let (x0, y0) = lat_lng_to_web_merc(0.0, 0.0);
        assert!(x0.abs() < 1e-9 && y0.abs() < 1e-9);

        let one_km_deg = (1000.0 / EARTH_RADIUS).to_degrees();
        let (x1, _) = lat_lng_to_web_merc(one_km_deg, 0.0);
        assert!((x1 - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_web_merc_clamps_poles() {
        let (_, y) = lat_lng_to_web_merc(0.0, 90.0);
        assert!(y.is_finite());
    }

    #[test]
    fn test_utm_central_meridian() {
        // On the central meridian the easting is exactly the false easting.
        let (x, y) = lat_lng_to_utm(-123.0, 0.0, 10);
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);

        // One degree of latitude near the equator is about 110.6 km of northing.
        let (_, y1) = lat_lng_to_utm(-123.0, 1.0, 10);
        assert!((y1 - 0.9996 * 110_574.0).abs() < 50.0);
    }

    #[test]
    fn test_utm_distance_close_to_ground() {
        // 0.009 degrees of latitude at 37.8N is roughly 999 m on the ground.
        let a: Geometry<f64> = Point::new(-122.27, 37.800).into();
        let b: Geometry<f64> = Point::new(-122.27, 37.809).into();

        let d = utm_centroid_distance(&a, &b).unwrap();
        assert!((d - 999.0).abs() < 5.0, "distance was {d}");
    }

    #[test]
    fn test_utm_distance_uses_polygon_centroid() {
        let square: Geometry<f64> = Polygon::new(
            LineString::from(vec![
                (-122.271, 37.799),
                (-122.269, 37.799),
                (-122.269, 37.801),
                (-122.271, 37.801),
                (-122.271, 37.799),
            ]),
            vec![],
        )
        .into();
        let centre: Geometry<f64> = Point::new(-122.27, 37.80).into();

        let d = utm_centroid_distance(&square, &centre).unwrap();
        assert!(d < 1.0, "distance was {d}");
    }
}
