use geo::{BoundingRect, Distance, Euclidean};
use geo_types::{Geometry, Point};
use rayon::prelude::*;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};

/// Indices into the A and B feature lists of a pair that survived the broad phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidatePair {
    pub a: usize,
    pub b: usize,
}

type IndexedRect = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Spatial index over the bounding boxes of the B side.
pub struct CandidateIndex<'a> {
    geometries: &'a [Geometry<f64>],
    centroids: &'a [Option<Point<f64>>],
    tree: RTree<IndexedRect>,
}

impl<'a> CandidateIndex<'a> {
    /// `centroids[i]` must be the centroid of `geometries[i]`.
    pub fn build(geometries: &'a [Geometry<f64>], centroids: &'a [Option<Point<f64>>]) -> Self {
        let rects: Vec<IndexedRect> = geometries
            .iter()
            .enumerate()
            .filter_map(|(idx, geometry)| {
                let rect = geometry.bounding_rect()?;
                Some(GeomWithData::new(
                    Rectangle::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    idx,
                ))
            })
            .collect();

        Self {
            geometries,
            centroids,
            tree: RTree::bulk_load(rects),
        }
    }

    /// Indices of B entries near `geometry`.
    ///
    /// The envelope query is inflated by the radius. An entry is kept when the
    /// geometries are within `radius` of each other (the buffered-intersection
    /// predicate) or when their centroids are. The second test catches rings
    /// and hollow shapes whose centroid sits far from their edges.
    pub fn within(
        &self,
        geometry: &Geometry<f64>,
        centroid: Option<Point<f64>>,
        radius: f64,
    ) -> Vec<usize> {
        let Some(rect) = geometry.bounding_rect() else {
            return Vec::new();
        };

        let envelope = AABB::from_corners(
            [rect.min().x - radius, rect.min().y - radius],
            [rect.max().x + radius, rect.max().y + radius],
        );

        let centroids_close = |idx: usize| {
            match (centroid, self.centroids.get(idx).copied().flatten()) {
                (Some(ca), Some(cb)) => Euclidean.distance(ca, cb) <= radius,
                _ => false,
            }
        };

        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .filter(|idx| {
                centroids_close(*idx)
                    || Euclidean.distance(geometry, &self.geometries[*idx]) <= radius
            })
            .collect();

        hits.sort_unstable();
        hits
    }
}

/// Broad phase: every (a, b) whose geometries, or whose centroids, lie within
/// `radius` of each other.
///
/// Both sides must already be in the same metric projection, with centroids
/// computed from the projected geometries. Output is sorted by (a, b).
pub fn find_candidates(
    a: &[Geometry<f64>],
    a_centroids: &[Option<Point<f64>>],
    b: &[Geometry<f64>],
    b_centroids: &[Option<Point<f64>>],
    radius: f64,
) -> Vec<CandidatePair> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let index = CandidateIndex::build(b, b_centroids);

    let per_a: Vec<Vec<CandidatePair>> = a
        .par_iter()
        .enumerate()
        .map(|(a_idx, geometry)| {
            let centroid = a_centroids.get(a_idx).copied().flatten();
            index
                .within(geometry, centroid, radius)
                .into_iter()
                .map(|b_idx| CandidatePair { a: a_idx, b: b_idx })
                .collect()
        })
        .collect();

    per_a.into_iter().flatten().collect()
}
