//! Bounding box index over catalog features.

use geo::BoundingRect;
use geosampler_datatypes::primitives::BoundingBox2D;
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, warn};

use crate::catalog::CatalogFeature;

#[derive(Debug, Clone, PartialEq)]
struct IndexEntry {
    envelope: AABB<[f64; 2]>,
    position: usize,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn to_envelope(bbox: &BoundingBox2D) -> AABB<[f64; 2]> {
    AABB::from_corners(bbox.lower_left().into(), bbox.upper_right().into())
}

/// Query state owned by one thread.
///
/// Every worker querying the index concurrently creates its own context and drops it when done.
#[derive(Debug, Default)]
pub struct IndexContext {
    hits: Vec<usize>,
    queries: usize,
    total_hits: usize,
}

impl IndexContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> usize {
        self.queries
    }

    pub fn total_hits(&self) -> usize {
        self.total_hits
    }
}

/// An R-tree over the bounding boxes of catalog features.
///
/// The index keeps its own copy of every inserted feature. Query results refer to these copies and
/// can optionally be sorted by insertion order.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    tree: Option<RTree<IndexEntry>>,
    features: Vec<CatalogFeature>,
    sort_by_index: bool,
}

impl SpatialIndex {
    pub fn new(sort_by_index: bool) -> Self {
        Self {
            tree: None,
            features: Vec::new(),
            sort_by_index,
        }
    }

    pub fn set_sort_by_index(&mut self, sort_by_index: bool) {
        self.sort_by_index = sort_by_index;
    }

    /// Inserts a copy of `feature`. Returns `false` if the feature has no bounding box.
    pub fn insert(&mut self, feature: &CatalogFeature) -> bool {
        let Some(bbox) = feature.bbox() else {
            warn!("Feature {} has no bounding box, skipping it", feature.id);
            return false;
        };

        let entry = IndexEntry {
            envelope: to_envelope(&bbox),
            position: self.features.len(),
        };

        self.features.push(feature.clone());
        self.tree.get_or_insert_with(RTree::new).insert(entry);

        debug_assert_eq!(self.features.len(), self.entry_count());
        true
    }

    /// Replaces the index content with `features`, loading the tree in one go.
    /// Returns the number of features that were indexed.
    pub fn bulk_load<'f, I>(&mut self, features: I) -> usize
    where
        I: IntoIterator<Item = &'f CatalogFeature>,
    {
        self.clear();

        let mut entries = Vec::new();
        for feature in features {
            let Some(bbox) = feature.bbox() else {
                warn!("Feature {} has no bounding box, skipping it", feature.id);
                continue;
            };

            entries.push(IndexEntry {
                envelope: to_envelope(&bbox),
                position: self.features.len(),
            });
            self.features.push(feature.clone());
        }

        let count = entries.len();
        self.tree = Some(RTree::bulk_load(entries));

        debug!("Indexed {count} features");
        count
    }

    /// All features whose bounding box intersects `envelope`.
    pub fn query(&self, envelope: &BoundingBox2D) -> Vec<&CatalogFeature> {
        let mut context = IndexContext::new();
        self.query_with(&mut context, envelope)
    }

    /// All features whose bounding box intersects the bounding box of `geometry`.
    pub fn query_geometry(&self, geometry: &geo::Geometry<f64>) -> Vec<&CatalogFeature> {
        match geometry.bounding_rect() {
            Some(rect) => self.query(&BoundingBox2D::from(rect)),
            None => Vec::new(),
        }
    }

    /// Like [`SpatialIndex::query`] but using the caller's context.
    pub fn query_with<'i>(
        &'i self,
        context: &mut IndexContext,
        envelope: &BoundingBox2D,
    ) -> Vec<&'i CatalogFeature> {
        self.query_positions_with(context, envelope)
            .into_iter()
            .map(|(_, feature)| feature)
            .collect()
    }

    /// Like [`SpatialIndex::query_with`], paired with each feature's insertion position.
    ///
    /// Positions are unique within the index even if feature ids are not.
    pub fn query_positions_with<'i>(
        &'i self,
        context: &mut IndexContext,
        envelope: &BoundingBox2D,
    ) -> Vec<(usize, &'i CatalogFeature)> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };

        context.hits.clear();
        context.hits.extend(
            tree.locate_in_envelope_intersecting(&to_envelope(envelope))
                .map(|entry| entry.position),
        );

        if self.sort_by_index {
            context.hits.sort_unstable();
        }

        context.queries += 1;
        context.total_hits += context.hits.len();

        context
            .hits
            .iter()
            .filter_map(|&position| {
                self.features
                    .get(position)
                    .map(|feature| (position, feature))
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.tree = None;
        self.features.clear();
    }

    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.features.len(), self.entry_count());
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Number of entries in the tree, always equal to [`SpatialIndex::len`].
    pub fn entry_count(&self) -> usize {
        self.tree.as_ref().map_or(0, RTree::size)
    }

    pub fn features(&self) -> &[CatalogFeature] {
        &self.features
    }
}
