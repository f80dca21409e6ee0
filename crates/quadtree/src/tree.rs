//! Region quadtree over movable points.
//!
//! Each node owns a bounding box, a short list of points and, once it
//! overflows, four child quadrants. Points are owned by the tree but their
//! coordinates belong to the caller: after moving them through
//! [`QuadTree::for_each_point_mut`] the caller runs [`QuadTree::refresh`]
//! to put every point back under the node whose region contains it.

use crate::error::QuadTreeError;
use crate::geometry::{Bounds, Point, PointId};
use glam::Vec2;
use tracing::{debug, trace, warn};

/// Points a node holds before it subdivides.
pub const DEFAULT_CAPACITY: usize = 4;
/// Depth below which nodes stop subdividing and simply grow their list.
pub const DEFAULT_MAX_DEPTH: u32 = 24;

// north-east, north-west, south-east, south-west
type Quadrants<T> = Option<Box<[QuadTree<T>; 4]>>;

/// A quadtree node. The root is the whole index.
pub struct QuadTree<T> {
    bounds: Bounds,
    points: Vec<Point<T>>,
    capacity: usize,
    depth: u32,
    max_depth: u32,
    subdivided: bool,
    quadrants: Quadrants<T>,
}

impl<T> QuadTree<T> {
    /// Create an empty tree covering `bounds`.
    pub fn new(bounds: Bounds, capacity: usize) -> Result<Self, QuadTreeError> {
        Self::with_max_depth(bounds, capacity, DEFAULT_MAX_DEPTH)
    }

    /// Create an empty tree holding [`DEFAULT_CAPACITY`] points per node.
    pub fn with_default_capacity(bounds: Bounds) -> Self {
        Self::node(bounds, DEFAULT_CAPACITY, 0, DEFAULT_MAX_DEPTH)
    }

    /// Create an empty tree whose nodes stop subdividing at `max_depth`.
    pub fn with_max_depth(bounds: Bounds, capacity: usize, max_depth: u32) -> Result<Self, QuadTreeError> {
        if capacity == 0 {
            return Err(QuadTreeError::ZeroCapacity);
        }
        Ok(Self::node(bounds, capacity, 0, max_depth))
    }

    fn node(bounds: Bounds, capacity: usize, depth: u32, max_depth: u32) -> Self {
        Self {
            bounds,
            points: Vec::with_capacity(capacity),
            capacity,
            depth,
            max_depth,
            subdivided: false,
            quadrants: None,
        }
    }

    #[inline]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn is_subdivided(&self) -> bool {
        self.subdivided
    }

    /// Points stored directly in this node, not in its quadrants.
    #[inline]
    pub fn local_points(&self) -> &[Point<T>] {
        &self.points
    }

    /// The four quadrants (north-east, north-west, south-east, south-west), if created.
    #[inline]
    pub fn children(&self) -> Option<&[QuadTree<T>; 4]> {
        self.quadrants.as_deref()
    }

    fn quadrants_mut(&mut self) -> &mut [QuadTree<T>; 4] {
        match self.quadrants.as_deref_mut() {
            Some(quadrants) => quadrants,
            None => panic!(
                "quadtree node at {:?} (depth {}) is missing its quadrants",
                self.bounds, self.depth
            ),
        }
    }

    /// Insert a point. On failure the point is handed back: it lies
    /// outside this node's region.
    pub fn insert(&mut self, point: Point<T>) -> Result<(), Point<T>> {
        self.insert_impl(point, false)
    }

    /// Insert a point straight into the quadrants, skipping this node's list.
    ///
    /// # Panics
    ///
    /// Panics if the quadrants have not been created yet.
    pub fn insert_to_children(&mut self, point: Point<T>) -> Result<(), Point<T>> {
        self.insert_impl(point, true)
    }

    fn insert_impl(&mut self, point: Point<T>, force_to_child: bool) -> Result<(), Point<T>> {
        if !self.bounds.contains(&point) {
            return Err(point);
        }

        let mut point = point;
        if self.subdivided || force_to_child {
            match Self::insert_into_quadrants(self.quadrants_mut(), point) {
                Ok(()) => return Ok(()),
                Err(rejected) => point = rejected,
            }
        }

        // A subdivided node whose quadrants refused the point keeps it.
        if self.points.len() < self.capacity || self.subdivided || self.depth >= self.max_depth {
            self.points.push(point);
            return Ok(());
        }

        self.subdivide();
        self.insert_impl(point, false)
    }

    fn insert_into_quadrants(quadrants: &mut [QuadTree<T>; 4], mut point: Point<T>) -> Result<(), Point<T>> {
        for quadrant in quadrants.iter_mut() {
            match quadrant.insert_impl(point, false) {
                Ok(()) => return Ok(()),
                Err(rejected) => point = rejected,
            }
        }
        Err(point)
    }

    /// Split this node into four quadrants and push its points down.
    /// Does nothing if the node is already subdivided.
    pub fn subdivide(&mut self) {
        if self.subdivided {
            return;
        }

        if self.quadrants.is_none() {
            let (capacity, depth, max_depth) = (self.capacity, self.depth + 1, self.max_depth);
            let quadrants = self
                .bounds
                .quadrants()
                .map(|bounds| Self::node(bounds, capacity, depth, max_depth));
            self.quadrants = Some(Box::new(quadrants));
        }

        let pending = std::mem::take(&mut self.points);
        debug!(
            "Subdividing node at depth {} ({} points) {:?}",
            self.depth,
            pending.len(),
            self.bounds
        );
        for point in pending {
            if let Err(point) = self.insert_impl(point, true) {
                warn!(
                    "Point {:?} at {} lies outside the node it was stored in",
                    point.id(),
                    point.position
                );
                self.points.push(point);
            }
        }

        // Only flip the flag once the local list has been redistributed.
        self.subdivided = true;
    }

    /// Remove the point with the same identity as `point`.
    pub fn remove(&mut self, point: &Point<T>) -> Option<Point<T>> {
        self.remove_impl(point.id(), point.position, false)
    }

    /// Remove `point` from this node's own list only, ignoring the quadrants.
    pub fn remove_from_node(&mut self, point: &Point<T>) -> Option<Point<T>> {
        self.remove_impl(point.id(), point.position, true)
    }

    fn remove_impl(&mut self, id: PointId, position: Vec2, force_from_this: bool) -> Option<Point<T>> {
        if !self.bounds.contains(position) {
            return None;
        }

        if self.subdivided && !force_from_this {
            for quadrant in self.quadrants_mut().iter_mut() {
                if let Some(removed) = quadrant.remove_impl(id, position, false) {
                    return Some(removed);
                }
            }
        }

        let index = self.points.iter().position(|p| p.id() == id)?;
        Some(self.points.remove(index))
    }

    /// Re-home points whose coordinates changed since they were inserted.
    ///
    /// Returns the points that no longer fit anywhere under this node. At the
    /// root these have left the indexed universe; they are no longer stored.
    pub fn refresh(&mut self) -> Vec<Point<T>> {
        if self.subdivided {
            let mut pending = Vec::new();
            for quadrant in self.quadrants_mut().iter_mut() {
                pending.extend(quadrant.refresh());
            }
            pending.append(&mut self.points);

            let mut displaced = Vec::new();
            for point in pending {
                if let Err(point) = self.insert_impl(point, true) {
                    displaced.push(point);
                }
            }
            if !displaced.is_empty() {
                trace!(
                    "{} points left node at depth {} {:?}",
                    displaced.len(),
                    self.depth,
                    self.bounds
                );
            }
            return displaced;
        }

        let bounds = self.bounds;
        let (kept, displaced): (Vec<_>, Vec<_>) = std::mem::take(&mut self.points)
            .into_iter()
            .partition(|point| bounds.contains(point));
        self.points = kept;

        if self.points.len() >= self.capacity && self.depth < self.max_depth {
            self.subdivide();
        }
        displaced
    }

    /// Collect every point whose position lies inside `area`.
    pub fn query(&self, area: &Bounds) -> Vec<&Point<T>> {
        let mut found = Vec::new();
        self.query_into(area, &mut found);
        found
    }

    fn query_into<'a>(&'a self, area: &Bounds, out: &mut Vec<&'a Point<T>>) {
        if !self.bounds.intersects(area) {
            return;
        }

        out.extend(self.points.iter().filter(|point| area.contains(*point)));

        if let Some(quadrants) = &self.quadrants {
            for quadrant in quadrants.iter() {
                quadrant.query_into(area, out);
            }
        }
    }

    /// Find the point closest to `position`.
    ///
    /// Searches a `2 * half_width` by `2 * half_height` window centered on
    /// `position`, doubling it until something turns up. The nearest hit
    /// bounds the true distance, so a second square query of that radius
    /// holds every closer point. Ties go to the candidate found first.
    ///
    /// Returns `None` when `position` lies outside this node, the tree is
    /// empty, or the half extents are not positive and finite.
    pub fn find_closest(&self, half_width: f32, half_height: f32, position: impl Into<Vec2>) -> Option<&Point<T>> {
        let position = position.into();
        if !self.bounds.contains(position) || self.is_empty() {
            return None;
        }
        if !(half_width > 0.0 && half_height > 0.0) {
            debug!("find_closest called with empty window {}x{}", half_width, half_height);
            return None;
        }

        let (mut half_width, mut half_height) = (half_width, half_height);
        let candidates = loop {
            let window = Bounds::from_center(position, half_width, half_height).ok()?;
            let candidates = self.query(&window);
            if !candidates.is_empty() {
                break candidates;
            }
            if window.covers(&self.bounds) {
                // Only reachable if a stored point escaped its node.
                warn!("find_closest found nothing around {} in a non-empty tree", position);
                return None;
            }
            half_width *= 2.0;
            half_height *= 2.0;
        };

        let nearest = Self::nearest_of(candidates.iter().copied(), position)?;
        let radius = nearest.squared_distance_to(position).sqrt();
        // Pad the radius so rounding in sqrt cannot drop the current best.
        let radius = radius + radius * 1e-4 + f32::EPSILON;
        let Ok(circle_box) = Bounds::from_center(position, radius, radius) else {
            return Some(nearest);
        };
        Self::nearest_of(self.query(&circle_box).into_iter(), position).or(Some(nearest))
    }

    fn nearest_of<'a>(candidates: impl Iterator<Item = &'a Point<T>>, position: Vec2) -> Option<&'a Point<T>> {
        let mut closest: Option<(&Point<T>, f32)> = None;
        for candidate in candidates {
            let distance = candidate.squared_distance_to(position);
            match closest {
                Some((_, best)) if distance >= best => {}
                _ => closest = Some((candidate, distance)),
            }
        }
        closest.map(|(point, _)| point)
    }

    /// Every point stored under this node.
    pub fn all_points(&self) -> Vec<&Point<T>> {
        let mut all = Vec::with_capacity(self.len());
        self.collect_into(&mut all);
        all
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Point<T>>) {
        out.extend(self.points.iter());
        if let Some(quadrants) = &self.quadrants {
            for quadrant in quadrants.iter() {
                quadrant.collect_into(out);
            }
        }
    }

    /// Number of points stored under this node.
    pub fn len(&self) -> usize {
        let nested = self
            .quadrants
            .as_deref()
            .map_or(0, |quadrants| quadrants.iter().map(QuadTree::len).sum::<usize>());
        self.points.len() + nested
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every stored point mutably, e.g. to copy in new positions
    /// before calling [`QuadTree::refresh`].
    pub fn for_each_point_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Point<T>),
    {
        self.visit_mut(&mut f);
    }

    fn visit_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Point<T>),
    {
        self.points.iter_mut().for_each(&mut *f);
        if let Some(quadrants) = self.quadrants.as_deref_mut() {
            for quadrant in quadrants.iter_mut() {
                quadrant.visit_mut(f);
            }
        }
    }
}

impl<T> std::fmt::Debug for QuadTree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadTree")
            .field("bounds", &self.bounds)
            .field("depth", &self.depth)
            .field("local", &self.points.len())
            .field("total", &self.len())
            .field("subdivided", &self.subdivided)
            .finish()
    }
}
