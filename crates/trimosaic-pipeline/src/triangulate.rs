//! Delaunay triangulation of a frame's point set, with point location.
//!
//! Built on [`spade`], using its hierarchy hint generator so point
//! location is logarithmic in the number of vertices rather than a scan
//! over triangles.  Triangles are exposed as index triples into the
//! [`PointSet`] they were built from.
//!
//! Degenerate input (fewer than three distinct points, or all points on
//! one line) produces a triangulation with no triangles.  That is not an
//! error: the frame simply renders blank.

use std::fmt;

use spade::handles::FixedVertexHandle;
use spade::{
    DelaunayTriangulation, HasPosition, HierarchyHintGenerator, Point2, PositionInTriangulation,
    Triangulation as _,
};

use crate::types::{Dimensions, Point, SamplePoint};

/// The points participating in one frame: the four image anchors
/// followed by a prefix of the sample pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    points: Vec<Point>,
    sampled: usize,
}

impl PointSet {
    /// Anchors of `dimensions` followed by `samples` in order.
    #[must_use]
    pub fn new(dimensions: Dimensions, samples: &[SamplePoint]) -> Self {
        let mut points = Vec::with_capacity(4 + samples.len());
        points.extend(dimensions.anchors());
        points.extend(samples.iter().map(|s| s.position()));
        Self {
            points,
            sampled: samples.len(),
        }
    }

    /// Build a point set from arbitrary points (no anchors added).
    #[must_use]
    pub const fn from_points(points: Vec<Point>) -> Self {
        Self { points, sampled: 0 }
    }

    /// All points, anchors first.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points including anchors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the set holds no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of sampled (non-anchor) points.
    #[must_use]
    pub const fn sampled_count(&self) -> usize {
        self.sampled
    }
}

/// Vertex payload: position plus the index of the point in its set.
#[derive(Debug, Clone, Copy)]
struct Site {
    position: Point2<f64>,
    index: usize,
}

impl HasPosition for Site {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

type Delaunay = DelaunayTriangulation<Site, (), (), (), HierarchyHintGenerator<f64>>;

/// A Delaunay triangulation over a [`PointSet`].
pub struct Triangulation {
    delaunay: Delaunay,
    points: Vec<Point>,
    triangles: Vec<[usize; 3]>,
    /// Maps spade's face index to our triangle index.
    face_slots: Vec<Option<usize>>,
}

impl fmt::Debug for Triangulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Triangulation")
            .field("points", &self.points.len())
            .field("vertices", &self.delaunay.num_vertices())
            .field("triangles", &self.triangles.len())
            .finish_non_exhaustive()
    }
}

impl Triangulation {
    /// Triangulate `points`.
    ///
    /// Points sharing a position with an earlier point are inserted once;
    /// triangles refer to the earliest index at that position.
    #[must_use]
    #[tracing::instrument(skip(points), fields(points = points.len()))]
    pub fn build(points: &PointSet) -> Self {
        let mut delaunay = Delaunay::new();
        for (index, p) in points.points().iter().enumerate() {
            let position = Point2::new(p.x, p.y);
            if delaunay.locate_vertex(position).is_some() {
                continue;
            }
            if let Err(err) = delaunay.insert(Site { position, index }) {
                tracing::warn!(index, x = p.x, y = p.y, ?err, "skipping point rejected by triangulation");
            }
        }

        let mut face_slots = vec![None; delaunay.num_all_faces()];
        let mut triangles = Vec::with_capacity(delaunay.num_inner_faces());
        for face in delaunay.inner_faces() {
            if let Some(slot) = face_slots.get_mut(face.fix().index()) {
                *slot = Some(triangles.len());
            }
            triangles.push(face.vertices().map(|v| v.data().index));
        }

        if triangles.is_empty() {
            tracing::debug!(
                vertices = delaunay.num_vertices(),
                "degenerate point set, no triangles"
            );
        }

        Self {
            delaunay,
            points: points.points().to_vec(),
            triangles,
            face_slots,
        }
    }

    /// Triangles as counter-clockwise index triples into the point set.
    #[must_use]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Number of triangles.
    #[must_use]
    pub const fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Returns `true` if the triangulation has no triangles.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Number of distinct vertices actually inserted.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.delaunay.num_vertices()
    }

    /// The point set the triangulation was built from.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Corner positions of triangle `index`.
    #[must_use]
    pub fn triangle_points(&self, index: usize) -> Option<[Point; 3]> {
        let [a, b, c] = *self.triangles.get(index)?;
        Some([
            *self.points.get(a)?,
            *self.points.get(b)?,
            *self.points.get(c)?,
        ])
    }

    /// Index of the triangle containing `point`, or `None` outside the
    /// convex hull.
    ///
    /// Triangles are closed: points on the hull boundary are inside, and a
    /// point on an edge or vertex shared by several triangles resolves to
    /// the lowest triangle index among them.
    #[must_use]
    pub fn locate(&self, point: Point) -> Option<usize> {
        self.resolve(&self.delaunay.locate(Point2::new(point.x, point.y)))
    }

    /// A cursor for many nearby queries, such as a scanline.
    #[must_use]
    pub const fn locator(&self) -> Locator<'_> {
        Locator {
            triangulation: self,
            hint: None,
        }
    }

    fn slot(&self, face_index: usize) -> Option<usize> {
        self.face_slots.get(face_index).copied().flatten()
    }

    fn resolve(&self, position: &PositionInTriangulation) -> Option<usize> {
        match position {
            PositionInTriangulation::OnFace(face) => self.slot(face.index()),
            PositionInTriangulation::OnEdge(edge) => {
                let edge = self.delaunay.directed_edge(*edge);
                [edge, edge.rev()]
                    .into_iter()
                    .filter_map(|e| e.face().as_inner())
                    .filter_map(|f| self.slot(f.fix().index()))
                    .min()
            }
            PositionInTriangulation::OnVertex(vertex) => self
                .delaunay
                .vertex(*vertex)
                .out_edges()
                .filter_map(|e| e.face().as_inner())
                .filter_map(|f| self.slot(f.fix().index()))
                .min(),
            _ => None,
        }
    }

    fn hint_for(&self, position: &PositionInTriangulation) -> Option<FixedVertexHandle> {
        match position {
            PositionInTriangulation::OnFace(face) => {
                Some(self.delaunay.face(*face).vertices()[0].fix())
            }
            PositionInTriangulation::OnEdge(edge)
            | PositionInTriangulation::OutsideOfConvexHull(edge) => {
                Some(self.delaunay.directed_edge(*edge).from().fix())
            }
            PositionInTriangulation::OnVertex(vertex) => Some(*vertex),
            _ => None,
        }
    }
}

/// Point-location cursor that starts each walk from the previous hit.
///
/// Consecutive queries at neighboring coordinates finish in a few steps.
pub struct Locator<'a> {
    triangulation: &'a Triangulation,
    hint: Option<FixedVertexHandle>,
}

impl Locator<'_> {
    /// Same result as [`Triangulation::locate`].
    pub fn locate(&mut self, point: Point) -> Option<usize> {
        let target = Point2::new(point.x, point.y);
        let delaunay = &self.triangulation.delaunay;
        let position = match self.hint {
            Some(hint) => delaunay.locate_with_hint(target, hint),
            None => delaunay.locate(target),
        };
        if let Some(hint) = self.triangulation.hint_for(&position) {
            self.hint = Some(hint);
        }
        self.triangulation.resolve(&position)
    }
}
