//! Rectilinear polygon on the rational grid.
//!
//! A `Polygon` is an ordered vertex sequence whose coordinates are integers
//! under one shared power-of-two denominator. Construction keeps it free of
//! collinear runs (`push` collapses them on the fly, `trim_closing_run`
//! handles the seam), and the tracer only ever emits horizontal and vertical
//! edges, so a *valid* polygon is closed, axis-aligned, and collinear-free.
//! Those invariants are re-checked independently by quality control.

use kurbo::Rect;
use log::warn;

/// Padding applied to the incremental bounding box, in grid units. The
/// padded box is a pruning aid for point queries, not a tight bound.
const BBOX_PAD: i64 = 8;

/// Tolerance band of the y-scanline skip index. Edges whose y-span misses
/// the prepared row by more than this are skipped during point tests;
/// admitting a few extra edges is harmless, missing one would not be.
const SCAN_BUFFER: i64 = 2;

#[derive(Debug, Clone)]
pub struct Polygon {
    /// Vertices as rational-grid coordinates; first equals last once closed.
    pub vertices: Vec<(i64, i64)>,
    /// Shared denominator under which the vertices are exact rationals.
    pub denominator: i64,
    /// Plane window the polygon was constructed over.
    pub window: Rect,
    xmin: i64,
    xmax: i64,
    ymin: i64,
    ymax: i64,
    /// Jump list over vertex indices for one prepared scanline, ending in a
    /// past-the-end sentinel. `None` when no row is prepared.
    scan: Option<Vec<usize>>,
}

impl Polygon {
    pub fn new(denominator: i64, window: Rect) -> Self {
        Self {
            vertices: Vec::new(),
            denominator,
            window,
            xmin: 0,
            xmax: 0,
            ymin: 0,
            ymax: 0,
            scan: None,
        }
    }

    /// Rebuild a polygon from an already-compressed vertex list (loading).
    pub fn from_vertices(vertices: Vec<(i64, i64)>, denominator: i64, window: Rect) -> Self {
        let mut pg = Self::new(denominator, window);
        for (i, &(x, y)) in vertices.iter().enumerate() {
            pg.grow_bbox(i == 0, x, y);
        }
        pg.vertices = vertices;
        pg
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    fn grow_bbox(&mut self, first: bool, x: i64, y: i64) {
        if first {
            self.xmin = x;
            self.xmax = x;
            self.ymin = y;
            self.ymax = y;
        } else {
            self.xmin = self.xmin.min(x - BBOX_PAD);
            self.xmax = self.xmax.max(x + BBOX_PAD);
            self.ymin = self.ymin.min(y - BBOX_PAD);
            self.ymax = self.ymax.max(y + BBOX_PAD);
        }
    }

    /// Whether `(x, y)` lies inside the padded bounding box.
    pub fn bbox_contains(&self, x: i64, y: i64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// Append a vertex, collapsing collinear runs as they form.
    ///
    /// If the new vertex continues the line through the previous two, the
    /// middle one is replaced instead of a third being appended, so three
    /// collinear consecutive additions leave only the endpoints.
    pub fn push(&mut self, x: i64, y: i64) {
        self.grow_bbox(self.vertices.is_empty(), x, y);

        let n = self.vertices.len();
        if n >= 2 {
            let a = self.vertices[n - 2];
            let b = self.vertices[n - 1];
            if (x == b.0 && x == a.0) || (y == b.1 && y == a.1) {
                self.vertices[n - 1] = (x, y);
                return;
            }
        }
        self.vertices.push((x, y));
    }

    /// Trim collinear runs that straddle the closing vertex.
    ///
    /// The per-push compression cannot see across the seam. While the start
    /// vertex lies mid-segment between its two neighbors, drop the duplicate
    /// closing vertex and re-anchor the seam one vertex earlier.
    pub fn trim_closing_run(&mut self) {
        while self.vertices.len() >= 3 {
            let n = self.vertices.len();
            let first = self.vertices[0];
            let second = self.vertices[1];
            let before_close = self.vertices[n - 2];
            let collinear = (first.0 == second.0 && first.0 == before_close.0)
                || (first.1 == second.1 && first.1 == before_close.1);
            if !collinear {
                break;
            }
            self.vertices.pop();
            let seam = self.vertices[self.vertices.len() - 1];
            self.vertices[0] = seam;
        }

        if self.vertices.len() <= 3 {
            warn!(
                "closing-run trim left a degenerate polygon of {} vertices",
                self.vertices.len()
            );
        }
    }

    /// First vertex equals last.
    pub fn is_closed(&self) -> bool {
        match (self.vertices.first(), self.vertices.last()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// No three consecutive vertices collinear, including across the seam.
    pub fn is_colinear_free(&self) -> bool {
        let v = &self.vertices;
        let n = v.len();
        for i in 2..n {
            if (v[i - 2].0 == v[i].0 && v[i - 1].0 == v[i].0)
                || (v[i - 2].1 == v[i].1 && v[i - 1].1 == v[i].1)
            {
                return false;
            }
        }
        if n >= 3 {
            // wraparound triple: last real vertex, seam, second vertex
            if (v[n - 2].0 == v[1].0 && v[0].0 == v[1].0)
                || (v[n - 2].1 == v[1].1 && v[0].1 == v[1].1)
            {
                return false;
            }
        }
        true
    }

    /// Every edge is purely horizontal or purely vertical.
    pub fn is_diagonal_free(&self) -> bool {
        self.vertices
            .windows(2)
            .all(|w| w[0].0 == w[1].0 || w[0].1 == w[1].1)
    }

    /// Prepare the scanline skip index for row `y` (grid coordinates).
    ///
    /// Point tests afterwards only visit edges whose y-span can plausibly
    /// intersect the row, within a ±`SCAN_BUFFER` band. The index never
    /// changes a verdict, only the set of edges scanned.
    pub fn prepare_y(&mut self, y: i64) {
        let n = self.vertices.len();
        let sentinel = n + 16;
        let mut scan = vec![sentinel; n.max(1)];
        let mut last: Option<usize> = None;

        for i in 1..n {
            let a = self.vertices[i - 1].1;
            let b = self.vertices[i].1;
            let relevant = (a <= y + SCAN_BUFFER && b >= y - SCAN_BUFFER)
                || (a >= y - SCAN_BUFFER && b <= y + SCAN_BUFFER);
            if relevant {
                scan[last.unwrap_or(0)] = i;
                last = Some(i);
            }
        }

        // chain ends past the polygon; an empty chain starts there too
        if let Some(last) = last {
            scan[last] = sentinel;
        }
        self.scan = Some(scan);
    }

    /// Drop the prepared scanline index.
    pub fn unprepare_y(&mut self) {
        self.scan = None;
    }

    /// Next vertex index to visit after `i`: the prepared jump when a row is
    /// prepared, the plain successor otherwise.
    #[inline]
    pub fn scan_jump(&self, i: usize) -> usize {
        match &self.scan {
            Some(scan) => scan[i],
            None => i + 1,
        }
    }
}
