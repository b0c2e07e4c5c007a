//! Ruled-line table detection.
//!
//! Tables are recovered from the page's straight horizontal and vertical
//! strokes: edges are snapped and joined to close small gaps, their
//! intersections become cell corners, and cells sharing corners form tables.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::BBox;

use super::content::Segment;
use super::layout::Word;

/// Segments closer to axis-aligned than this count as straight.
const AXIS_TOLERANCE: f32 = 0.5;

/// Ruled-line detection thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeConfig {
    /// Parallel edges within this distance are snapped to one line
    pub snap_tolerance: f32,
    /// Collinear edges with gaps up to this size are joined
    pub join_tolerance: f32,
    /// Edges shorter than this after merging are ignored
    pub edge_min_length: f32,
    /// Slack when testing whether two edges cross
    pub intersection_tolerance: f32,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 8.0,
            join_tolerance: 8.0,
            edge_min_length: 3.0,
            intersection_tolerance: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned ruling line in top-left page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub orientation: Orientation,
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

impl Edge {
    pub fn horizontal(x0: f32, x1: f32, y: f32) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            x0: x0.min(x1),
            top: y,
            x1: x0.max(x1),
            bottom: y,
        }
    }

    pub fn vertical(x: f32, top: f32, bottom: f32) -> Self {
        Self {
            orientation: Orientation::Vertical,
            x0: x,
            top: top.min(bottom),
            x1: x,
            bottom: top.max(bottom),
        }
    }

    pub fn length(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.x1 - self.x0,
            Orientation::Vertical => self.bottom - self.top,
        }
    }
}

/// Straight horizontal and vertical edges among painted segments.
pub fn edges_from_segments(segments: &[Segment]) -> Vec<Edge> {
    segments
        .iter()
        .filter_map(|s| {
            if (s.y1 - s.y2).abs() <= AXIS_TOLERANCE && (s.x1 - s.x2).abs() > 0.0 {
                Some(Edge::horizontal(s.x1, s.x2, (s.y1 + s.y2) / 2.0))
            } else if (s.x1 - s.x2).abs() <= AXIS_TOLERANCE && (s.y1 - s.y2).abs() > 0.0 {
                Some(Edge::vertical((s.x1 + s.x2) / 2.0, s.y1, s.y2))
            } else {
                None
            }
        })
        .collect()
}

/// A table found from ruling lines.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeTable {
    pub bbox: BBox,
    pub cells: Vec<BBox>,
}

impl LatticeTable {
    /// Cell grid: distinct cell tops by distinct cell lefts, `None` where no cell starts.
    pub fn grid(&self) -> Vec<Vec<Option<BBox>>> {
        let tops = distinct(self.cells.iter().map(|c| c.top));
        let lefts = distinct(self.cells.iter().map(|c| c.x0));

        tops.iter()
            .map(|&top| {
                lefts
                    .iter()
                    .map(|&x0| {
                        self.cells
                            .iter()
                            .find(|c| c.top == top && c.x0 == x0)
                            .copied()
                    })
                    .collect()
            })
            .collect()
    }

    /// Grid of cell texts built from the words whose centers fall in each cell.
    pub fn extract(&self, words: &[Word]) -> Vec<Vec<Option<String>>> {
        self.grid()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.map(|bbox| cell_text(&bbox, words)))
                    .collect()
            })
            .collect()
    }
}

fn distinct(values: impl Iterator<Item = f32>) -> Vec<f32> {
    let mut v: Vec<f32> = values.collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v.dedup();
    v
}

fn cell_text(cell: &BBox, words: &[Word]) -> String {
    let mut inside: Vec<&Word> = words
        .iter()
        .filter(|w| {
            let (cx, cy) = w.bbox.center();
            cell.contains_point(cx, cy, 0.0)
        })
        .collect();
    inside.sort_by(|a, b| {
        a.bbox
            .top
            .partial_cmp(&b.bbox.top)
            .unwrap_or(Ordering::Equal)
            .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<Vec<&str>> = Vec::new();
    let mut line_top: Option<f32> = None;
    for word in inside {
        match line_top {
            Some(top) if (word.bbox.top - top).abs() <= 3.0 => {
                if let Some(line) = lines.last_mut() {
                    line.push(&word.text);
                }
            }
            _ => {
                line_top = Some(word.bbox.top);
                lines.push(vec![&word.text]);
            }
        }
    }

    lines
        .iter()
        .map(|l| l.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Finds tables formed by ruling lines.
#[derive(Debug, Clone, Default)]
pub struct LatticeFinder {
    config: LatticeConfig,
}

impl LatticeFinder {
    pub fn new(config: LatticeConfig) -> Self {
        Self { config }
    }

    /// Snap, join and length-filter raw edges.
    pub fn merge_edges(&self, edges: &[Edge]) -> Vec<Edge> {
        let (mut horizontal, mut vertical): (Vec<Edge>, Vec<Edge>) = edges
            .iter()
            .copied()
            .partition(|e| e.orientation == Orientation::Horizontal);

        snap(&mut horizontal, self.config.snap_tolerance, |e| e.top, |e, v| {
            e.top = v;
            e.bottom = v;
        });
        snap(&mut vertical, self.config.snap_tolerance, |e| e.x0, |e, v| {
            e.x0 = v;
            e.x1 = v;
        });

        let mut merged = join(horizontal, self.config.join_tolerance);
        merged.extend(join(vertical, self.config.join_tolerance));
        merged.retain(|e| e.length() >= self.config.edge_min_length);
        merged
    }

    /// Find all tables with at least two cells.
    pub fn find_tables(&self, edges: &[Edge]) -> Vec<LatticeTable> {
        let edges = self.merge_edges(edges);
        let intersections = self.intersections(&edges);
        let cells = cells_from_intersections(&intersections);
        let tables = tables_from_cells(cells);
        log::debug!(
            "Lattice: {} edges, {} intersections, {} tables",
            edges.len(),
            intersections.len(),
            tables.len()
        );
        tables
    }

    fn intersections(&self, edges: &[Edge]) -> BTreeMap<Point, Crossing> {
        let tol = self.config.intersection_tolerance;
        let mut points: BTreeMap<Point, Crossing> = BTreeMap::new();

        for (vi, v) in edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.orientation == Orientation::Vertical)
        {
            for (hi, h) in edges
                .iter()
                .enumerate()
                .filter(|(_, e)| e.orientation == Orientation::Horizontal)
            {
                if v.top <= h.top + tol
                    && v.bottom >= h.top - tol
                    && v.x0 >= h.x0 - tol
                    && v.x0 <= h.x1 + tol
                {
                    let crossing = points.entry(Point::new(v.x0, h.top)).or_default();
                    crossing.vertical.insert(vi);
                    crossing.horizontal.insert(hi);
                }
            }
        }

        points
    }
}

/// Group values within `tolerance` of their neighbors and move each member to the group mean.
fn snap(
    edges: &mut [Edge],
    tolerance: f32,
    key: impl Fn(&Edge) -> f32,
    set: impl Fn(&mut Edge, f32),
) {
    edges.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));

    let mut start = 0;
    while start < edges.len() {
        let mut end = start + 1;
        while end < edges.len() && key(&edges[end]) - key(&edges[end - 1]) <= tolerance {
            end += 1;
        }
        let mean = edges[start..end].iter().map(&key).sum::<f32>() / (end - start) as f32;
        for edge in &mut edges[start..end] {
            set(edge, mean);
        }
        start = end;
    }
}

/// (line position, start, end) of an edge along its own axis.
fn extent(e: &Edge) -> (f32, f32, f32) {
    match e.orientation {
        Orientation::Horizontal => (e.top, e.x0, e.x1),
        Orientation::Vertical => (e.x0, e.top, e.bottom),
    }
}

/// Join collinear edges whose gaps do not exceed `tolerance`.
fn join(mut edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    edges.sort_by(|a, b| {
        let (la, sa, _) = extent(a);
        let (lb, sb, _) = extent(b);
        la.partial_cmp(&lb)
            .unwrap_or(Ordering::Equal)
            .then(sa.partial_cmp(&sb).unwrap_or(Ordering::Equal))
    });

    let mut joined: Vec<Edge> = Vec::new();
    for edge in edges {
        if let Some(last) = joined.last_mut() {
            let (last_line, _, last_end) = extent(last);
            let (line, start, end) = extent(&edge);
            if last_line == line && start <= last_end + tolerance {
                match last.orientation {
                    Orientation::Horizontal => last.x1 = last_end.max(end),
                    Orientation::Vertical => last.bottom = last_end.max(end),
                }
                continue;
            }
        }
        joined.push(edge);
    }
    joined
}

/// Intersection point keyed for ordered lookups (hundredths of a point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Point {
    y: i64,
    x: i64,
}

impl Point {
    fn new(x: f32, y: f32) -> Self {
        Self {
            x: (x * 100.0).round() as i64,
            y: (y * 100.0).round() as i64,
        }
    }

    fn x(&self) -> f32 {
        self.x as f32 / 100.0
    }

    fn y(&self) -> f32 {
        self.y as f32 / 100.0
    }
}

/// Edges passing through an intersection.
#[derive(Debug, Clone, Default)]
struct Crossing {
    vertical: BTreeSet<usize>,
    horizontal: BTreeSet<usize>,
}

fn shares_vertical(a: &Crossing, b: &Crossing) -> bool {
    !a.vertical.is_disjoint(&b.vertical)
}

fn shares_horizontal(a: &Crossing, b: &Crossing) -> bool {
    !a.horizontal.is_disjoint(&b.horizontal)
}

/// For each corner, the smallest rectangle whose four sides are ruled.
fn cells_from_intersections(points: &BTreeMap<Point, Crossing>) -> Vec<BBox> {
    let keys: Vec<Point> = points.keys().copied().collect();
    let mut cells = Vec::new();

    for (i, &top_left) in keys.iter().enumerate() {
        let tl = &points[&top_left];
        let rest = &keys[i + 1..];

        let below: Vec<Point> = rest
            .iter()
            .filter(|p| p.x == top_left.x && p.y > top_left.y)
            .copied()
            .collect();
        let right: Vec<Point> = rest
            .iter()
            .filter(|p| p.y == top_left.y && p.x > top_left.x)
            .copied()
            .collect();

        'search: for b in below.iter().filter(|b| shares_vertical(tl, &points[*b])) {
            for r in right.iter().filter(|r| shares_horizontal(tl, &points[*r])) {
                let corner = Point { x: r.x, y: b.y };
                if let Some(br) = points.get(&corner) {
                    if shares_horizontal(br, &points[b]) && shares_vertical(br, &points[r]) {
                        cells.push(BBox::new(top_left.x(), top_left.y(), corner.x(), corner.y()));
                        break 'search;
                    }
                }
            }
        }
    }

    cells
}

/// Union cells that share a corner; keep groups of two or more cells.
fn tables_from_cells(cells: Vec<BBox>) -> Vec<LatticeTable> {
    let mut parent: Vec<usize> = (0..cells.len()).collect();

    fn find(parent: &mut [usize], i: usize) -> usize {
        let mut root = i;
        while parent[root] != root {
            root = parent[root];
        }
        let mut node = i;
        while parent[node] != root {
            let next = parent[node];
            parent[node] = root;
            node = next;
        }
        root
    }

    let mut corner_owner: HashMap<Point, usize> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let corners = [
            Point::new(cell.x0, cell.top),
            Point::new(cell.x1, cell.top),
            Point::new(cell.x0, cell.bottom),
            Point::new(cell.x1, cell.bottom),
        ];
        for corner in corners {
            match corner_owner.get(&corner) {
                Some(&other) => {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, other));
                    if a != b {
                        parent[a.max(b)] = a.min(b);
                    }
                }
                None => {
                    corner_owner.insert(corner, i);
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<BBox>> = BTreeMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(*cell);
    }

    let mut tables: Vec<LatticeTable> = groups
        .into_values()
        .filter(|g| g.len() > 1)
        .filter_map(|cells| {
            let bbox = cells.iter().copied().reduce(|a, b| a.union(&b))?;
            Some(LatticeTable { bbox, cells })
        })
        .collect();

    tables.sort_by(|a, b| {
        a.bbox
            .top
            .partial_cmp(&b.bbox.top)
            .unwrap_or(Ordering::Equal)
            .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
    });
    tables
}
