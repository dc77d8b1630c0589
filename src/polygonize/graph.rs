//! Vertex/edge graph refined by the active contour and skeleton models.
//!
//! Polygons are split into rings of node indices. In a dense (ACM) graph every
//! contour vertex is its own node; in a skeleton (ASM) graph rings are
//! decimated and nearby vertices of different rings share a junction node, so
//! the buildings they belong to move together.
use crate::angle::turn_angle;
use geo::{Coord, LineString, Polygon, Simplify};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One ring of the graph, expressed as a cycle of node indices.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphRing {
    /// Index of the polygon the ring belongs to in the input order.
    pub polygon: usize,
    pub is_hole: bool,
    pub nodes: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContourGraph {
    pub nodes: Vec<[f64; 2]>,
    /// Undirected, deduplicated edges.
    pub edges: Vec<[usize; 2]>,
    pub rings: Vec<GraphRing>,
}

impl ContourGraph {
    /// Dense graph: every ring vertex becomes a node, nothing is shared.
    pub fn from_polygons(polygons: &[Polygon<f64>]) -> Self {
        let mut nodes = Vec::new();
        let mut rings = Vec::new();
        for (pi, poly) in polygons.iter().enumerate() {
            for (ri, ring) in rings_of(poly).enumerate() {
                let pts = open_coords(ring);
                if pts.len() < 3 {
                    continue;
                }
                let base = nodes.len();
                nodes.extend(pts);
                rings.push(GraphRing {
                    polygon: pi,
                    is_hole: ri > 0,
                    nodes: (base..nodes.len()).collect(),
                });
            }
        }
        Self::from_rings(nodes, rings)
    }

    /// Skeleton graph: rings reduced to at most `budget` vertices, then
    /// vertices of different rings within `junction_snap` merged.
    pub fn skeleton(
        polygons: &[Polygon<f64>],
        tolerance: f64,
        budget: usize,
        junction_snap: f64,
    ) -> Self {
        let mut reduced: Vec<(usize, bool, Vec<[f64; 2]>)> = Vec::new();
        for (pi, poly) in polygons.iter().enumerate() {
            for (ri, ring) in rings_of(poly).enumerate() {
                if let Some(pts) = reduce_ring(ring, tolerance, budget) {
                    reduced.push((pi, ri > 0, pts));
                }
            }
        }

        let mut snapper = JunctionSnapper::new(junction_snap);
        let mut rings = Vec::with_capacity(reduced.len());
        for (ring_idx, (pi, is_hole, pts)) in reduced.into_iter().enumerate() {
            let ids = pts.iter().map(|&p| snapper.insert(p, ring_idx)).collect();
            rings.push(GraphRing {
                polygon: pi,
                is_hole,
                nodes: ids,
            });
        }
        Self::from_rings(snapper.into_nodes(), rings)
    }

    /// Build the edge list from ring cycles.
    pub fn from_rings(nodes: Vec<[f64; 2]>, rings: Vec<GraphRing>) -> Self {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for ring in &rings {
            let n = ring.nodes.len();
            for k in 0..n {
                let a = ring.nodes[k];
                let b = ring.nodes[(k + 1) % n];
                if a != b && seen.insert((a.min(b), a.max(b))) {
                    edges.push([a, b]);
                }
            }
        }
        Self {
            nodes,
            edges,
            rings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Edge indices touching each node.
    pub fn incident_edges(&self) -> Vec<Vec<usize>> {
        let mut incident = vec![Vec::new(); self.nodes.len()];
        for (ei, &[a, b]) in self.edges.iter().enumerate() {
            incident[a].push(ei);
            incident[b].push(ei);
        }
        incident
    }

    /// Split into independent graphs; rings sharing a node stay together.
    pub fn into_components(self) -> Vec<ContourGraph> {
        let n_rings = self.rings.len();
        let mut parent: Vec<usize> = (0..n_rings).collect();
        let mut owner: HashMap<usize, usize> = HashMap::new();
        for (ri, ring) in self.rings.iter().enumerate() {
            for &node in &ring.nodes {
                match owner.get(&node) {
                    Some(&other) => union(&mut parent, ri, other),
                    None => {
                        owner.insert(node, ri);
                    }
                }
            }
        }

        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for ri in 0..n_rings {
            groups.entry(find(&mut parent, ri)).or_default().push(ri);
        }

        groups
            .into_values()
            .map(|ring_ids| {
                let mut remap: HashMap<usize, usize> = HashMap::new();
                let mut nodes = Vec::new();
                let rings = ring_ids
                    .into_iter()
                    .map(|ri| {
                        let ring = &self.rings[ri];
                        let ids = ring
                            .nodes
                            .iter()
                            .map(|&old| {
                                *remap.entry(old).or_insert_with(|| {
                                    nodes.push(self.nodes[old]);
                                    nodes.len() - 1
                                })
                            })
                            .collect();
                        GraphRing {
                            polygon: ring.polygon,
                            is_hole: ring.is_hole,
                            nodes: ids,
                        }
                    })
                    .collect();
                ContourGraph::from_rings(nodes, rings)
            })
            .collect()
    }

    /// Current coordinates of one ring, open (first vertex not repeated).
    pub fn ring_coords(&self, ring: &GraphRing) -> Vec<[f64; 2]> {
        ring.nodes.iter().map(|&n| self.nodes[n]).collect()
    }

    /// Rebuild polygons from node positions, keyed by input polygon index.
    pub fn to_polygons(&self) -> Vec<(usize, Polygon<f64>)> {
        self.to_polygons_with(|ring| ring)
    }

    /// As [`Self::to_polygons`], passing every ring through `post` first.
    pub fn to_polygons_with<F>(&self, mut post: F) -> Vec<(usize, Polygon<f64>)>
    where
        F: FnMut(Vec<[f64; 2]>) -> Vec<[f64; 2]>,
    {
        let mut grouped: BTreeMap<usize, (Option<LineString<f64>>, Vec<LineString<f64>>)> =
            BTreeMap::new();
        for ring in &self.rings {
            let coords = post(self.ring_coords(ring));
            if coords.len() < 3 {
                continue;
            }
            let ls = closed_line(&coords);
            let slot = grouped.entry(ring.polygon).or_default();
            if ring.is_hole {
                slot.1.push(ls);
            } else {
                slot.0 = Some(ls);
            }
        }
        grouped
            .into_iter()
            .filter_map(|(pi, (exterior, holes))| exterior.map(|e| (pi, Polygon::new(e, holes))))
            .collect()
    }
}

/// Drop vertices whose turn angle stays under `angle_tol` (radians),
/// smallest turn first, keeping at least a triangle.
pub fn remove_shallow_turns(mut ring: Vec<[f64; 2]>, angle_tol: f64) -> Vec<[f64; 2]> {
    while ring.len() > 3 {
        let n = ring.len();
        let (idx, angle) = (0..n)
            .map(|i| (i, turn_angle(ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n])))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, f64::INFINITY));
        if angle >= angle_tol {
            break;
        }
        ring.remove(idx);
    }
    ring
}

/// True when segments `p1p2` and `q1q2` cross at a single interior point.
pub fn segments_cross(p1: [f64; 2], p2: [f64; 2], q1: [f64; 2], q2: [f64; 2]) -> bool {
    let d1 = orient(p1, p2, q1);
    let d2 = orient(p1, p2, q2);
    let d3 = orient(q1, q2, p1);
    let d4 = orient(q1, q2, p2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

#[inline]
fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn rings_of(poly: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(poly.exterior()).chain(poly.interiors())
}

fn open_coords(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    let mut pts: Vec<[f64; 2]> = ring.coords().map(|c| [c.x, c.y]).collect();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}

fn closed_line(coords: &[[f64; 2]]) -> LineString<f64> {
    let mut out: Vec<Coord<f64>> = coords.iter().map(|p| Coord { x: p[0], y: p[1] }).collect();
    if let Some(&first) = out.first() {
        out.push(first);
    }
    LineString::new(out)
}

/// Douglas-Peucker at `tolerance`, then drop the flattest vertex until the
/// ring fits in `budget`.
fn reduce_ring(ring: &LineString<f64>, tolerance: f64, budget: usize) -> Option<Vec<[f64; 2]>> {
    let simplified = if tolerance > 0.0 {
        ring.simplify(&tolerance)
    } else {
        ring.clone()
    };
    let mut pts = open_coords(&simplified);
    if pts.len() < 3 {
        return None;
    }
    let budget = budget.max(3);
    while pts.len() > budget {
        let n = pts.len();
        let idx = (0..n)
            .map(|i| (i, orient(pts[(i + n - 1) % n], pts[i], pts[(i + 1) % n]).abs()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        pts.remove(idx);
    }
    Some(pts)
}

/// Greedy spatial merge of nearby vertices from different rings.
struct JunctionSnapper {
    snap: f64,
    anchors: Vec<[f64; 2]>,
    sums: Vec<([f64; 2], usize)>,
    rings: Vec<Vec<usize>>,
    buckets: HashMap<(i64, i64), Vec<usize>>,
}

impl JunctionSnapper {
    fn new(snap: f64) -> Self {
        Self {
            snap,
            anchors: Vec::new(),
            sums: Vec::new(),
            rings: Vec::new(),
            buckets: HashMap::new(),
        }
    }

    fn key(&self, p: [f64; 2]) -> (i64, i64) {
        let cell = self.snap.max(1e-6);
        ((p[0] / cell).floor() as i64, (p[1] / cell).floor() as i64)
    }

    fn insert(&mut self, p: [f64; 2], ring: usize) -> usize {
        if self.snap > 0.0 {
            let (kx, ky) = self.key(p);
            let mut best: Option<(usize, f64)> = None;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let Some(bucket) = self.buckets.get(&(kx + dx, ky + dy)) else {
                        continue;
                    };
                    for &id in bucket {
                        if self.rings[id].contains(&ring) {
                            continue;
                        }
                        let a = self.anchors[id];
                        let d = ((a[0] - p[0]).powi(2) + (a[1] - p[1]).powi(2)).sqrt();
                        if d < self.snap && best.map_or(true, |(_, bd)| d < bd) {
                            best = Some((id, d));
                        }
                    }
                }
            }
            if let Some((id, _)) = best {
                let (sum, count) = &mut self.sums[id];
                sum[0] += p[0];
                sum[1] += p[1];
                *count += 1;
                self.rings[id].push(ring);
                return id;
            }
        }
        let id = self.anchors.len();
        self.anchors.push(p);
        self.sums.push((p, 1));
        self.rings.push(vec![ring]);
        let key = self.key(p);
        self.buckets.entry(key).or_default().push(id);
        id
    }

    fn into_nodes(self) -> Vec<[f64; 2]> {
        self.sums
            .into_iter()
            .map(|(s, c)| [s[0] / c as f64, s[1] / c as f64])
            .collect()
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra.max(rb)] = ra.min(rb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0), (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size), (x: x0, y: y0 + size),
        ]
    }

    #[test]
    fn dense_graph_keeps_every_vertex() {
        let g = ContourGraph::from_polygons(&[square(0.0, 0.0, 4.0), square(10.0, 0.0, 2.0)]);
        assert_eq!(g.nodes.len(), 8);
        assert_eq!(g.edges.len(), 8);
        assert_eq!(g.rings.len(), 2);
        assert_eq!(g.into_components().len(), 2);
    }

    #[test]
    fn adjacent_squares_share_junctions() {
        // Touching along x = 4.
        let g = ContourGraph::skeleton(
            &[square(0.0, 0.0, 4.0), square(4.2, 0.0, 4.0)],
            0.1,
            64,
            0.75,
        );
        assert_eq!(g.nodes.len(), 6);
        // The shared wall collapses into one edge.
        assert_eq!(g.edges.len(), 7);
        let comps = g.into_components();
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].to_polygons().len(), 2);
    }

    #[test]
    fn budget_limits_ring_size() {
        let circle: Vec<Coord<f64>> = (0..100)
            .map(|k| {
                let t = k as f64 / 100.0 * std::f64::consts::TAU;
                Coord {
                    x: 50.0 + 20.0 * t.cos(),
                    y: 50.0 + 20.0 * t.sin(),
                }
            })
            .collect();
        let poly = Polygon::new(LineString::new(circle), vec![]);
        let g = ContourGraph::skeleton(&[poly], 0.01, 12, 0.0);
        assert_eq!(g.rings.len(), 1);
        assert!(g.rings[0].nodes.len() <= 12);
        assert!(g.rings[0].nodes.len() >= 3);
    }

    #[test]
    fn shallow_turns_are_removed() {
        let ring = vec![[0.0, 0.0], [5.0, 0.05], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let out = remove_shallow_turns(ring, 5f64.to_radians());
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn crossing_requires_interior_intersection() {
        assert!(segments_cross([0.0, 0.0], [2.0, 2.0], [0.0, 2.0], [2.0, 0.0]));
        assert!(!segments_cross([0.0, 0.0], [1.0, 1.0], [1.0, 1.0], [2.0, 0.0]));
        assert!(!segments_cross([0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]));
    }
}
