//! Fixed-budget gradient descent over a [`ContourGraph`].
//!
//! Energy terms:
//! - data: `data_coef · (s(p) − threshold)²` at every node and at
//!   `edge_samples` interior points of every edge,
//! - tension: `length_coef · |e|` per edge,
//! - alignment: `crossfield_coef · |f(ê)|² · |e|` per edge, with the frame
//!   field sampled at the edge midpoint.
//!
//! A step computes all node gradients first, then moves nodes one at a time.
//! Each move is clamped to `max_displacement` and to the raster, and is
//! rejected when an incident edge would cross a non-adjacent edge.
use super::graph::{segments_cross, ContourGraph};
use super::options::RefineParams;
use crate::crossfield::Crossfield;
use crate::image::ImageF32;
use serde::Serialize;
use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const GRID_CELL: f64 = 8.0;
const FD_STEP: f64 = 1e-3;

/// Outcome of one refinement run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineReport {
    pub steps_run: usize,
    pub rejected_moves: usize,
    pub initial_energy: f64,
    pub final_energy: f64,
}

impl RefineReport {
    /// Combine reports of graphs refined side by side.
    pub fn merge(&mut self, other: &RefineReport) {
        self.steps_run = self.steps_run.max(other.steps_run);
        self.rejected_moves += other.rejected_moves;
        self.initial_energy += other.initial_energy;
        self.final_energy += other.final_energy;
    }
}

pub struct GraphOptimizer<'a> {
    graph: &'a mut ContourGraph,
    seg: &'a ImageF32,
    crossfield: &'a Crossfield,
    params: &'a RefineParams,
    incident: Vec<Vec<usize>>,
    bounds: [f64; 2],
}

impl<'a> GraphOptimizer<'a> {
    pub fn new(
        graph: &'a mut ContourGraph,
        seg: &'a ImageF32,
        crossfield: &'a Crossfield,
        params: &'a RefineParams,
    ) -> Self {
        let incident = graph.incident_edges();
        Self {
            graph,
            seg,
            crossfield,
            params,
            incident,
            bounds: [seg.w as f64, seg.h as f64],
        }
    }

    /// Run exactly `params.steps` steps.
    pub fn run(&mut self) -> RefineReport {
        let initial_energy = self.energy();
        let mut rejected_moves = 0;
        for _ in 0..self.params.steps {
            rejected_moves += self.step();
        }
        let report = RefineReport {
            steps_run: self.params.steps,
            rejected_moves,
            initial_energy,
            final_energy: self.energy(),
        };
        log::debug!(
            "refine: nodes={} edges={} steps={} rejected={} energy {:.4} -> {:.4}",
            self.graph.nodes.len(),
            self.graph.edges.len(),
            report.steps_run,
            report.rejected_moves,
            report.initial_energy,
            report.final_energy
        );
        report
    }

    /// One descent step. Returns the number of rejected moves.
    pub fn step(&mut self) -> usize {
        let grads = self.gradients();
        let index = EdgeIndex::build(&*self.graph, self.params.max_displacement);
        let mut rejected = 0;
        for (node, g) in grads.into_iter().enumerate() {
            let old = self.graph.nodes[node];
            let mut delta = [-self.params.step_size * g[0], -self.params.step_size * g[1]];
            let norm = (delta[0] * delta[0] + delta[1] * delta[1]).sqrt();
            if !norm.is_finite() || norm == 0.0 {
                continue;
            }
            if norm > self.params.max_displacement {
                let s = self.params.max_displacement / norm;
                delta = [delta[0] * s, delta[1] * s];
            }
            let new = [
                (old[0] + delta[0]).clamp(0.0, self.bounds[0]),
                (old[1] + delta[1]).clamp(0.0, self.bounds[1]),
            ];
            if new == old {
                continue;
            }
            if self.move_crosses(node, new, &index) {
                rejected += 1;
                continue;
            }
            self.graph.nodes[node] = new;
        }
        rejected
    }

    pub fn energy(&self) -> f64 {
        let p = self.params;
        let nodes = &self.graph.nodes;
        let mut total = 0.0;
        for &q in nodes {
            total += p.data_coef * self.residual(q).powi(2);
        }
        for &[a, b] in &self.graph.edges {
            let (pa, pb) = (nodes[a], nodes[b]);
            for t in self.sample_weights() {
                let q = lerp(pa, pb, t);
                total += p.data_coef * self.residual(q).powi(2);
            }
            total += p.length_coef * dist2(pa, pb).sqrt();
            total += p.crossfield_coef * self.alignment(pa, pb);
        }
        total
    }

    fn gradients(&self) -> Vec<[f64; 2]> {
        let p = self.params;
        let nodes = &self.graph.nodes;
        let mut grads = vec![[0.0; 2]; nodes.len()];

        if p.data_coef > 0.0 {
            for (i, &q) in nodes.iter().enumerate() {
                let r = self.residual(q);
                let gs = self.seg.gradient_raster(q);
                grads[i][0] += 2.0 * p.data_coef * r * gs[0];
                grads[i][1] += 2.0 * p.data_coef * r * gs[1];
            }
        }

        for &[a, b] in &self.graph.edges {
            let (pa, pb) = (nodes[a], nodes[b]);
            if p.data_coef > 0.0 {
                for t in self.sample_weights() {
                    let q = lerp(pa, pb, t);
                    let r = self.residual(q);
                    let gs = self.seg.gradient_raster(q);
                    let k = 2.0 * p.data_coef * r;
                    grads[a][0] += k * gs[0] * (1.0 - t);
                    grads[a][1] += k * gs[1] * (1.0 - t);
                    grads[b][0] += k * gs[0] * t;
                    grads[b][1] += k * gs[1] * t;
                }
            }
            let len = dist2(pa, pb).sqrt();
            if p.length_coef > 0.0 && len > 1e-12 {
                let u = [(pb[0] - pa[0]) / len, (pb[1] - pa[1]) / len];
                grads[a][0] -= p.length_coef * u[0];
                grads[a][1] -= p.length_coef * u[1];
                grads[b][0] += p.length_coef * u[0];
                grads[b][1] += p.length_coef * u[1];
            }
            if p.crossfield_coef > 0.0 {
                for axis in 0..2 {
                    let mut a_hi = pa;
                    let mut a_lo = pa;
                    a_hi[axis] += FD_STEP;
                    a_lo[axis] -= FD_STEP;
                    let ga = (self.alignment(a_hi, pb) - self.alignment(a_lo, pb)) / (2.0 * FD_STEP);
                    let mut b_hi = pb;
                    let mut b_lo = pb;
                    b_hi[axis] += FD_STEP;
                    b_lo[axis] -= FD_STEP;
                    let gb = (self.alignment(pa, b_hi) - self.alignment(pa, b_lo)) / (2.0 * FD_STEP);
                    grads[a][axis] += p.crossfield_coef * ga;
                    grads[b][axis] += p.crossfield_coef * gb;
                }
            }
        }
        grads
    }

    fn move_crosses(&self, node: usize, new: [f64; 2], index: &EdgeIndex) -> bool {
        let nodes = &self.graph.nodes;
        for &ei in &self.incident[node] {
            let [a, b] = self.graph.edges[ei];
            let other = if a == node { b } else { a };
            let (p, q) = (new, nodes[other]);
            for cand in index.query(p, q) {
                let [c, d] = self.graph.edges[cand];
                if c == node || d == node || c == other || d == other {
                    continue;
                }
                if segments_cross(p, q, nodes[c], nodes[d]) {
                    return true;
                }
            }
        }
        false
    }

    #[inline]
    fn residual(&self, q: [f64; 2]) -> f64 {
        self.seg.sample_raster(q) - self.params.threshold
    }

    #[inline]
    fn alignment(&self, a: [f64; 2], b: [f64; 2]) -> f64 {
        let dir = [b[0] - a[0], b[1] - a[1]];
        let len = dist2(a, b).sqrt();
        if len < 1e-12 {
            return 0.0;
        }
        let mid = lerp(a, b, 0.5);
        self.crossfield.alignment_energy(mid, dir) * len
    }

    fn sample_weights(&self) -> impl Iterator<Item = f64> {
        let n = self.params.edge_samples;
        (1..=n).map(move |k| k as f64 / (n + 1) as f64)
    }
}

/// Refine independent graphs, in parallel when the `parallel` feature is on.
pub fn refine_graphs(
    graphs: Vec<ContourGraph>,
    seg: &ImageF32,
    crossfield: &Crossfield,
    params: &RefineParams,
) -> (Vec<ContourGraph>, RefineReport) {
    let refine_one = |mut graph: ContourGraph| {
        let report = GraphOptimizer::new(&mut graph, seg, crossfield, params).run();
        (graph, report)
    };
    #[cfg(feature = "parallel")]
    let results: Vec<(ContourGraph, RefineReport)> = graphs.into_par_iter().map(refine_one).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<(ContourGraph, RefineReport)> = graphs.into_iter().map(refine_one).collect();

    let mut total = RefineReport::default();
    let graphs = results
        .into_iter()
        .map(|(graph, report)| {
            total.merge(&report);
            graph
        })
        .collect();
    (graphs, total)
}

/// Uniform grid over edge bounding boxes, inflated by the largest move a node
/// can make during one step.
struct EdgeIndex {
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl EdgeIndex {
    fn build(graph: &ContourGraph, inflate: f64) -> Self {
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (ei, &[a, b]) in graph.edges.iter().enumerate() {
            let (lo, hi) = cell_range(graph.nodes[a], graph.nodes[b], inflate);
            for cy in lo.1..=hi.1 {
                for cx in lo.0..=hi.0 {
                    cells.entry((cx, cy)).or_default().push(ei);
                }
            }
        }
        Self { cells }
    }

    fn query(&self, p: [f64; 2], q: [f64; 2]) -> Vec<usize> {
        let (lo, hi) = cell_range(p, q, 0.0);
        let mut out = Vec::new();
        for cy in lo.1..=hi.1 {
            for cx in lo.0..=hi.0 {
                if let Some(list) = self.cells.get(&(cx, cy)) {
                    out.extend_from_slice(list);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

fn cell_range(p: [f64; 2], q: [f64; 2], inflate: f64) -> ((i64, i64), (i64, i64)) {
    let cell = |v: f64| (v / GRID_CELL).floor() as i64;
    (
        (cell(p[0].min(q[0]) - inflate), cell(p[1].min(q[1]) - inflate)),
        (cell(p[0].max(q[0]) + inflate), cell(p[1].max(q[1]) + inflate)),
    )
}

#[inline]
fn lerp(a: [f64; 2], b: [f64; 2], t: f64) -> [f64; 2] {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
}

#[inline]
fn dist2(a: [f64; 2], b: [f64; 2]) -> f64 {
    (b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)
}
