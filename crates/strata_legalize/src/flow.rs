//! Exact min-cost-flow assignment engine.
//!
//! Assigns a set of instances to a set of same-resource-type sites,
//! minimizing total displacement, with each site supplying at most its
//! capacity and each instance demanding exactly one slot. The problem is
//! built as a source → instances → sites → sink network and solved by
//! successive shortest augmenting paths, which yields an exact optimum —
//! legalization never worsens displacement beyond the provable minimum for
//! the sub-problem.
//!
//! Float displacements are scaled into integer arc costs so the solver
//! works in exact arithmetic. Arcs are generated in (instance order,
//! site order) so equal-cost optima resolve deterministically.

use crate::config::CostMetric;
use crate::error::{LegalizeError, LegalizeResult};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::VecDeque;
use strata_fabric::{AreaTypeId, InstId, SiteId};

/// Fixed-point scale applied to float displacements before rounding to
/// integer arc costs.
const COST_SCALE: f64 = 100.0;

/// An instance to assign, with its current continuous position.
#[derive(Debug, Clone, Copy)]
pub struct FlowInst {
    /// The instance being assigned.
    pub inst: InstId,
    /// Current x coordinate.
    pub x: f32,
    /// Current y coordinate.
    pub y: f32,
}

/// A candidate site, with its position and remaining slot capacity.
#[derive(Debug, Clone, Copy)]
pub struct FlowSite {
    /// The candidate site.
    pub site: SiteId,
    /// Site x coordinate (lower-left corner).
    pub x: f32,
    /// Site y coordinate (lower-left corner).
    pub y: f32,
    /// Remaining instance slots on this site.
    pub capacity: u32,
}

/// The result of a flow assignment: one site per instance, plus the exact
/// total displacement cost in original (unscaled) units.
#[derive(Debug, Clone)]
pub struct FlowAssignment {
    /// `(instance, assigned site)` pairs, in instance input order.
    pub pairs: Vec<(InstId, SiteId)>,
    /// Total displacement under the configured metric.
    pub total_cost: f64,
}

/// Computes the displacement cost between an instance and a site.
fn displacement(metric: CostMetric, inst: &FlowInst, site: &FlowSite) -> f64 {
    let dx = (inst.x - site.x) as f64;
    let dy = (inst.y - site.y) as f64;
    match metric {
        CostMetric::Manhattan => dx.abs() + dy.abs(),
        CostMetric::SquaredEuclidean => dx * dx + dy * dy,
    }
}

/// Residual arc: remaining capacity and unit cost.
#[derive(Debug, Clone, Copy)]
struct Arc {
    cap: i64,
    cost: i64,
}

/// The residual network. Arcs are always added in forward/reverse pairs,
/// so the partner of arc `e` is arc `e ^ 1`.
struct FlowNet {
    graph: DiGraph<(), Arc>,
}

impl FlowNet {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
        }
    }

    fn add_node(&mut self) -> NodeIndex {
        self.graph.add_node(())
    }

    fn add_arc(&mut self, from: NodeIndex, to: NodeIndex, cap: i64, cost: i64) -> EdgeIndex {
        let e = self.graph.add_edge(from, to, Arc { cap, cost });
        self.graph.add_edge(to, from, Arc { cap: 0, cost: -cost });
        e
    }

    fn partner(e: EdgeIndex) -> EdgeIndex {
        EdgeIndex::new(e.index() ^ 1)
    }

    /// Flow pushed through a forward arc, read off the reverse arc's
    /// accumulated capacity.
    fn flow(&self, e: EdgeIndex) -> i64 {
        self.graph[Self::partner(e)].cap
    }

    /// Finds a minimum-cost augmenting path from `source` to `sink` in the
    /// residual network (SPFA; residual arcs may carry negative costs).
    ///
    /// Returns the path as arcs from source to sink, or `None` if the sink
    /// is unreachable.
    fn shortest_path(&self, source: NodeIndex, sink: NodeIndex) -> Option<Vec<EdgeIndex>> {
        let n = self.graph.node_count();
        let mut dist = vec![i64::MAX; n];
        let mut prev: Vec<Option<EdgeIndex>> = vec![None; n];
        let mut in_queue = vec![false; n];
        let mut queue = VecDeque::new();

        dist[source.index()] = 0;
        queue.push_back(source);
        in_queue[source.index()] = true;

        while let Some(u) = queue.pop_front() {
            in_queue[u.index()] = false;
            let du = dist[u.index()];
            for edge in self.graph.edges(u) {
                let arc = edge.weight();
                if arc.cap <= 0 {
                    continue;
                }
                let v = edge.target();
                if du != i64::MAX && du + arc.cost < dist[v.index()] {
                    dist[v.index()] = du + arc.cost;
                    prev[v.index()] = Some(edge.id());
                    if !in_queue[v.index()] {
                        queue.push_back(v);
                        in_queue[v.index()] = true;
                    }
                }
            }
        }

        if dist[sink.index()] == i64::MAX {
            return None;
        }
        let mut path = Vec::new();
        let mut node = sink;
        while node != source {
            let e = prev[node.index()].expect("reached node must have a predecessor arc");
            path.push(e);
            let (from, _) = self.graph.edge_endpoints(e).unwrap();
            node = from;
        }
        path.reverse();
        Some(path)
    }

    /// Pushes the bottleneck amount along `path`, updating residual capacities.
    fn augment(&mut self, path: &[EdgeIndex]) -> i64 {
        let bottleneck = path
            .iter()
            .map(|&e| self.graph[e].cap)
            .min()
            .expect("augmenting path is non-empty");
        for &e in path {
            self.graph[e].cap -= bottleneck;
            self.graph[Self::partner(e)].cap += bottleneck;
        }
        bottleneck
    }
}

/// Optimally assigns each instance to a site, unrestricted candidates.
///
/// Equivalent to [`assign_min_cost_with`] with every `(instance, site)`
/// pair allowed.
pub fn assign_min_cost(
    area_type: AreaTypeId,
    insts: &[FlowInst],
    sites: &[FlowSite],
    metric: CostMetric,
) -> LegalizeResult<FlowAssignment> {
    assign_min_cost_with(area_type, insts, sites, metric, |_, _| true)
}

/// Optimally assigns each instance to an allowed site.
///
/// `allow(i, j)` gates the arc from instance index `i` to site index `j`;
/// region-restricted sub-problems pass a containment predicate. Fails with
/// [`LegalizeError::InfeasibleAssignment`] when total site capacity is
/// smaller than instance demand, or when the allowed-arc structure admits
/// no complete assignment.
pub fn assign_min_cost_with(
    area_type: AreaTypeId,
    insts: &[FlowInst],
    sites: &[FlowSite],
    metric: CostMetric,
    allow: impl Fn(usize, usize) -> bool,
) -> LegalizeResult<FlowAssignment> {
    let demand = insts.len();
    let supply: usize = sites.iter().map(|s| s.capacity as usize).sum();
    if supply < demand {
        return Err(LegalizeError::InfeasibleAssignment {
            area_type,
            demand,
            supply,
        });
    }
    if demand == 0 {
        return Ok(FlowAssignment {
            pairs: Vec::new(),
            total_cost: 0.0,
        });
    }

    let mut net = FlowNet::new();
    let source = net.add_node();
    let sink = net.add_node();
    let inst_nodes: Vec<NodeIndex> = insts.iter().map(|_| net.add_node()).collect();
    let site_nodes: Vec<NodeIndex> = sites.iter().map(|_| net.add_node()).collect();

    for &node in &inst_nodes {
        net.add_arc(source, node, 1, 0);
    }
    for (j, site) in sites.iter().enumerate() {
        net.add_arc(site_nodes[j], sink, site.capacity as i64, 0);
    }

    // (inst index, site index, forward arc)
    let mut inst_site_arcs = Vec::new();
    for (i, inst) in insts.iter().enumerate() {
        for (j, site) in sites.iter().enumerate() {
            if !allow(i, j) {
                continue;
            }
            let cost = (displacement(metric, inst, site) * COST_SCALE).round() as i64;
            let e = net.add_arc(inst_nodes[i], site_nodes[j], 1, cost);
            inst_site_arcs.push((i, j, e));
        }
    }

    let mut pushed = 0usize;
    while pushed < demand {
        let path = net
            .shortest_path(source, sink)
            .ok_or(LegalizeError::InfeasibleAssignment {
                area_type,
                demand,
                supply: pushed,
            })?;
        pushed += net.augment(&path) as usize;
    }

    let mut assigned: Vec<Option<SiteId>> = vec![None; demand];
    let mut total_scaled = 0i64;
    for &(i, j, e) in &inst_site_arcs {
        let flow = net.flow(e);
        if flow > 0 {
            assigned[i] = Some(sites[j].site);
            total_scaled += net.graph[e].cost * flow;
        }
    }
    let pairs = insts
        .iter()
        .zip(assigned)
        .map(|(inst, site)| {
            let site = site.expect("every instance carries one unit of flow");
            (inst.inst, site)
        })
        .collect();

    Ok(FlowAssignment {
        pairs,
        total_cost: total_scaled as f64 / COST_SCALE,
    })
}
