//! DAG validation and structural queries over a built [`Graph`]
//! (spec.md §4.1): single-root check, self-loop check, cycle detection,
//! ancestors/descendants/leaves/root, topological order, and transitive
//! reduction.
//!
//! Cycle detection uses `petgraph::algo::tarjan_scc` so every multi-
//! vertex cycle can be reported by id in one aggregated
//! [`BuildError::Cycle`], matching the original's `acyclicGraph.Cycles()`
//! (`internal/dag/dag.go`) collecting every strongly-connected component
//! of size > 1. Topological order and transitive reduction are
//! hand-rolled DFS, following `dag.go`'s `topoOrder`/`TransitiveReduction`
//! directly, since they need the original's "any valid order, not
//! sorted" semantics rather than petgraph's own ordering.

use crate::errors::BuildError;
use crate::graph::{Edge, Graph, VertexId};
use petgraph::graph::DiGraph;
use rustc_hash::{FxHashMap, FxHashSet};

/// Runs every structural invariant from spec.md §4.1 and returns the
/// first-found root on success. Cycle errors from every strongly
/// connected component are aggregated into one [`BuildError::Cycle`]
/// list rather than returned one at a time, matching the original's
/// `multierror.Append` loop in `Validate()`.
pub fn validate(graph: &Graph) -> Result<VertexId, BuildError> {
    for edge in &graph.edges {
        if edge.is_self_loop() {
            return Err(BuildError::SelfLoop {
                id: edge.source.clone(),
            });
        }
    }

    let root = root(graph)?;

    let cycles = cycles(graph);
    if !cycles.is_empty() {
        let mut members: Vec<VertexId> = cycles.into_iter().flatten().collect();
        members.sort();
        members.dedup();
        return Err(BuildError::Cycle { members });
    }

    Ok(root)
}

/// The single vertex with in-degree zero. Errors if there are zero or
/// more than one.
pub fn root(graph: &Graph) -> Result<VertexId, BuildError> {
    let mut roots: Vec<VertexId> = graph
        .vertex_ids()
        .into_iter()
        .filter(|id| graph.in_degree(id) == 0)
        .collect();

    match roots.len() {
        0 => Err(BuildError::NoRoot),
        1 => Ok(roots.remove(0)),
        _ => Err(BuildError::MultipleRoots { ids: roots }),
    }
}

/// Vertices with out-degree zero. At least one must exist for any
/// non-empty graph (enforced by callers that need leaves, not by
/// `validate` itself — an empty result here is a distinct failure mode
/// from the three build-time invariants).
#[must_use]
pub fn leaves(graph: &Graph) -> Vec<VertexId> {
    graph
        .vertex_ids()
        .into_iter()
        .filter(|id| graph.out_degree(id) == 0)
        .collect()
}

/// Every strongly connected component of size > 1, i.e. every cycle.
/// Self-loops are excluded (detected separately by `validate`, matching
/// the original's "self-referencing nodes are not reported" note on
/// `Cycles()`).
#[must_use]
pub fn cycles(graph: &Graph) -> Vec<Vec<VertexId>> {
    let (pg, index_to_id) = to_petgraph(graph);
    petgraph::algo::tarjan_scc(&pg)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| scc.into_iter().map(|idx| index_to_id[&idx].clone()).collect())
        .collect()
}

fn to_petgraph(graph: &Graph) -> (DiGraph<(), ()>, FxHashMap<petgraph::graph::NodeIndex, VertexId>) {
    let mut pg = DiGraph::new();
    let mut id_to_index = FxHashMap::default();
    let mut index_to_id = FxHashMap::default();
    for id in graph.vertex_ids() {
        let idx = pg.add_node(());
        index_to_id.insert(idx, id.clone());
        id_to_index.insert(id, idx);
    }
    for edge in &graph.edges {
        if edge.source == edge.target {
            continue;
        }
        if let (Some(&s), Some(&t)) = (id_to_index.get(&edge.source), id_to_index.get(&edge.target)) {
            pg.add_edge(s, t, ());
        }
    }
    (pg, index_to_id)
}

/// Every vertex reachable downstream from `start` (exclusive walk
/// following outbound edges), matching `acyclicGraph.Ancestors` (the
/// original's naming: "ancestors" walks the direction a dependent would
/// call its dependencies' *dependents* — here we follow spec.md's
/// stated direction literally: downstream from `v`).
#[must_use]
pub fn ancestors(graph: &Graph, start: &VertexId) -> FxHashSet<VertexId> {
    walk(graph, start, Direction::Down)
}

/// Every vertex reachable upstream from `start` (following inbound
/// edges), matching `acyclicGraph.Descendents`.
#[must_use]
pub fn descendants(graph: &Graph, start: &VertexId) -> FxHashSet<VertexId> {
    walk(graph, start, Direction::Up)
}

enum Direction {
    Down,
    Up,
}

fn walk(graph: &Graph, start: &VertexId, dir: Direction) -> FxHashSet<VertexId> {
    let mut seen = FxHashSet::default();
    let mut stack = vec![start.clone()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        let next: Vec<VertexId> = match dir {
            Direction::Down => graph.outbound(&id).into_iter().map(|e| e.target.clone()).collect(),
            Direction::Up => graph.inbound(&id).into_iter().map(|e| e.source.clone()).collect(),
        };
        stack.extend(next);
    }
    seen.remove(start);
    seen
}

/// Downstream-first order: sources before their targets' targets. Any
/// valid order may be returned among ties, matching the original's
/// documented "the nodes are not sorted" contract.
#[must_use]
pub fn topological_order(graph: &Graph) -> Vec<VertexId> {
    topo(graph, Direction::Down)
}

/// Upstream-first order: targets before their sources.
#[must_use]
pub fn reverse_topological_order(graph: &Graph) -> Vec<VertexId> {
    topo(graph, Direction::Up)
}

fn topo(graph: &Graph, dir: Direction) -> Vec<VertexId> {
    let mut sorted = Vec::with_capacity(graph.vertices.len());
    let mut permanent = FxHashSet::default();
    let mut temporary = FxHashSet::default();

    fn visit(
        graph: &Graph,
        dir: &Direction,
        id: &VertexId,
        temporary: &mut FxHashSet<VertexId>,
        permanent: &mut FxHashSet<VertexId>,
        sorted: &mut Vec<VertexId>,
    ) {
        if permanent.contains(id) {
            return;
        }
        if !temporary.insert(id.clone()) {
            panic!("cycle found in dag");
        }
        let next: Vec<VertexId> = match dir {
            Direction::Down => graph.outbound(id).into_iter().map(|e| e.target.clone()).collect(),
            Direction::Up => graph.inbound(id).into_iter().map(|e| e.source.clone()).collect(),
        };
        for n in next {
            visit(graph, dir, &n, temporary, permanent, sorted);
        }
        temporary.remove(id);
        permanent.insert(id.clone());
        sorted.push(id.clone());
    }

    for id in graph.vertex_ids() {
        visit(graph, &dir, &id, &mut temporary, &mut permanent, &mut sorted);
    }
    sorted
}

/// Removes any edge `(u, v')` where `v'` is already reachable from `u`
/// via another direct child of `u`. Offered as a library operation
/// (spec.md §9's open question); never invoked by the builder.
#[must_use]
pub fn transitive_reduction(graph: &Graph) -> Graph {
    let mut reduced = graph.clone();
    for u in graph.vertex_ids() {
        let direct_targets: FxHashSet<VertexId> =
            graph.outbound(&u).into_iter().map(|e| e.target.clone()).collect();
        for v in &direct_targets {
            let reachable_via_v = ancestors(graph, v);
            reduced.edges.retain(|e| {
                !(e.source == u && direct_targets.contains(&e.target) && reachable_via_v.contains(&e.target))
            });
        }
    }
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LogicalKind, Vertex};

    fn v(id: &str) -> Vertex {
        Vertex::logical(id, LogicalKind::Any)
    }

    fn chain() -> Graph {
        let mut g = Graph::new();
        g.add_vertex(v("a"));
        g.add_vertex(v("b"));
        g.add_vertex(v("c"));
        g.add_edge(Edge::new("a", "b"));
        g.add_edge(Edge::new("b", "c"));
        g
    }

    #[test]
    fn single_root_chain_validates() {
        let g = chain();
        assert_eq!(validate(&g).unwrap(), VertexId::new("a"));
    }

    #[test]
    fn two_roots_is_a_build_error() {
        let mut g = Graph::new();
        g.add_vertex(v("a"));
        g.add_vertex(v("b"));
        assert!(matches!(root(&g), Err(BuildError::MultipleRoots { .. })));
    }

    #[test]
    fn zero_roots_is_a_build_error() {
        let mut g = Graph::new();
        g.add_vertex(v("a"));
        g.add_vertex(v("b"));
        g.add_edge(Edge::new("a", "b"));
        g.add_edge(Edge::new("b", "a"));
        assert!(matches!(root(&g), Err(BuildError::NoRoot)));
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut g = Graph::new();
        g.add_vertex(v("a"));
        g.add_edge(Edge::new("a", "a"));
        assert!(matches!(validate(&g), Err(BuildError::SelfLoop { .. })));
    }

    #[test]
    fn two_cycle_is_rejected_and_mentions_both_ids() {
        let mut g = Graph::new();
        g.add_vertex(v("a"));
        g.add_vertex(v("b"));
        g.add_edge(Edge::new("a", "b"));
        g.add_edge(Edge::new("b", "a"));
        match validate(&g) {
            Err(BuildError::Cycle { members }) => {
                assert!(members.contains(&VertexId::new("a")));
                assert!(members.contains(&VertexId::new("b")));
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn leaves_are_out_degree_zero_vertices() {
        let g = chain();
        assert_eq!(leaves(&g), vec![VertexId::new("c")]);
    }

    #[test]
    fn ancestors_and_descendants_follow_opposite_directions() {
        let g = chain();
        let anc = ancestors(&g, &VertexId::new("a"));
        assert!(anc.contains(&VertexId::new("b")));
        assert!(anc.contains(&VertexId::new("c")));

        let desc = descendants(&g, &VertexId::new("c"));
        assert!(desc.contains(&VertexId::new("a")));
        assert!(desc.contains(&VertexId::new("b")));
    }

    #[test]
    fn topological_order_respects_edges() {
        let g = chain();
        let order = topological_order(&g);
        let pos = |id: &str| order.iter().position(|x| x == &VertexId::new(id)).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn transitive_reduction_drops_the_redundant_direct_edge() {
        let mut g = Graph::new();
        g.add_vertex(v("a"));
        g.add_vertex(v("b"));
        g.add_vertex(v("c"));
        g.add_edge(Edge::new("a", "b"));
        g.add_edge(Edge::new("b", "c"));
        g.add_edge(Edge::new("a", "c"));

        let reduced = transitive_reduction(&g);
        assert_eq!(reduced.edges.len(), 2);
        assert!(!reduced
            .edges
            .iter()
            .any(|e| e.source == VertexId::new("a") && e.target == VertexId::new("c")));
    }
}
