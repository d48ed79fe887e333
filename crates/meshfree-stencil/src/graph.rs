//! Graph connectivity analysis over stencils.
//!
//! A stencil induces an undirected graph: every `(node, neighbor)` entry
//! is an edge. [`is_connected`] asks whether that graph spans a single
//! component; [`connectivity`] computes its node connectivity -- the
//! minimum number of node removals that disconnect it.
//!
//! Node connectivity uses the Esfahanian-Hakimi reduction: the minimum
//! over a small set of pairwise local connectivities, each computed as
//! max-flow on the vertex-split unit-capacity network.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};

use crate::types::Stencil;

/// Build the simple undirected graph a stencil induces.
///
/// Graph nodes are the indices the stencil references (row owners and
/// neighbor entries); duplicate edges collapse and self edges are
/// dropped, neither affects connectivity. Node weights carry the
/// original indices; petgraph indices are compact and follow sorted
/// original-index order.
fn build_graph(stencil: &Stencil) -> UnGraph<usize, ()> {
    let edges = stencil.edges();

    let mut referenced = BTreeSet::new();
    for &(a, b) in &edges {
        referenced.insert(a);
        referenced.insert(b);
    }

    let mut graph = UnGraph::new_undirected();
    let mut index_of = BTreeMap::new();
    for &node in &referenced {
        index_of.insert(node, graph.add_node(node));
    }

    let mut seen = BTreeSet::new();
    for (a, b) in edges {
        if a == b {
            continue;
        }
        if seen.insert((a.min(b), a.max(b))) {
            graph.add_edge(index_of[&a], index_of[&b], ());
        }
    }

    graph
}

/// Returns `true` if the stencil's graph spans all referenced nodes in
/// one component.
///
/// A stencil referencing no nodes at all (no rows, or zero width) is not
/// connected; a single referenced node is trivially connected.
#[must_use]
pub fn is_connected(stencil: &Stencil) -> bool {
    let graph = build_graph(stencil);
    if graph.node_count() == 0 {
        return false;
    }
    connected_components(&graph) == 1
}

/// The node connectivity of the stencil's graph: the minimum number of
/// node removals that disconnect the remainder (or reduce it to a single
/// node).
///
/// Degenerate graphs -- fewer than two nodes, or already disconnected --
/// have connectivity 0. A complete graph on `n` nodes has connectivity
/// `n - 1`.
#[must_use]
pub fn connectivity(stencil: &Stencil) -> usize {
    let graph = build_graph(stencil);
    let n = graph.node_count();
    if n < 2 {
        return 0;
    }
    if connected_components(&graph) != 1 {
        return 0;
    }

    let adjacency: Vec<BTreeSet<usize>> = graph
        .node_indices()
        .map(|u| graph.neighbors(u).map(NodeIndex::index).collect())
        .collect();

    if adjacency.iter().all(|peers| peers.len() == n - 1) {
        return n - 1;
    }

    // Esfahanian-Hakimi: fix a minimum-degree vertex v; the answer is the
    // minimum local connectivity between v and each non-neighbor, and
    // between each non-adjacent pair of v's neighbors.
    let v = (0..n)
        .min_by_key(|&u| adjacency[u].len())
        .unwrap_or_default();

    let mut best = n - 1;
    for w in 0..n {
        if w != v && !adjacency[v].contains(&w) {
            best = best.min(local_connectivity(&adjacency, v, w));
        }
    }

    let peers: Vec<usize> = adjacency[v].iter().copied().collect();
    for (i, &x) in peers.iter().enumerate() {
        for &y in &peers[i + 1..] {
            if !adjacency[x].contains(&y) {
                best = best.min(local_connectivity(&adjacency, x, y));
            }
        }
    }

    best
}

/// Effectively-unbounded arc capacity for the flow network.
const UNBOUNDED: usize = usize::MAX / 2;

/// Local vertex connectivity between two non-adjacent vertices: the
/// maximum number of internally vertex-disjoint paths, by max-flow on
/// the vertex-split network (every interior vertex becomes an
/// `in -> out` arc of capacity 1).
fn local_connectivity(adjacency: &[BTreeSet<usize>], source: usize, target: usize) -> usize {
    let n = adjacency.len();

    // Vertex u splits into nodes 2u (in) and 2u + 1 (out).
    let mut network = FlowNetwork::new(2 * n);
    for u in 0..n {
        let capacity = if u == source || u == target {
            UNBOUNDED
        } else {
            1
        };
        network.add_edge(2 * u, 2 * u + 1, capacity);
    }
    for (u, peers) in adjacency.iter().enumerate() {
        for &w in peers {
            network.add_edge(2 * u + 1, 2 * w, UNBOUNDED);
        }
    }

    network.max_flow(2 * source + 1, 2 * target)
}

/// Residual arc in the flow network.
struct FlowEdge {
    to: usize,
    capacity: usize,
    /// Position of the reverse arc in `edges[to]`.
    reverse: usize,
}

/// Adjacency-list flow network with Edmonds-Karp max-flow.
struct FlowNetwork {
    edges: Vec<Vec<FlowEdge>>,
}

impl FlowNetwork {
    fn new(nodes: usize) -> Self {
        Self {
            edges: (0..nodes).map(|_| Vec::new()).collect(),
        }
    }

    fn add_edge(&mut self, from: usize, to: usize, capacity: usize) {
        let reverse = self.edges[to].len();
        let forward = self.edges[from].len();
        self.edges[from].push(FlowEdge {
            to,
            capacity,
            reverse,
        });
        self.edges[to].push(FlowEdge {
            to: from,
            capacity: 0,
            reverse: forward,
        });
    }

    /// Maximum flow from `source` to `sink` via shortest augmenting
    /// paths (BFS).
    fn max_flow(&mut self, source: usize, sink: usize) -> usize {
        let mut flow = 0;

        loop {
            // BFS for an augmenting path, recording (node, arc) parents.
            let mut parent: Vec<Option<(usize, usize)>> = vec![None; self.edges.len()];
            let mut visited = vec![false; self.edges.len()];
            visited[source] = true;
            let mut queue = VecDeque::from([source]);

            'bfs: while let Some(u) = queue.pop_front() {
                for (arc, edge) in self.edges[u].iter().enumerate() {
                    if edge.capacity > 0 && !visited[edge.to] {
                        visited[edge.to] = true;
                        parent[edge.to] = Some((u, arc));
                        if edge.to == sink {
                            break 'bfs;
                        }
                        queue.push_back(edge.to);
                    }
                }
            }

            if !visited[sink] {
                return flow;
            }

            // Bottleneck along the recorded path. Every visited node has
            // a parent, so the walk always reaches the source.
            let mut bottleneck = usize::MAX;
            let mut node = sink;
            while node != source {
                let Some((u, arc)) = parent[node] else { break };
                bottleneck = bottleneck.min(self.edges[u][arc].capacity);
                node = u;
            }

            // Augment forward arcs, refund reverse arcs.
            let mut node = sink;
            while node != source {
                let Some((u, arc)) = parent[node] else { break };
                self.edges[u][arc].capacity -= bottleneck;
                let reverse = self.edges[u][arc].reverse;
                self.edges[node][reverse].capacity += bottleneck;
                node = u;
            }

            flow += bottleneck;
        }
    }
}
