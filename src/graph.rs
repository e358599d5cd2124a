//! Simple undirected network stored as sorted neighbour lists per label.
//! Supports comma-separated (or any delimiter) edge-list parsing.

use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, BufReader, Read};

use crate::error::{Result, SaaError};

/// Vertex label as it appears in the edge list.
pub type NodeId = u32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Graph {
    name: String,
    /// `adj[v]` is sorted and free of duplicates; `v ∈ adj[v]` marks a self-loop.
    adj: BTreeMap<NodeId, Vec<NodeId>>,
    edges: usize,
}

impl Graph {
    /*────────── constructors ──────────*/

    /// Empty network called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), adj: BTreeMap::new(), edges: 0 }
    }

    /// Build from an explicit undirected edge list.
    pub fn from_edge_list(name: impl Into<String>, edges: &[(NodeId, NodeId)]) -> Self {
        let mut g = Self::new(name);
        for &(u, v) in edges {
            g.add_edge(u, v);
        }
        g
    }

    /// Complete graph on labels `0..n`.
    pub fn complete(name: impl Into<String>, n: NodeId) -> Self {
        let mut g = Self::new(name);
        for u in 0..n {
            g.add_vertex(u);
            for v in (u + 1)..n {
                g.add_edge(u, v);
            }
        }
        g
    }

    /// Circulant graph: vertex `i` is adjacent to `i ± o (mod n)` for every offset `o`.
    /// Offsets that are multiples of `n` add nothing.
    pub fn circulant(name: impl Into<String>, n: NodeId, offsets: &[NodeId]) -> Self {
        let mut g = Self::new(name);
        for i in 0..n {
            g.add_vertex(i);
        }
        if n == 0 {
            return g;
        }
        for i in 0..n {
            for &o in offsets {
                let o = o % n;
                if o == 0 { continue; }
                g.add_edge(i, (i + o) % n);
                g.add_edge(i, (i + n - o) % n);
            }
        }
        g
    }

    /// Parse an edge list: one undirected edge per non-empty line, two integer
    /// labels separated by `delimiter`. Vertices are declared by first appearance.
    pub fn parse_edge_list<R: Read>(
        name: impl Into<String>,
        reader: R,
        delimiter: &str,
    ) -> Result<Self> {
        let mut g = Self::new(name);

        for (i, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() { continue; }

            let malformed = || SaaError::MalformedEdge { line: i + 1, content: line.clone() };
            let mut parts = trimmed.split(delimiter).map(str::trim);
            let (Some(a), Some(b)) = (parts.next(), parts.next()) else {
                return Err(malformed());
            };
            if parts.next().is_some() {
                return Err(malformed());
            }
            let u = parse_label(a).ok_or_else(malformed)??;
            let v = parse_label(b).ok_or_else(malformed)??;
            g.add_edge(u, v);
        }
        Ok(g)
    }

    /*────────── getters ──────────*/

    #[inline] pub fn name(&self) -> &str { &self.name }
    #[inline] pub fn n(&self) -> usize { self.adj.len() }
    #[inline] pub fn m(&self) -> usize { self.edges }
    #[inline] pub fn is_empty(&self) -> bool { self.adj.is_empty() }

    #[inline]
    pub fn contains(&self, v: NodeId) -> bool {
        self.adj.contains_key(&v)
    }

    /// Vertex labels in ascending order.
    pub fn vertices(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adj.keys().copied()
    }

    /// Neighbours of `v` in ascending order (empty for unknown vertices).
    pub fn neighbors(&self, v: NodeId) -> &[NodeId] {
        self.adj.get(&v).map_or(&[], Vec::as_slice)
    }

    /// Degree of vertex v.
    #[inline]
    pub fn degree(&self, v: NodeId) -> usize {
        self.neighbors(v).len()
    }

    /// `(label, degree)` for every vertex, ascending by label.
    pub fn degrees(&self) -> Vec<(NodeId, usize)> {
        self.adj.iter().map(|(&v, nb)| (v, nb.len())).collect()
    }

    pub fn average_degree(&self) -> f64 {
        if self.is_empty() { return 0.0; }
        self.adj.values().map(Vec::len).sum::<usize>() as f64 / self.n() as f64
    }

    pub fn max_degree(&self) -> usize {
        self.adj.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn has_self_loops(&self) -> bool {
        self.adj.iter().any(|(v, nb)| nb.binary_search(v).is_ok())
    }

    /// Fails fast when a self-loop is present; everything downstream assumes none.
    pub fn ensure_simple(&self) -> Result<()> {
        if self.has_self_loops() { Err(SaaError::SelfLoops) } else { Ok(()) }
    }

    /// Smallest vertex label; decides the id offset of the detection matrix.
    pub fn min_label(&self) -> Result<NodeId> {
        self.adj.keys().next().copied().ok_or(SaaError::EmptyGraph)
    }

    /*────────── mutators ──────────*/

    pub fn add_vertex(&mut self, v: NodeId) {
        self.adj.entry(v).or_default();
    }

    /// Insert undirected edge `{u, v}`; repeated edges are ignored.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId) {
        let fresh = insert_sorted(self.adj.entry(u).or_default(), v);
        if u != v {
            insert_sorted(self.adj.entry(v).or_default(), u);
        }
        if fresh {
            self.edges += 1;
        }
    }

    pub fn remove_self_loops(&mut self) {
        let mut removed = 0usize;
        for (v, nb) in self.adj.iter_mut() {
            if let Ok(pos) = nb.binary_search(v) {
                nb.remove(pos);
                removed += 1;
            }
        }
        self.edges -= removed;
    }

    /// Restrict the network to one of its largest connected components.
    /// Among equally large components the one holding the smallest label wins.
    pub fn largest_component(&self) -> Self {
        let mut seen: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut sizes: Vec<usize> = Vec::new();

        for start in self.vertices() {
            if seen.contains_key(&start) { continue; }
            let comp = sizes.len();
            let mut size = 0usize;
            let mut queue = VecDeque::from([start]);
            seen.insert(start, comp);
            while let Some(u) = queue.pop_front() {
                size += 1;
                for &w in self.neighbors(u) {
                    if !seen.contains_key(&w) {
                        seen.insert(w, comp);
                        queue.push_back(w);
                    }
                }
            }
            sizes.push(size);
        }

        let Some(best) = sizes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(c, _)| c)
        else {
            return Self::new(self.name.clone());
        };

        let mut g = Self::new(self.name.clone());
        for (&v, nb) in &self.adj {
            if seen.get(&v) != Some(&best) { continue; }
            g.add_vertex(v);
            for &w in nb.iter().filter(|&&w| w >= v) {
                g.add_edge(v, w);
            }
        }
        g
    }
}

/// `Some(Err)` for negative labels, `None` for anything that is not an integer.
fn parse_label(token: &str) -> Option<Result<NodeId>> {
    let raw: i64 = token.parse().ok()?;
    if raw < 0 {
        return Some(Err(SaaError::NegativeLabel(raw)));
    }
    NodeId::try_from(raw).ok().map(Ok)
}

fn insert_sorted(list: &mut Vec<NodeId>, v: NodeId) -> bool {
    match list.binary_search(&v) {
        Ok(_) => false,
        Err(pos) => {
            list.insert(pos, v);
            true
        }
    }
}

/*────────────────── unit checks ──────────────────*/
