//! # weir-matcher
//!
//! Multi-pattern substring containment queries over byte buffers.
//!
//! Patterns are inserted into a trie; queries run an Aho-Corasick-style
//! automaton whose suffix links and byte transitions are computed lazily on
//! first use and memoized. Construction work is proportional to the total
//! pattern length, and a query visits each input byte once, with amortized
//! constant-time transitions once a (vertex, byte) pair has been resolved.
//!
//! The automaton is built once (all patterns added before the first query)
//! and may then be shared freely across threads: suffix links live in
//! single-writer `OnceLock` cells and transition caches are filled
//! idempotently under a per-vertex lock.
//!
//! Every query restarts at the root. A pattern that straddles two separate
//! query buffers is therefore not detected; callers that need cross-buffer
//! matching must join the buffers before querying.
//!
//! ```
//! use weir_matcher::Automaton;
//!
//! let mut automaton = Automaton::new();
//! automaton.add(b"abc");
//! automaton.add(b"bcd");
//! assert!(automaton.contains_match(b"xxabcdxx"));
//! assert!(!automaton.contains_match(b"dog"));
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

/// Arena index of the root vertex.
const ROOT: u32 = 0;

/// One trie vertex.
///
/// Vertices live in an arena and refer to each other by index, so the
/// parent/suffix-link/transition graph needs no shared ownership.
struct Vertex {
    /// Explicit child edges created during construction.
    children: HashMap<u8, u32>,
    /// Parent vertex; the root is its own parent.
    parent: u32,
    /// Byte labeling the edge from `parent` to this vertex.
    edge: u8,
    /// A pattern ends at this vertex.
    terminal: bool,
    /// Longest proper suffix of this vertex's path that is also a trie
    /// path. Resolved on first use.
    link: OnceLock<u32>,
    /// Memoized transitions, including ones reached via suffix links.
    transitions: RwLock<HashMap<u8, u32>>,
}

impl Vertex {
    fn new(parent: u32, edge: u8) -> Self {
        Self {
            children: HashMap::new(),
            parent,
            edge,
            terminal: false,
            link: OnceLock::new(),
            transitions: RwLock::new(HashMap::new()),
        }
    }
}

/// Automaton answering "does this buffer contain any of the patterns".
pub struct Automaton {
    vertices: Vec<Vertex>,
    patterns: usize,
}

impl Automaton {
    /// Creates an empty automaton (matches nothing).
    pub fn new() -> Self {
        Self {
            vertices: vec![Vertex::new(ROOT, 0)],
            patterns: 0,
        }
    }

    /// Builds an automaton from an iterator of patterns.
    pub fn from_patterns<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut automaton = Self::new();
        for pattern in patterns {
            automaton.add(pattern.as_ref());
        }
        automaton
    }

    /// Inserts a pattern, sharing prefixes with existing patterns.
    ///
    /// All patterns must be added before the first query.
    pub fn add(&mut self, pattern: &[u8]) {
        let mut cur = ROOT;
        for &byte in pattern {
            let existing = self.vertices[cur as usize].children.get(&byte).copied();
            cur = match existing {
                Some(child) => child,
                None => {
                    let child = self.vertices.len() as u32;
                    self.vertices.push(Vertex::new(cur, byte));
                    self.vertices[cur as usize].children.insert(byte, child);
                    child
                }
            };
        }
        self.vertices[cur as usize].terminal = true;
        self.patterns += 1;
    }

    /// Number of patterns added.
    pub fn pattern_count(&self) -> usize {
        self.patterns
    }

    /// True if no patterns were added.
    pub fn is_empty(&self) -> bool {
        self.patterns == 0
    }

    /// Scans `haystack`, returning true as soon as any pattern ends at the
    /// current vertex. Matching always starts at the root; nothing carries
    /// over from previous calls.
    pub fn contains_match(&self, haystack: &[u8]) -> bool {
        let mut cur = ROOT;
        for &byte in haystack {
            cur = self.transition(cur, byte);
            if self.vertices[cur as usize].terminal {
                return true;
            }
        }
        false
    }

    /// Suffix link of `v`: the root links to itself, a depth-1 vertex links
    /// to the root, and any other vertex links through its parent's link.
    fn suffix_link(&self, v: u32) -> u32 {
        *self.vertices[v as usize].link.get_or_init(|| {
            let vertex = &self.vertices[v as usize];
            if v == ROOT || vertex.parent == ROOT {
                ROOT
            } else {
                self.transition(self.suffix_link(vertex.parent), vertex.edge)
            }
        })
    }

    /// Transition from `v` on `byte`: the explicit child if one exists,
    /// the root itself for a missing edge at the root, and otherwise the
    /// transition from the suffix link.
    ///
    /// Resolution recurses only through strictly shallower vertices, and no
    /// lock is held across the recursion. Concurrent fills compute the same
    /// value; the first writer wins.
    fn transition(&self, v: u32, byte: u8) -> u32 {
        let vertex = &self.vertices[v as usize];
        if let Some(&target) = vertex.transitions.read().get(&byte) {
            return target;
        }

        let target = match vertex.children.get(&byte) {
            Some(&child) => child,
            None if v == ROOT => ROOT,
            None => self.transition(self.suffix_link(v), byte),
        };

        vertex.transitions.write().entry(byte).or_insert(target);
        target
    }
}

impl Default for Automaton {
    fn default() -> Self {
        Self::new()
    }
}
