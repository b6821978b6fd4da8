use crate::error::{Error, Result};

/// Union-find over the indices `0..n` with path compression.
///
/// `union(i, j)` hangs the representative of `i` under the representative of
/// `j`; there is no union-by-rank, the candidate lists it clusters are short.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    /// `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    /// Like [`DisjointSet::new`], for sizes that arrive as signed integers.
    pub fn with_size(n: i64) -> Result<Self> {
        if n < 0 {
            return Err(Error::InvalidSetSize(n));
        }
        let n = usize::try_from(n).map_err(|_| Error::InvalidSetSize(n))?;
        Ok(Self::new(n))
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Representative of the set containing `i`.
    ///
    /// Iterative: one pass up to the root, a second pass pointing every node
    /// on the path straight at it.
    pub fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    pub fn union(&mut self, i: usize, j: usize) {
        let i_root = self.find(i);
        let j_root = self.find(j);
        self.parent[i_root] = j_root;
    }

    /// Number of distinct sets.
    pub fn set_count(&mut self) -> usize {
        (0..self.parent.len()).filter(|&i| self.find(i) == i).count()
    }
}
