/// A fixed-dimension vector storing only its non-zero entries, sorted by index.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn zeros(dim: usize) -> Self {
        SparseVector {
            dim,
            entries: Vec::new(),
        }
    }

    /// Build from unordered `(index, value)` pairs. Duplicate indices are summed,
    /// zeros and out-of-range indices are dropped.
    pub fn from_pairs(dim: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut entries: Vec<(usize, f64)> = pairs
            .into_iter()
            .filter(|(i, _)| *i < dim)
            .collect();
        entries.sort_by_key(|(i, _)| *i);

        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(entries.len());
        for (i, v) in entries {
            match merged.last_mut() {
                Some((last, acc)) if *last == i => *acc += v,
                _ => merged.push((i, v)),
            }
        }
        merged.retain(|(_, v)| *v != 0.0);

        SparseVector {
            dim,
            entries: merged,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .map(|(i, v)| dense.get(*i).copied().unwrap_or(0.0) * v)
            .sum()
    }

    pub fn l2_norm(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
    }

    pub fn l1_norm(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v.abs()).sum()
    }

    pub fn scale(&mut self, factor: f64) {
        for (_, v) in &mut self.entries {
            *v *= factor;
        }
    }

    /// Horizontal concatenation: `other`'s indices are shifted by `self.dim`.
    pub fn hstack(&self, other: &SparseVector) -> SparseVector {
        let mut entries = Vec::with_capacity(self.entries.len() + other.entries.len());
        entries.extend_from_slice(&self.entries);
        entries.extend(other.entries.iter().map(|(i, v)| (i + self.dim, *v)));
        SparseVector {
            dim: self.dim + other.dim,
            entries,
        }
    }
}
