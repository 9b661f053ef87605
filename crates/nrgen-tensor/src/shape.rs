use crate::error::{Result, TensorError};

/// Largest supported tensor rank.
pub const MAX_RANK: usize = 4;

/// Index space of a rank-`R` tensor with every slot ranging over `0..dim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    rank: usize,
    dim: usize,
}

impl Shape {
    pub fn new(rank: usize, dim: usize) -> Result<Self> {
        if rank > MAX_RANK {
            return Err(TensorError::RankOutOfRange(rank));
        }
        if dim == 0 {
            return Err(TensorError::ZeroDimension);
        }
        Ok(Self { rank, dim })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn numel(&self) -> usize {
        self.dim.pow(self.rank as u32)
    }

    /// Compute contiguous row-major strides.
    pub fn contiguous_strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.rank];
        for i in (0..self.rank.saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dim;
        }
        strides
    }

    /// Flat offset of a multi-index, checked against the shape.
    pub fn offset(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.rank || index.iter().any(|&i| i >= self.dim) {
            return Err(TensorError::IndexOutOfRange {
                index: index.to_vec(),
                rank: self.rank,
                dim: self.dim,
            });
        }
        Ok(index.iter().fold(0, |acc, &i| acc * self.dim + i))
    }

    /// Every multi-index in row-major (lexicographic) order.
    pub fn indices(&self) -> Indices {
        Indices {
            dim: self.dim,
            next: Some(vec![0; self.rank]),
        }
    }
}

/// Row-major multi-index iterator returned by [`Shape::indices`].
pub struct Indices {
    dim: usize,
    next: Option<Vec<usize>>,
}

impl Iterator for Indices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut idx = current.clone();
        // Increment the multi-index from the last slot.
        for d in (0..idx.len()).rev() {
            idx[d] += 1;
            if idx[d] < self.dim {
                self.next = Some(idx);
                break;
            }
            idx[d] = 0;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_basics() {
        let s = Shape::new(3, 4).unwrap();
        assert_eq!(s.numel(), 64);
        assert_eq!(s.contiguous_strides(), vec![16, 4, 1]);
        assert_eq!(s.offset(&[1, 2, 3]).unwrap(), 16 + 8 + 3);
    }

    #[test]
    fn scalar_shape_has_one_index() {
        let s = Shape::new(0, 3).unwrap();
        assert_eq!(s.numel(), 1);
        assert_eq!(s.indices().collect::<Vec<_>>(), vec![Vec::<usize>::new()]);
        assert_eq!(s.offset(&[]).unwrap(), 0);
    }

    #[test]
    fn indices_are_row_major() {
        let s = Shape::new(2, 2).unwrap();
        let all: Vec<_> = s.indices().collect();
        assert_eq!(all, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
        for (flat, idx) in s.indices().enumerate() {
            assert_eq!(s.offset(&idx).unwrap(), flat);
        }
    }

    #[test]
    fn rejects_bad_shapes_and_indices() {
        assert_eq!(Shape::new(5, 3), Err(TensorError::RankOutOfRange(5)));
        assert_eq!(Shape::new(1, 0), Err(TensorError::ZeroDimension));
        let s = Shape::new(2, 3).unwrap();
        assert!(matches!(s.offset(&[0, 3]), Err(TensorError::IndexOutOfRange { .. })));
        assert!(matches!(s.offset(&[0]), Err(TensorError::IndexOutOfRange { .. })));
    }
}
