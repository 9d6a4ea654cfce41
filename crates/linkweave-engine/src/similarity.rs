//! Dense pairwise cosine similarity.

use linkweave_core::{Error, Result, Vector};

/// Square, symmetric cosine-similarity matrix stored row-major.
///
/// Row/column `i` corresponds to the page with `raw_index == i`. Lookups
/// outside the matrix are errors, never clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Compute the matrix for `vectors`. All vectors must share one length.
    /// Zero vectors have similarity 0 to everything, themselves included.
    pub fn from_vectors(vectors: &[Vector]) -> Result<Self> {
        let n = vectors.len();
        if let Some(first) = vectors.first() {
            let dim = first.len();
            if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
                return Err(Error::Inconsistency(format!(
                    "vector {} has length {}, expected {}",
                    i,
                    v.len(),
                    dim
                )));
            }
        }

        let unit: Vec<Option<Vec<f32>>> = vectors.iter().map(|v| normalized(v)).collect();
        let mut values = vec![0.0f32; n * n];
        for i in 0..n {
            let Some(a) = &unit[i] else { continue };
            values[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let Some(b) = &unit[j] else { continue };
                let cos = dot(a, b).clamp(-1.0, 1.0);
                values[i * n + j] = cos;
                values[j * n + i] = cos;
            }
        }

        let matrix = Self { n, values };
        matrix.check_dimension(n)?;
        Ok(matrix)
    }

    /// Fail unless the matrix has exactly `expected` rows.
    pub fn check_dimension(&self, expected: usize) -> Result<()> {
        if self.n != expected || self.values.len() != expected * expected {
            return Err(Error::Inconsistency(format!(
                "similarity matrix is {}x{} but {} pages are in the working set",
                self.n, self.n, expected
            )));
        }
        Ok(())
    }

    /// Similarity between rows `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> Result<f32> {
        self.row(i)?.get(j).copied().ok_or_else(|| {
            Error::Inconsistency(format!(
                "similarity lookup ({}, {}) outside {}x{} matrix",
                i, j, self.n, self.n
            ))
        })
    }

    /// Full row `i`.
    pub fn row(&self, i: usize) -> Result<&[f32]> {
        if i >= self.n {
            return Err(Error::Inconsistency(format!(
                "similarity row {} outside {}x{} matrix",
                i, self.n, self.n
            )));
        }
        Ok(&self.values[i * self.n..(i + 1) * self.n])
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalized(v: &[f32]) -> Option<Vec<f32>> {
    let magnitude = dot(v, v).sqrt();
    if magnitude > 0.0 && magnitude.is_finite() {
        Some(v.iter().map(|x| x / magnitude).collect())
    } else {
        None
    }
}
