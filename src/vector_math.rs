use ndarray::{Array2, Axis};
use std::cmp::Ordering;

/// Cosine similarity; 0.0 when either vector has zero length or norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    let denom = norm_a * norm_b;
    if denom <= f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Euclidean distance
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale to unit length in place; zero vectors are left untouched
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Pairwise cosine similarities between the rows of `left` and `right`.
///
/// Entry `(i, j)` is `cosine(left[i], right[j])`. Rows shorter than the
/// longest row are zero-padded.
pub fn cosine_similarity_matrix(left: &[Vec<f32>], right: &[Vec<f32>]) -> Array2<f32> {
    let dim = left
        .iter()
        .chain(right.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let a = unit_rows(left, dim);
    let b = unit_rows(right, dim);
    a.dot(&b.t())
}

fn unit_rows(rows: &[Vec<f32>], dim: usize) -> Array2<f32> {
    let mut matrix = Array2::<f32>::zeros((rows.len(), dim));
    for (mut target, source) in matrix.axis_iter_mut(Axis(0)).zip(rows.iter()) {
        let norm = l2_norm(source);
        if norm <= f32::EPSILON {
            continue;
        }
        for (t, s) in target.iter_mut().zip(source.iter()) {
            *t = s / norm;
        }
    }
    matrix
}

/// Indices sorted by descending score; equal scores keep input order
pub fn rank_descending(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&l, &r| scores[r].partial_cmp(&scores[l]).unwrap_or(Ordering::Equal));
    order
}
