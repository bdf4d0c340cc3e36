//! Maximal marginal relevance selection

use crate::vector_math::cosine_similarity_matrix;

/// Greedily pick up to `k` candidates trading relevance against redundancy
///
/// The first pick is the candidate most similar to the query, whatever
/// `lambda_mult` is. Each later round scores every remaining candidate as
/// `lambda * sim(query, i) - (1 - lambda) * max(sim(i, j) for j in selected)`
/// and keeps the highest score. Ties go to the lowest index. Candidates
/// scoring NaN are skipped.
///
/// Returns indices into `candidates` in selection order, never repeating and
/// never longer than `min(k, candidates.len())`.
pub fn diversify(
    query_embedding: &[f32],
    candidate_embeddings: &[Vec<f32>],
    k: usize,
    lambda_mult: f32,
) -> Vec<usize> {
    let n = candidate_embeddings.len();
    let k = k.min(n);
    if k == 0 {
        return Vec::new();
    }

    let relevance = cosine_similarity_matrix(&[query_embedding.to_vec()], candidate_embeddings);
    let pairwise = cosine_similarity_matrix(candidate_embeddings, candidate_embeddings);

    let mut selected = Vec::with_capacity(k);
    let mut remaining = vec![true; n];
    let mut redundancy = vec![f32::NEG_INFINITY; n];

    while selected.len() < k {
        let scores = (0..n).filter(|&i| remaining[i]).map(|i| {
            if selected.is_empty() {
                (i, relevance[[0, i]])
            } else {
                let score = lambda_mult * relevance[[0, i]] - (1.0 - lambda_mult) * redundancy[i];
                (i, score)
            }
        });

        let Some(pick) = argmax(scores) else {
            break;
        };

        selected.push(pick);
        remaining[pick] = false;
        for (i, r) in redundancy.iter_mut().enumerate() {
            *r = r.max(pairwise[[pick, i]]);
        }
    }

    tracing::debug!("MMR selected {:?} from {} candidates", selected, n);

    selected
}

/// Index of the highest non-NaN score, lowest index on ties
fn argmax(scores: impl Iterator<Item = (usize, f32)>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, score) in scores.filter(|(_, s)| !s.is_nan()) {
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_math::{cosine_similarity, rank_descending};

    fn sample() -> (Vec<f32>, Vec<Vec<f32>>) {
        let query = vec![1.0, 0.0, 0.0];
        let candidates = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.99, 0.1, 0.0],
            vec![0.7, 0.0, 0.7],
            vec![0.6, 0.8, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        (query, candidates)
    }

    #[test]
    fn test_no_repeats_and_bounded() {
        let (query, candidates) = sample();
        for k in 0..8 {
            for lambda in [0.0, 0.3, 0.7, 1.0] {
                let picks = diversify(&query, &candidates, k, lambda);
                assert!(picks.len() <= k.min(candidates.len()));
                let mut dedup = picks.clone();
                dedup.sort_unstable();
                dedup.dedup();
                assert_eq!(dedup.len(), picks.len());
            }
        }
    }

    #[test]
    fn test_lambda_one_is_relevance_order() {
        let (query, candidates) = sample();
        let scores: Vec<f32> = candidates
            .iter()
            .map(|c| cosine_similarity(&query, c))
            .collect();
        let expected: Vec<usize> = rank_descending(&scores).into_iter().take(4).collect();

        assert_eq!(diversify(&query, &candidates, 4, 1.0), expected);
    }

    #[test]
    fn test_lambda_zero_avoids_near_duplicate() {
        let (query, candidates) = sample();
        let picks = diversify(&query, &candidates, 2, 0.0);
        assert_eq!(picks[0], 0);
        // Candidate 1 is the closest to the first pick
        assert_ne!(picks[1], 1);
    }

    #[test]
    fn test_low_lambda_prefers_orthogonal_second_pick() {
        let (query, candidates) = sample();
        let picks = diversify(&query, &candidates, 2, 0.3);
        assert_eq!(picks, vec![0, 4]);
    }

    #[test]
    fn test_first_pick_is_most_relevant_at_any_lambda() {
        let query = vec![1.0, 0.0, 0.0];
        let candidates = vec![vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0], vec![1.0, 0.0, 0.0]];
        for lambda in [0.0, 0.5, 1.0] {
            assert_eq!(diversify(&query, &candidates, 1, lambda), vec![2]);
        }
        // Then the redundancy term takes over at zero lambda
        assert_eq!(diversify(&query, &candidates, 2, 0.0), vec![2, 0]);
    }

    #[test]
    fn test_ties_take_lowest_index() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0], vec![0.0, 2.0], vec![0.0, 3.0]];
        assert_eq!(diversify(&query, &candidates, 1, 1.0), vec![0]);
    }

    #[test]
    fn test_empty_inputs() {
        let query = vec![1.0, 0.0];
        assert!(diversify(&query, &[], 3, 0.7).is_empty());
        assert!(diversify(&query, &[vec![1.0, 0.0]], 0, 0.7).is_empty());
    }

    #[test]
    fn test_nan_candidates_are_skipped() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![f32::NAN, 0.0], vec![0.5, 0.5]];
        assert_eq!(diversify(&query, &candidates, 2, 1.0), vec![1]);
    }
}
