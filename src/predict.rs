/**
 * RateFold
 * Copyright (C) 2019 The RateFold developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

extern crate fnv;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fnv::FnvHashMap;

use errors::{RatefoldError, Result};
use similarity::SimilarityMatrix;
use types::{SparseMatrix, MAX_RATING, MIN_RATING};

/// A filled matrix plus the cells for which no neighbour vote was available.
/// Those cells carry the row mean of their user, the documented fallback for
/// a zero similarity-weight denominator.
pub struct Prediction {
    pub matrix: SparseMatrix,
    pub mean_fallbacks: Vec<(u32, u32)>,
}

/// Candidate neighbour ranked for the top-k heap. The ordering is reversed so
/// that the weakest candidate sits on top and can be replaced, and ties are
/// broken by ascending user id to keep neighbourhoods deterministic.
#[derive(PartialEq, Debug)]
struct ScoredNeighbour {
    user: u32,
    similarity: f64,
}

fn cmp_reverse(a: &ScoredNeighbour, b: &ScoredNeighbour) -> Ordering {
    match a.similarity.partial_cmp(&b.similarity) {
        Some(Ordering::Less) => Ordering::Greater,
        Some(Ordering::Greater) => Ordering::Less,
        _ => a.user.cmp(&b.user),
    }
}

impl Eq for ScoredNeighbour {}

impl Ord for ScoredNeighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_reverse(self, other)
    }
}

impl PartialOrd for ScoredNeighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_reverse(self, other))
    }
}

/// The `neighbourhood_size` users most similar to `user`, best first.
fn top_neighbours(
    user: u32,
    users: &[u32],
    similarities: &SimilarityMatrix,
    neighbourhood_size: usize,
) -> Vec<ScoredNeighbour> {

    if neighbourhood_size == 0 {
        return Vec::new();
    }

    let mut heap = BinaryHeap::with_capacity(neighbourhood_size);

    for &other_user in users {
        if other_user == user {
            continue;
        }

        let scored = ScoredNeighbour {
            user: other_user,
            similarity: similarities.get(user, other_user),
        };

        if heap.len() < neighbourhood_size {
            heap.push(scored);
        } else {
            let mut top = heap.peek_mut().unwrap();
            if scored < *top {
                *top = scored;
            }
        }
    }

    heap.into_sorted_vec()
}

/// Fills every unrated cell of the matrix via similarity-weighted neighbour
/// voting. The similarity matrix is computed once for the batch; `pool_size`
/// workers share the pairwise computation.
pub fn predict(
    matrix: &SparseMatrix,
    neighbourhood_size: usize,
    pool_size: usize,
) -> Result<Prediction> {
    let similarities = SimilarityMatrix::compute(matrix, pool_size);
    predict_with_similarities(matrix, &similarities, neighbourhood_size)
}

/// For each user u and each unrated item i:
///
/// `prediction = mean(u) + sum sim(u,v) * (rating(v,i) - mean(v)) / sum sim(u,v)`
///
/// over the neighbours v of u that rated i, with negative similarities floored
/// to 0 at use time. Cells where the weight sum is 0 fall back to `mean(u)`
/// and are reported. Only items rated by at least one user are considered.
/// A prediction outside the rating domain aborts the batch, it indicates a
/// weighting bug rather than a data artifact.
pub fn predict_with_similarities(
    matrix: &SparseMatrix,
    similarities: &SimilarityMatrix,
    neighbourhood_size: usize,
) -> Result<Prediction> {

    let users: Vec<u32> = matrix.users().collect();
    let items = matrix.items();

    let mut means = FnvHashMap::with_capacity_and_hasher(users.len(), Default::default());
    for &user in &users {
        means.insert(user, matrix.mean(user)?);
    }

    let mut filled = matrix.clone();
    let mut mean_fallbacks = Vec::new();

    for &user in &users {

        let neighbours = top_neighbours(user, &users, similarities, neighbourhood_size);
        let user_mean = means[&user];

        for &item in &items {

            if matrix.get(user, item).is_some() {
                continue;
            }

            let mut weighted_deviations = 0.0;
            let mut weight_sum = 0.0;

            for neighbour in &neighbours {
                let rating = match matrix.get(neighbour.user, item) {
                    Some(rating) => rating,
                    None => continue,
                };

                let weight = neighbour.similarity.max(0.0);
                if weight == 0.0 {
                    continue;
                }

                weighted_deviations += weight * (rating - means[&neighbour.user]);
                weight_sum += weight;
            }

            let predicted = if weight_sum > 0.0 {
                user_mean + weighted_deviations / weight_sum
            } else {
                mean_fallbacks.push((user, item));
                user_mean
            };

            if predicted < MIN_RATING || predicted > MAX_RATING {
                return Err(RatefoldError::PredictionRange { user, item, value: predicted });
            }

            filled.put(user, item, predicted);
        }
    }

    if !mean_fallbacks.is_empty() {
        warn!(
            "{} cells had no usable neighbour votes and carry the row mean instead",
            mean_fallbacks.len()
        );
    }

    // prediction only fills cells, the user set must survive unchanged
    assert_eq!(filled.num_users(), matrix.num_users());

    Ok(Prediction { matrix: filled, mean_fallbacks })
}


#[cfg(test)]
mod tests {

    use errors::RatefoldError;
    use predict::predict;
    use types::{SparseMatrix, MAX_RATING, MIN_RATING};

    fn example_matrix() -> SparseMatrix {
        let mut matrix = SparseMatrix::new();
        matrix.put(1, 10, 4.0);
        matrix.put(1, 20, 2.0);
        matrix.put(2, 10, 4.0);
        matrix.put(2, 20, 2.0);
        matrix.put(2, 30, 5.0);
        matrix.put(3, 10, 1.0);
        matrix.put(3, 20, 5.0);
        matrix.put(3, 30, 1.0);
        matrix
    }

    #[test]
    fn prediction_follows_the_strongest_neighbour() {
        let matrix = example_matrix();

        let prediction = predict(&matrix, 2, 1).unwrap();

        // user 2 correlates perfectly with user 1, user 3 negatively; only the
        // deviation of user 2 on item 30 counts: 3.0 + (5.0 - 11.0 / 3.0)
        let predicted = prediction.matrix.get(1, 30).unwrap();
        assert!((predicted - (3.0 + (5.0 - 11.0 / 3.0))).abs() < 1e-9);
        assert!(prediction.mean_fallbacks.is_empty());
    }

    #[test]
    fn every_unrated_cell_is_filled_and_in_domain() {
        let matrix = example_matrix();

        let prediction = predict(&matrix, 2, 1).unwrap();

        for user in prediction.matrix.users() {
            for &item in &prediction.matrix.items() {
                let rating = prediction.matrix.get(user, item).unwrap();
                assert!(rating >= MIN_RATING && rating <= MAX_RATING);
            }
        }
    }

    #[test]
    fn rated_cells_survive_unchanged() {
        let matrix = example_matrix();

        let prediction = predict(&matrix, 2, 1).unwrap();

        assert_eq!(prediction.matrix.get(1, 10), Some(4.0));
        assert_eq!(prediction.matrix.get(3, 30), Some(1.0));
        assert_eq!(prediction.matrix.num_users(), matrix.num_users());
    }

    #[test]
    fn cells_without_votes_fall_back_to_the_row_mean() {
        let mut matrix = example_matrix();
        // item 40 is only rated by user 3, who correlates negatively with
        // user 1, so user 1 receives no usable vote for it
        matrix.put(3, 40, 2.0);

        let prediction = predict(&matrix, 2, 1).unwrap();

        assert!(prediction.mean_fallbacks.contains(&(1, 40)));
        assert_eq!(prediction.matrix.get(1, 40), Some(3.0));
    }

    #[test]
    fn out_of_domain_predictions_abort_the_batch() {
        let mut matrix = SparseMatrix::new();
        matrix.put(1, 1, 4.0);
        matrix.put(1, 2, 5.0);
        matrix.put(2, 1, 1.0);
        matrix.put(2, 2, 5.0);
        matrix.put(2, 3, 5.0);

        // users 1 and 2 correlate perfectly, and the deviation of user 2 on
        // item 3 pushes user 1 beyond the maximum rating
        match predict(&matrix, 1, 1) {
            Err(RatefoldError::PredictionRange { user: 1, item: 3, .. }) => {}
            other => panic!("expected a range violation, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn zero_neighbourhood_means_every_prediction_is_a_fallback() {
        let matrix = example_matrix();

        let prediction = predict(&matrix, 0, 1).unwrap();

        // item 30 for user 1 is the only unrated cell of the example
        assert_eq!(prediction.mean_fallbacks, vec![(1, 30)]);
        assert_eq!(prediction.matrix.get(1, 30), Some(3.0));
    }
}
