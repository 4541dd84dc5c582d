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

use fnv::FnvHashMap;

use errors::{RatefoldError, Result};
use similarity;
use types::{SparseMatrix, SparseRow};

/// Paired model and held-out ratings, plus counts of the coverage gaps that
/// were skipped while pairing. Gaps are expected at fold boundaries and are
/// never an error.
pub struct AlignedPairs {
    pub predicted: Vec<f64>,
    pub actual: Vec<f64>,
    pub skipped_users: usize,
    pub skipped_items: usize,
}

impl AlignedPairs {

    fn new() -> Self {
        AlignedPairs { predicted: Vec::new(), actual: Vec::new(), skipped_users: 0, skipped_items: 0 }
    }

    pub fn len(&self) -> usize {
        self.predicted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicted.is_empty()
    }
}

/// Root mean squared error between predicted and actual ratings.
pub fn rmse(predicted: &[f64], actual: &[f64]) -> Result<f64> {

    if predicted.len() != actual.len() {
        return Err(RatefoldError::LengthMismatch {
            predicted: predicted.len(),
            actual: actual.len(),
        });
    }
    if predicted.is_empty() {
        return Err(RatefoldError::EmptyInput);
    }

    let squared_sum: f64 = predicted.iter()
        .zip(actual.iter())
        .map(|(p, a)| (p - a) * (p - a))
        .sum();

    Ok((squared_sum / predicted.len() as f64).sqrt())
}

/// Pairs every rated test item with the corresponding value of the group
/// profile its user is assigned to. Users without an assignment and items the
/// profile does not cover are counted and logged, not raised.
pub fn align_with_profiles(
    test: &SparseMatrix,
    profiles: &[SparseRow],
    assignments: &FnvHashMap<u32, usize>,
) -> AlignedPairs {

    let mut aligned = AlignedPairs::new();

    for (&user, row) in test.rows() {

        let profile = match assignments.get(&user).and_then(|&group| profiles.get(group)) {
            Some(profile) => profile,
            None => {
                warn!("user {} is not covered by the model, skipping", user);
                aligned.skipped_users += 1;
                continue;
            }
        };

        for (&item, &actual) in row.iter() {
            match profile.get(item) {
                Some(modelled) => {
                    aligned.predicted.push(modelled);
                    aligned.actual.push(actual);
                }
                None => aligned.skipped_items += 1,
            }
        }
    }

    if aligned.skipped_items > 0 {
        warn!("{} rated test items had no model coverage", aligned.skipped_items);
    }

    aligned
}

/// Pairs a test matrix against a predicted matrix, user by user.
pub fn align_with_matrix(test: &SparseMatrix, model: &SparseMatrix) -> AlignedPairs {

    let mut aligned = AlignedPairs::new();

    for (&user, row) in test.rows() {

        let model_row = match model.row(user) {
            Some(model_row) => model_row,
            None => {
                warn!("user {} is not covered by the model, skipping", user);
                aligned.skipped_users += 1;
                continue;
            }
        };

        for (&item, &actual) in row.iter() {
            match model_row.get(item) {
                Some(modelled) => {
                    aligned.predicted.push(modelled);
                    aligned.actual.push(actual);
                }
                None => aligned.skipped_items += 1,
            }
        }
    }

    if aligned.skipped_items > 0 {
        warn!("{} rated test items had no model coverage", aligned.skipped_items);
    }

    aligned
}

/// The most similar group profile for a row, by Pearson correlation over the
/// commonly rated items. Ties resolve to the lowest group index, empty
/// profiles never win. `None` if no profile has any entries.
pub fn nearest_profile(row: &SparseRow, profiles: &[SparseRow]) -> Option<usize> {

    let mut best: Option<(usize, f64)> = None;

    for (group, profile) in profiles.iter().enumerate() {
        if profile.is_empty() {
            continue;
        }

        let coefficient = similarity::pearson(row, profile);

        let better = match best {
            None => true,
            Some((_, best_coefficient)) => coefficient > best_coefficient,
        };
        if better {
            best = Some((group, coefficient));
        }
    }

    best.map(|(group, _)| group)
}


#[cfg(test)]
mod tests {

    use fnv::FnvHashMap;

    use errors::RatefoldError;
    use eval::{align_with_matrix, align_with_profiles, nearest_profile, rmse};
    use types::{SparseMatrix, SparseRow};

    #[test]
    fn rmse_of_identical_arrays_is_zero() {
        let values = [3.0, 1.5, 4.0, 2.0];
        assert_eq!(rmse(&values, &values).unwrap(), 0.0);
    }

    #[test]
    fn rmse_of_constant_offset_is_the_offset() {
        let predicted = [1.0, 1.0, 1.0, 1.0];
        let actual = [4.0, 4.0, 4.0, 4.0];

        assert_eq!(rmse(&predicted, &actual).unwrap(), 3.0);
    }

    #[test]
    fn rmse_rejects_length_mismatches() {
        match rmse(&[1.0, 2.0], &[1.0]) {
            Err(RatefoldError::LengthMismatch { predicted: 2, actual: 1 }) => {}
            other => panic!("expected a length mismatch, got {:?}", other),
        }
    }

    #[test]
    fn rmse_rejects_empty_input() {
        match rmse(&[], &[]) {
            Err(RatefoldError::EmptyInput) => {}
            other => panic!("expected an empty input error, got {:?}", other),
        }
    }

    #[test]
    fn alignment_pairs_covered_cells_and_counts_gaps() {
        let mut test = SparseMatrix::new();
        test.put(1, 10, 4.0);
        test.put(1, 20, 2.0);
        test.put(2, 10, 5.0);
        test.put(9, 10, 1.0);

        let mut profile = SparseRow::new();
        profile.set(10, 3.5);

        let mut assignments = FnvHashMap::default();
        assignments.insert(1, 0);
        assignments.insert(2, 0);

        let aligned = align_with_profiles(&test, &[profile], &assignments);

        // user 9 is unassigned, item 20 is uncovered
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned.skipped_users, 1);
        assert_eq!(aligned.skipped_items, 1);
        assert_eq!(aligned.predicted, vec![3.5, 3.5]);
        assert_eq!(aligned.actual, vec![4.0, 5.0]);
    }

    #[test]
    fn matrix_alignment_uses_the_identity_index() {
        let mut test = SparseMatrix::new();
        test.put(1, 10, 4.0);
        test.put(3, 20, 2.0);

        let mut model = SparseMatrix::new();
        model.put(1, 10, 3.0);
        model.put(1, 30, 1.0);

        let aligned = align_with_matrix(&test, &model);

        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned.predicted, vec![3.0]);
        assert_eq!(aligned.actual, vec![4.0]);
        assert_eq!(aligned.skipped_users, 1);
    }

    #[test]
    fn the_nearest_profile_wins() {
        let mut row = SparseRow::with_id(5);
        row.set(1, 1.0);
        row.set(2, 2.0);
        row.set(3, 3.0);

        let mut agreeing = SparseRow::new();
        agreeing.set(1, 2.0);
        agreeing.set(2, 3.0);
        agreeing.set(3, 4.0);

        let mut opposed = SparseRow::new();
        opposed.set(1, 5.0);
        opposed.set(2, 3.0);
        opposed.set(3, 1.0);

        assert_eq!(nearest_profile(&row, &[opposed.clone(), agreeing.clone()]), Some(1));
        assert_eq!(nearest_profile(&row, &[agreeing, opposed]), Some(0));
    }

    #[test]
    fn empty_profiles_never_win() {
        let mut row = SparseRow::with_id(5);
        row.set(1, 1.0);

        assert_eq!(nearest_profile(&row, &[SparseRow::new()]), None);
    }
}
