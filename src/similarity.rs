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
extern crate scoped_pool;

use std::cmp;
use std::sync::Mutex;

use fnv::FnvHashMap;
use scoped_pool::Pool;

use types::{SparseMatrix, SparseRow};

/// Pearson correlation over the items both users have rated. Fewer than two
/// common items means the coefficient is undefined and resolves to 0, as does
/// a zero variance on either side. The signed value is returned; callers that
/// use it as a prediction weight apply the non-negative floor themselves.
pub fn pearson(a: &SparseRow, b: &SparseRow) -> f64 {

    let mut x = Vec::new();
    let mut y = Vec::new();

    for (&item, &rating) in a.iter() {
        if let Some(other_rating) = b.get(item) {
            x.push(rating);
            y.push(other_rating);
        }
    }

    if x.len() < 2 {
        debug!("{} common items, not enough data for a correlation", x.len());
        return 0.0;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;

    for index in 0..x.len() {
        let delta_x = x[index] - mean_x;
        let delta_y = y[index] - mean_y;
        covariance += delta_x * delta_y;
        variance_x += delta_x * delta_x;
        variance_y += delta_y * delta_y;
    }

    let denominator = (variance_x * variance_y).sqrt();

    if denominator == 0.0 {
        debug!("zero variance on the common items, correlation undefined");
        return 0.0;
    }

    covariance / denominator
}

/// Symmetric cache of pairwise user similarity coefficients, stored once per
/// pair under the ordered key. Self-similarity is always 1 and never computed
/// via correlation.
pub struct SimilarityMatrix {
    coefficients: FnvHashMap<(u32, u32), f64>,
}

fn ordered_pair(a: u32, b: u32) -> (u32, u32) {
    if a <= b { (a, b) } else { (b, a) }
}

impl SimilarityMatrix {

    pub fn get(&self, a: u32, b: u32) -> f64 {
        if a == b {
            return 1.0;
        }
        *self.coefficients.get(&ordered_pair(a, b)).unwrap_or(&0.0)
    }

    pub fn num_pairs(&self) -> usize {
        self.coefficients.len()
    }

    /// Computes all pairwise coefficients for the matrix, parallelized across
    /// users. Each worker owns the pairs of one user against all later users,
    /// so every cache entry is written exactly once, and all writes complete
    /// before the pool scope returns.
    pub fn compute(matrix: &SparseMatrix, pool_size: usize) -> SimilarityMatrix {

        let users: Vec<u32> = matrix.users().collect();

        let mut slots: Vec<Mutex<Vec<(u32, u32, f64)>>> = Vec::with_capacity(users.len());
        for _ in 0..users.len() {
            slots.push(Mutex::new(Vec::new()));
        }

        let pool = Pool::new(cmp::max(pool_size, 1));

        pool.scoped(|scope| {
            for (index, &user) in users.iter().enumerate() {

                let slot = &slots[index];
                let reference_to_users = &users;

                scope.execute(move || {
                    let row = matrix.row(user).unwrap();
                    let mut pairs = slot.lock().unwrap();

                    for &other_user in &reference_to_users[index + 1..] {
                        let other_row = matrix.row(other_user).unwrap();
                        pairs.push((user, other_user, pearson(row, other_row)));
                    }
                });
            }
        });

        let num_pairs = users.len() * users.len().saturating_sub(1) / 2;
        let mut coefficients =
            FnvHashMap::with_capacity_and_hasher(num_pairs, Default::default());

        for slot in slots {
            for (user, other_user, coefficient) in slot.into_inner().unwrap() {
                coefficients.insert(ordered_pair(user, other_user), coefficient);
            }
        }

        SimilarityMatrix { coefficients }
    }
}


#[cfg(test)]
mod tests {

    use similarity::{pearson, SimilarityMatrix};
    use types::{SparseMatrix, SparseRow};

    fn row(entries: &[(u32, f64)]) -> SparseRow {
        let mut row = SparseRow::new();
        for &(item, rating) in entries {
            row.set(item, rating);
        }
        row
    }

    #[test]
    fn identical_rows_correlate_perfectly() {
        let a = row(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let b = row(&[(1, 1.0), (2, 2.0), (3, 3.0)]);

        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opposed_rows_correlate_negatively() {
        let a = row(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let b = row(&[(1, 3.0), (2, 2.0), (3, 1.0)]);

        assert!((pearson(&a, &b) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn known_coefficient() {
        let a = row(&[(1, 1.0), (2, 2.0), (3, 4.0)]);
        let b = row(&[(1, 2.0), (2, 4.0), (3, 5.0)]);

        // cross-checked by hand: 39 / 42
        assert!((pearson(&a, &b) - 0.928571428571).abs() < 1e-9);
    }

    #[test]
    fn too_little_overlap_resolves_to_zero() {
        let a = row(&[(1, 4.0), (2, 3.0)]);
        let b = row(&[(2, 5.0), (3, 1.0)]);

        assert_eq!(pearson(&a, &b), 0.0);
    }

    #[test]
    fn zero_variance_resolves_to_zero() {
        let a = row(&[(1, 3.0), (2, 3.0), (3, 3.0)]);
        let b = row(&[(1, 1.0), (2, 2.0), (3, 5.0)]);

        assert_eq!(pearson(&a, &b), 0.0);
    }

    #[test]
    fn cache_is_symmetric_with_unit_self_similarity() {
        let mut matrix = SparseMatrix::new();
        matrix.put(1, 10, 4.0);
        matrix.put(1, 20, 2.0);
        matrix.put(2, 10, 4.0);
        matrix.put(2, 20, 2.0);
        matrix.put(3, 10, 1.0);
        matrix.put(3, 20, 5.0);

        let similarities = SimilarityMatrix::compute(&matrix, 2);

        for user in matrix.users() {
            assert_eq!(similarities.get(user, user), 1.0);
        }
        for a in matrix.users() {
            for b in matrix.users() {
                assert_eq!(similarities.get(a, b), similarities.get(b, a));
            }
        }
        assert_eq!(similarities.num_pairs(), 3);
    }

    #[test]
    fn cache_stores_the_signed_coefficient() {
        let mut matrix = SparseMatrix::new();
        matrix.put(1, 10, 1.0);
        matrix.put(1, 20, 5.0);
        matrix.put(2, 10, 5.0);
        matrix.put(2, 20, 1.0);

        let similarities = SimilarityMatrix::compute(&matrix, 1);

        assert!((similarities.get(1, 2) + 1.0).abs() < 1e-12);
    }
}
