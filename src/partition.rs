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

extern crate rand;

use rand::Rng;

use errors::{RatefoldError, Result};
use types::SparseMatrix;

/// Splits a matrix into `k` folds, stratified by row mean so that every fold
/// receives a near-equal share of each mean-rating band. The randomness is
/// caller-supplied, a seeded generator makes the fold membership reproducible.
///
/// Rows are bucketed into `layers` equal-width strata over the observed range
/// of row means. Within each stratum, rows are drawn uniformly at random and
/// dealt round-robin over the folds, which bounds the mean skew between folds
/// to the stratum width.
pub fn partition<R: Rng>(
    matrix: &SparseMatrix,
    k: usize,
    layers: usize,
    rng: &mut R,
) -> Result<Vec<SparseMatrix>> {

    if matrix.is_empty() {
        return Err(RatefoldError::EmptyMatrix);
    }
    if k == 0 {
        return Err(RatefoldError::Validation {
            line: None,
            reason: String::from("the number of folds must be positive"),
        });
    }
    if layers == 0 {
        return Err(RatefoldError::Validation {
            line: None,
            reason: String::from("the number of layers must be positive"),
        });
    }

    let mut means = Vec::with_capacity(matrix.num_users());
    for (&user, row) in matrix.rows() {
        means.push((user, row.mean()?));
    }

    let mut min_mean = f64::INFINITY;
    let mut max_mean = f64::NEG_INFINITY;
    for &(_, mean) in &means {
        if mean < min_mean {
            min_mean = mean;
        }
        if mean > max_mean {
            max_mean = mean;
        }
    }

    let width = (max_mean - min_mean) / layers as f64;

    let mut strata: Vec<Vec<u32>> = vec![Vec::new(); layers];

    for &(user, mean) in &means {
        // first stratum whose upper bound exceeds the mean, the last stratum
        // accepts unconditionally to guard the floating point edge at the top
        let mut stratum = layers - 1;
        for layer in 0..layers - 1 {
            let upper_bound = min_mean + width * (layer + 1) as f64;
            if mean < upper_bound {
                stratum = layer;
                break;
            }
        }
        strata[stratum].push(user);
    }

    let mut partitions: Vec<SparseMatrix> = (0..k)
        .map(|_| SparseMatrix::with_dimensions(matrix.dimensions()))
        .collect();

    for mut stratum in strata {
        let mut next_partition = 0;
        while !stratum.is_empty() {
            let drawn = rng.gen_range(0, stratum.len());
            let user = stratum.swap_remove(drawn);

            let row = matrix.row(user).unwrap().clone();
            partitions[next_partition].insert_row(user, row);

            next_partition = (next_partition + 1) % k;
        }
    }

    Ok(partitions)
}
