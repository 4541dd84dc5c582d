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

use std::collections::{BTreeMap, BTreeSet};

use errors::{RatefoldError, Result};

pub type DenseVector = Vec<f64>;

/// Conventional rating domain. Ratings below the minimum are rejected at
/// ingestion time, predictions outside the domain are fatal.
pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

/// Rows that carry a provenance identifier through partitioning and clustering.
pub trait Identifiable {
    fn id(&self) -> Option<u32>;
}

/// Rows that can be projected to a fixed-length dense vector, as consumed by
/// external clustering routines.
pub trait DenseProjectable {
    fn dimensions(&self) -> usize;
    fn dense_projection(&self) -> DenseVector;
}

/// A single user's ratings: an ordered item -> rating mapping with an optional
/// provenance identifier, an optional explicit mean override and a declared
/// dimensionality used for the dense projection.
#[derive(Debug, Clone)]
pub struct SparseRow {
    id: Option<u32>,
    ratings: BTreeMap<u32, f64>,
    explicit_mean: Option<f64>,
    dimensions: usize,
}

impl SparseRow {

    pub fn new() -> Self {
        SparseRow { id: None, ratings: BTreeMap::new(), explicit_mean: None, dimensions: 0 }
    }

    pub fn with_id(id: u32) -> Self {
        SparseRow { id: Some(id), ratings: BTreeMap::new(), explicit_mean: None, dimensions: 0 }
    }

    pub fn get(&self, item: u32) -> Option<f64> {
        self.ratings.get(&item).cloned()
    }

    /// Inserts or overwrites the rating for an item. The declared
    /// dimensionality grows to cover the item if necessary.
    pub fn set(&mut self, item: u32, rating: f64) {
        self.ratings.insert(item, rating);
        if item as usize + 1 > self.dimensions {
            self.dimensions = item as usize + 1;
        }
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = (&'a u32, &'a f64)> {
        self.ratings.iter()
    }

    pub fn entries(&self) -> &BTreeMap<u32, f64> {
        &self.ratings
    }

    /// The effective mean: an explicit override always wins, otherwise the
    /// arithmetic mean of the present ratings.
    pub fn mean(&self) -> Result<f64> {
        if let Some(mean) = self.explicit_mean {
            return Ok(mean);
        }
        if self.ratings.is_empty() {
            return Err(RatefoldError::EmptyRow { user: self.id });
        }
        let sum: f64 = self.ratings.values().sum();
        Ok(sum / self.ratings.len() as f64)
    }

    pub fn set_mean(&mut self, mean: f64) {
        self.explicit_mean = Some(mean);
    }

    pub fn explicit_mean(&self) -> Option<f64> {
        self.explicit_mean
    }

    /// Raises the declared dimensionality. The dimensionality never drops
    /// below max item id + 1, so a lower value is ignored.
    pub fn declare_dimensions(&mut self, dimensions: usize) {
        if dimensions > self.dimensions {
            self.dimensions = dimensions;
        }
    }
}

impl Identifiable for SparseRow {
    fn id(&self) -> Option<u32> {
        self.id
    }
}

impl DenseProjectable for SparseRow {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Projection of declared length, unrated slots are zero.
    fn dense_projection(&self) -> DenseVector {
        let mut projection = vec![0.0; self.dimensions];
        for (&item, &rating) in &self.ratings {
            projection[item as usize] = rating;
        }
        projection
    }
}

/// Value equality: same identifier, same entries, same effective mean. The
/// declared dimensionality is deliberately not part of the comparison.
impl PartialEq for SparseRow {
    fn eq(&self, other: &SparseRow) -> bool {
        self.id == other.id
            && self.ratings == other.ratings
            && self.mean().ok() == other.mean().ok()
    }
}

/// An ordered user -> row store of sparse ratings.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: BTreeMap<u32, SparseRow>,
    dimensions: usize,
}

impl SparseMatrix {

    pub fn new() -> Self {
        SparseMatrix { rows: BTreeMap::new(), dimensions: 0 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        SparseMatrix { rows: BTreeMap::new(), dimensions }
    }

    pub fn num_users(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn get(&self, user: u32, item: u32) -> Option<f64> {
        self.rows.get(&user).and_then(|row| row.get(item))
    }

    /// Merges a rating into the user's row, creating the row on first contact.
    /// A rating for an already rated item overwrites the previous value.
    pub fn put(&mut self, user: u32, item: u32, rating: f64) {
        let row = self.rows.entry(user).or_insert_with(|| SparseRow::with_id(user));
        row.set(item, rating);
        if item as usize + 1 > self.dimensions {
            self.dimensions = item as usize + 1;
        }
    }

    /// Inserts a complete row, keeping the row's own identifier. The matrix
    /// dimensionality grows to cover the row.
    pub fn insert_row(&mut self, user: u32, row: SparseRow) {
        if row.dimensions() > self.dimensions {
            self.dimensions = row.dimensions();
        }
        self.rows.insert(user, row);
    }

    pub fn row(&self, user: u32) -> Option<&SparseRow> {
        self.rows.get(&user)
    }

    pub fn mean(&self, user: u32) -> Result<f64> {
        match self.rows.get(&user) {
            Some(row) => row.mean(),
            None => Err(RatefoldError::EmptyRow { user: Some(user) }),
        }
    }

    pub fn dense_projection(&self, user: u32) -> Option<DenseVector> {
        self.rows.get(&user).map(|row| row.dense_projection())
    }

    pub fn users<'a>(&'a self) -> impl Iterator<Item = u32> + 'a {
        self.rows.keys().cloned()
    }

    pub fn rows<'a>(&'a self) -> impl Iterator<Item = (&'a u32, &'a SparseRow)> {
        self.rows.iter()
    }

    /// Distinct rated item ids in ascending order.
    pub fn items(&self) -> Vec<u32> {
        let mut items = BTreeSet::new();
        for row in self.rows.values() {
            for (&item, _) in row.iter() {
                items.insert(item);
            }
        }
        items.into_iter().collect()
    }

    /// Stamps the matrix-level dimensionality onto every row, so that all rows
    /// handed to a clustering or modeling pass share one declared size.
    pub fn align_dimensions(&mut self) {
        let dimensions = self.dimensions;
        for row in self.rows.values_mut() {
            row.declare_dimensions(dimensions);
        }
    }

    /// Bulk merge of another matrix: item entries accumulate into existing
    /// rows, explicit mean overrides of incoming rows are carried over.
    pub fn merge(&mut self, other: &SparseMatrix) {
        for (&user, incoming) in other.rows() {
            let row = self.rows.entry(user).or_insert_with(|| SparseRow::with_id(user));
            for (&item, &rating) in incoming.iter() {
                row.set(item, rating);
            }
            if let Some(mean) = incoming.explicit_mean() {
                row.set_mean(mean);
            }
        }
        if other.dimensions > self.dimensions {
            self.dimensions = other.dimensions;
        }
    }
}


#[cfg(test)]
mod tests {

    use types::{DenseProjectable, Identifiable, SparseMatrix, SparseRow};

    #[test]
    fn row_mean_is_derived_from_present_ratings() {
        let mut row = SparseRow::with_id(1);
        row.set(10, 4.0);
        row.set(20, 2.0);
        row.set(30, 3.0);

        assert_eq!(row.mean().unwrap(), 3.0);
    }

    #[test]
    fn explicit_mean_override_wins() {
        let mut row = SparseRow::with_id(1);
        row.set(10, 4.0);
        row.set_mean(2.5);

        assert_eq!(row.mean().unwrap(), 2.5);
    }

    #[test]
    fn mean_of_empty_row_is_an_error() {
        let row = SparseRow::new();
        assert!(row.mean().is_err());
    }

    #[test]
    fn dense_projection_has_declared_length_with_zeroed_gaps() {
        let mut row = SparseRow::with_id(3);
        row.set(1, 5.0);
        row.set(4, 2.0);
        row.declare_dimensions(8);

        let projection = row.dense_projection();

        assert_eq!(projection.len(), 8);
        assert_eq!(projection[1], 5.0);
        assert_eq!(projection[4], 2.0);
        assert_eq!(projection[0], 0.0);
        assert_eq!(projection[7], 0.0);
    }

    #[test]
    fn declared_dimensions_never_drop_below_derived() {
        let mut row = SparseRow::new();
        row.set(9, 1.0);
        row.declare_dimensions(4);

        assert_eq!(row.dimensions(), 10);
    }

    #[test]
    fn deep_clone_is_equal_but_independent() {
        let mut row = SparseRow::with_id(7);
        row.set(1, 4.0);
        row.set(2, 3.0);

        let mut cloned = row.clone();

        assert_eq!(cloned, row);

        cloned.set(3, 5.0);
        assert_ne!(cloned, row);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn put_merges_into_existing_rows() {
        let mut matrix = SparseMatrix::new();
        matrix.put(1, 10, 3.0);
        matrix.put(1, 20, 4.0);
        matrix.put(1, 10, 5.0);

        assert_eq!(matrix.num_users(), 1);
        assert_eq!(matrix.get(1, 10), Some(5.0));
        assert_eq!(matrix.get(1, 20), Some(4.0));
        assert_eq!(matrix.row(1).unwrap().id(), Some(1));
    }

    #[test]
    fn align_dimensions_stamps_every_row() {
        let mut matrix = SparseMatrix::new();
        matrix.put(1, 2, 3.0);
        matrix.put(2, 9, 4.0);
        matrix.align_dimensions();

        assert_eq!(matrix.row(1).unwrap().dimensions(), 10);
        assert_eq!(matrix.row(2).unwrap().dimensions(), 10);
    }

    #[test]
    fn merge_accumulates_rows_and_entries() {
        let mut left = SparseMatrix::new();
        left.put(1, 10, 3.0);
        left.put(2, 10, 4.0);

        let mut right = SparseMatrix::new();
        right.put(1, 20, 5.0);
        right.put(3, 10, 2.0);

        left.merge(&right);

        assert_eq!(left.num_users(), 3);
        assert_eq!(left.get(1, 10), Some(3.0));
        assert_eq!(left.get(1, 20), Some(5.0));
        assert_eq!(left.get(3, 10), Some(2.0));
    }

    #[test]
    fn items_are_distinct_and_ascending() {
        let mut matrix = SparseMatrix::new();
        matrix.put(1, 30, 3.0);
        matrix.put(2, 10, 4.0);
        matrix.put(3, 30, 2.0);

        assert_eq!(matrix.items(), vec![10, 30]);
    }
}
