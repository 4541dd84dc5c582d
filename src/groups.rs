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

use std::collections::BTreeMap;

use fnv::FnvHashMap;

use errors::{RatefoldError, Result};
use types::{DenseProjectable, DenseVector, Identifiable, SparseMatrix, SparseRow,
    MAX_RATING, MIN_RATING};

/// Reserved identifier for centroid placeholder rows handed back by external
/// clustering routines. Real users are validated to be >= 1 at ingestion.
pub const CENTROID_ID: u32 = 0;

/// One user row as handed to an external clustering routine: the provenance
/// id plus the dense projection of the row.
pub struct ClusterCandidate {
    pub user: u32,
    pub projection: DenseVector,
}

/// The clustering collaborator. Implementations receive the dense view of
/// every row and answer with clusters of user ids. This crate consumes the
/// assignment, it never implements the clustering algorithm itself.
pub trait Clusterer {
    fn cluster(&self, candidates: &[ClusterCandidate]) -> Vec<Vec<u32>>;
}

/// One averaged rating profile per cluster plus the user -> group map of all
/// real members.
#[derive(Debug)]
pub struct GroupModel {
    pub profiles: Vec<SparseRow>,
    pub assignments: FnvHashMap<u32, usize>,
}

/// The dense-vector handoff for the clustering collaborator. Call
/// `align_dimensions` on the matrix first so every projection has the same
/// length.
pub fn cluster_candidates(matrix: &SparseMatrix) -> Vec<ClusterCandidate> {
    matrix.rows()
        .map(|(&user, row)| ClusterCandidate { user, projection: row.dense_projection() })
        .collect()
}

/// Resolves the collaborator's id clusters back to copies of the matrix rows.
/// Unknown ids are dropped with a warning.
pub fn rows_for_clusters(matrix: &SparseMatrix, clusters: &[Vec<u32>]) -> Vec<Vec<SparseRow>> {
    clusters.iter()
        .map(|cluster| {
            cluster.iter()
                .filter_map(|&user| {
                    let row = matrix.row(user).map(|row| row.clone());
                    if row.is_none() {
                        warn!("cluster member {} is not present in the matrix", user);
                    }
                    row
                })
                .collect()
        })
        .collect()
}

/// Averages each cluster into a group profile row. Centroid placeholder rows
/// (the reserved id) are excluded from the average, all other rows count as
/// members and are recorded in the assignment map. All rows must share one
/// declared dimensionality.
///
/// An averaged value outside the rating domain is only warned about: it
/// signals inconsistent input data, not a modeling failure.
pub fn build_group_profiles(clusters: &[Vec<SparseRow>]) -> Result<GroupModel> {

    if clusters.is_empty() {
        return Err(RatefoldError::EmptyInput);
    }

    let mut expected_dimensions: Option<usize> = None;
    for cluster in clusters {
        for row in cluster {
            match expected_dimensions {
                None => expected_dimensions = Some(row.dimensions()),
                Some(expected) => {
                    if row.dimensions() != expected {
                        return Err(RatefoldError::DimensionMismatch {
                            expected,
                            actual: row.dimensions(),
                        });
                    }
                }
            }
        }
    }
    let dimensions = expected_dimensions.unwrap_or(0);

    let mut profiles = Vec::with_capacity(clusters.len());
    let mut assignments = FnvHashMap::default();

    for (group, cluster) in clusters.iter().enumerate() {

        let members: Vec<&SparseRow> = cluster.iter()
            .filter(|row| row.id() != Some(CENTROID_ID))
            .collect();

        let mut profile = SparseRow::new();
        profile.declare_dimensions(dimensions);

        if members.is_empty() {
            warn!("cluster {} has no members besides the centroid placeholder", group);
            profiles.push(profile);
            continue;
        }

        let mut sums: BTreeMap<u32, f64> = BTreeMap::new();
        for row in &members {
            for (&item, &rating) in row.iter() {
                *sums.entry(item).or_insert(0.0) += rating;
            }

            match row.id() {
                Some(user) => {
                    assignments.insert(user, group);
                }
                None => warn!("cluster {} contains a row without an identifier", group),
            }
        }

        let member_count = members.len() as f64;
        for (item, sum) in sums {
            let average = sum / member_count;
            if average < MIN_RATING || average > MAX_RATING {
                warn!(
                    "group {} averages to {:.3} for item {}, outside the rating domain",
                    group, average, item
                );
            }
            profile.set(item, average);
        }

        profiles.push(profile);
    }

    Ok(GroupModel { profiles, assignments })
}


#[cfg(test)]
mod tests {

    use groups::{build_group_profiles, cluster_candidates, rows_for_clusters, CENTROID_ID};
    use errors::RatefoldError;
    use types::{DenseProjectable, SparseMatrix, SparseRow};

    fn member(user: u32, entries: &[(u32, f64)], dimensions: usize) -> SparseRow {
        let mut row = SparseRow::with_id(user);
        for &(item, rating) in entries {
            row.set(item, rating);
        }
        row.declare_dimensions(dimensions);
        row
    }

    #[test]
    fn identical_members_average_to_their_own_vector() {
        let entries = [(1, 4.0), (3, 2.0), (5, 5.0)];

        let mut cluster = Vec::new();
        for user in 1..11u32 {
            cluster.push(member(user, &entries, 6));
        }
        // a centroid placeholder must not distort the average
        cluster.push(member(CENTROID_ID, &[(1, 1.0), (3, 1.0), (5, 1.0)], 6));

        let model = build_group_profiles(&[cluster]).unwrap();

        assert_eq!(model.profiles.len(), 1);
        let profile = &model.profiles[0];
        for &(item, rating) in &entries {
            assert!((profile.get(item).unwrap() - rating).abs() < 1e-9);
        }
        assert_eq!(model.assignments.len(), 10);
    }

    #[test]
    fn members_of_differing_dimensionality_are_rejected() {
        let narrow = member(1, &[(1, 3.0)], 4);
        let wide = member(2, &[(1, 3.0)], 9);

        match build_group_profiles(&[vec![narrow, wide]]) {
            Err(RatefoldError::DimensionMismatch { expected: 4, actual: 9 }) => {}
            other => panic!("expected a dimension mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn every_member_is_assigned_to_its_group() {
        let clusters = vec![
            vec![member(1, &[(1, 2.0)], 4), member(2, &[(1, 4.0)], 4)],
            vec![member(3, &[(2, 5.0)], 4)],
        ];

        let model = build_group_profiles(&clusters).unwrap();

        assert_eq!(model.assignments[&1], 0);
        assert_eq!(model.assignments[&2], 0);
        assert_eq!(model.assignments[&3], 1);
        assert!((model.profiles[0].get(1).unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn an_empty_cluster_list_is_rejected() {
        match build_group_profiles(&[]) {
            Err(RatefoldError::EmptyInput) => {}
            other => panic!("expected an empty input error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn a_cluster_of_only_placeholders_yields_an_empty_profile() {
        let clusters = vec![
            vec![member(CENTROID_ID, &[(1, 3.0)], 4)],
            vec![member(7, &[(1, 4.0)], 4)],
        ];

        let model = build_group_profiles(&clusters).unwrap();

        assert!(model.profiles[0].is_empty());
        assert_eq!(model.profiles[0].dimensions(), 4);
        assert_eq!(model.assignments.len(), 1);
    }

    #[test]
    fn candidates_and_row_resolution_round_trip() {
        let mut matrix = SparseMatrix::new();
        matrix.put(1, 0, 3.0);
        matrix.put(1, 2, 4.0);
        matrix.put(2, 1, 5.0);
        matrix.align_dimensions();

        let candidates = cluster_candidates(&matrix);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].projection.len(), 3);

        let clusters = vec![vec![1, 2]];
        let rows = rows_for_clusters(&matrix, &clusters);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0][0], *matrix.row(1).unwrap());
    }
}
