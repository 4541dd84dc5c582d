#[macro_use] extern crate log;
#[macro_use] extern crate serde_derive;
#[macro_use] extern crate serde_json;
extern crate csv;
extern crate fnv;
extern crate rand;
extern crate scoped_pool;
extern crate serde;

use std::time::Instant;

use rand::Rng;

pub mod errors;
pub mod types;
pub mod stats;
pub mod io;
pub mod partition;
pub mod similarity;
pub mod predict;
pub mod groups;
pub mod eval;
pub mod utils;

use errors::Result;
use groups::Clusterer;
use types::SparseMatrix;

/// Knobs of one cross-validation batch.
#[derive(Debug, Clone)]
pub struct Config {
    pub folds: usize,
    pub layers: usize,
    pub neighbourhood_size: usize,
    pub pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config { folds: 5, layers: 3, neighbourhood_size: 10, pool_size: 1 }
    }
}

/// Outcome of evaluating one fold. `rmse` is absent when the fold yielded no
/// comparable rating pairs at all.
#[derive(Debug, Serialize)]
pub struct FoldReport {
    pub fold: usize,
    pub rmse: Option<f64>,
    pub compared: usize,
    pub skipped_users: usize,
    pub skipped_items: usize,
    pub mean_fallbacks: usize,
}

#[derive(Debug, Serialize)]
pub struct CrossValidation {
    pub folds: Vec<FoldReport>,
    pub mean_rmse: Option<f64>,
}

/// Cross-validates group recommendation quality on a rating matrix.
///
/// The matrix is split into stratified folds. For every fold, the remaining
/// folds form the training matrix: its unrated cells are filled by
/// neighbour voting, the filled rows are handed to the clustering
/// collaborator, and each cluster is averaged into a group profile. Held-out
/// users are then assigned to their nearest profile, and the profile values
/// are scored against the held-out ratings.
///
/// The random source drives the fold assignment, a seeded generator makes the
/// whole batch reproducible.
pub fn cross_validate<C, R>(
    matrix: &SparseMatrix,
    config: &Config,
    clusterer: &C,
    rng: &mut R,
) -> Result<CrossValidation>
    where C: Clusterer, R: Rng {

    let batch_start = Instant::now();

    let partitions = partition::partition(matrix, config.folds, config.layers, rng)?;

    let mut reports = Vec::with_capacity(partitions.len());

    for fold in 0..partitions.len() {

        let test = &partitions[fold];

        let mut training = SparseMatrix::with_dimensions(matrix.dimensions());
        for (index, part) in partitions.iter().enumerate() {
            if index != fold {
                training.merge(part);
            }
        }
        training.align_dimensions();

        if training.is_empty() || test.is_empty() {
            warn!("fold {} leaves no data to train or test on, skipping", fold);
            reports.push(FoldReport {
                fold,
                rmse: None,
                compared: 0,
                skipped_users: test.num_users(),
                skipped_items: 0,
                mean_fallbacks: 0,
            });
            continue;
        }

        let prediction = predict::predict(
            &training,
            config.neighbourhood_size,
            config.pool_size,
        )?;
        let filled = prediction.matrix;

        let candidates = groups::cluster_candidates(&filled);
        let clusters = clusterer.cluster(&candidates);
        let cluster_rows = groups::rows_for_clusters(&filled, &clusters);
        let model = groups::build_group_profiles(&cluster_rows)?;

        // held-out users were not clustered, they borrow the assignment of
        // their nearest profile
        let mut assignments = model.assignments.clone();
        for (&user, row) in test.rows() {
            if let Some(group) = eval::nearest_profile(row, &model.profiles) {
                assignments.insert(user, group);
            }
        }

        let aligned = eval::align_with_profiles(test, &model.profiles, &assignments);

        let fold_rmse = if aligned.is_empty() {
            warn!("fold {} produced no comparable rating pairs", fold);
            None
        } else {
            Some(eval::rmse(&aligned.predicted, &aligned.actual)?)
        };

        info!(
            "fold {}: {} compared pairs, {} skipped users, {} skipped items",
            fold,
            aligned.len(),
            aligned.skipped_users,
            aligned.skipped_items,
        );

        reports.push(FoldReport {
            fold,
            rmse: fold_rmse,
            compared: aligned.len(),
            skipped_users: aligned.skipped_users,
            skipped_items: aligned.skipped_items,
            mean_fallbacks: prediction.mean_fallbacks.len(),
        });
    }

    let scored: Vec<f64> = reports.iter().filter_map(|report| report.rmse).collect();
    let mean_rmse = if scored.is_empty() {
        None
    } else {
        Some(scored.iter().sum::<f64>() / scored.len() as f64)
    };

    info!(
        "cross-validation of {} folds took {}ms",
        partitions.len(),
        utils::to_millis(batch_start.elapsed()),
    );

    Ok(CrossValidation { folds: reports, mean_rmse })
}
