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

extern crate env_logger;
extern crate getopts;
extern crate num_cpus;
extern crate rand;
extern crate ratefold;

use std::cmp::Ordering;
use std::env;
use std::error::Error;

use getopts::Options;
use rand::{SeedableRng, XorShiftRng};

use ratefold::{cross_validate, Config};
use ratefold::groups::{ClusterCandidate, Clusterer};
use ratefold::io;
use ratefold::predict;

fn main() {

    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). The input consists of ratings \
        that users assigned to items. The input file must contain a user id, item id, rating \
        and optional timestamp per line, separated by a tab.", "PATH");
    opts.optopt("o", "outputfile", "Output file name for the evaluation report (optional, \
        output will be written to stdout by default).", "PATH");
    opts.optopt("k", "folds", "Number of cross-validation folds (optional, defaults to 5).",
        "NUMBER");
    opts.optopt("l", "layers", "Number of mean-rating strata used to balance the folds \
        (optional, defaults to 3).", "NUMBER");
    opts.optopt("n", "neighbourhood", "Number of most similar users whose ratings are \
        consulted per prediction (optional, defaults to 10).", "NUMBER");
    opts.optopt("g", "groups", "Number of groups formed by the builtin mean-band grouping \
        (optional, defaults to 4).", "NUMBER");
    opts.optopt("s", "seed", "Seed for the fold assignment (optional, folds are drawn from \
        entropy by default).", "NUMBER");
    opts.optopt("u", "min-users", "Minimum number of distinct users the dataset must hold \
        (optional, defaults to 2).", "NUMBER");
    opts.optopt("p", "profiles", "File name for the group profiles of a final model built \
        on the complete dataset (optional, skipped by default).", "PATH");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    if !matches.opt_present("i") {
        return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify an inputfile via --inputfile."),
        );
    }

    let ratings_path = matches.opt_str("i").unwrap();
    let report_path = matches.opt_str("o");
    let profiles_path = matches.opt_str("p");

    let folds: usize = match matches.opt_get_default("k", 5) {
        Ok(folds) => folds,
        Err(failure) => {
            let hint = format!("Problem with option 'k': {}", failure.to_string());
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let layers: usize = match matches.opt_get_default("l", 3) {
        Ok(layers) => layers,
        Err(failure) => {
            let hint = format!("Problem with option 'l': {}", failure.to_string());
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let neighbourhood_size: usize = match matches.opt_get_default("n", 10) {
        Ok(neighbourhood_size) => neighbourhood_size,
        Err(failure) => {
            let hint = format!("Problem with option 'n': {}", failure.to_string());
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let groups: usize = match matches.opt_get_default("g", 4) {
        Ok(groups) => groups,
        Err(failure) => {
            let hint = format!("Problem with option 'g': {}", failure.to_string());
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let min_users: usize = match matches.opt_get_default("u", 2) {
        Ok(min_users) => min_users,
        Err(failure) => {
            let hint = format!("Problem with option 'u': {}", failure.to_string());
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if folds == 0 || layers == 0 || groups == 0 {
        return print_usage_and_exit(
            &program,
            opts,
            Some("Folds, layers and groups all need to be positive."),
        );
    }

    let mut rng = match matches.opt_str("s") {
        Some(raw) => match raw.parse::<u64>() {
            Ok(seed) => XorShiftRng::from_seed([
                0x193a6754,
                seed as u32,
                (seed >> 32) as u32,
                0x9e3779b9,
            ]),
            Err(failure) => {
                let hint = format!("Problem with option 's': {}", failure.to_string());
                return print_usage_and_exit(&program, opts, Some(&hint))
            },
        },
        None => rand::weak_rng(),
    };

    let config = Config {
        folds,
        layers,
        neighbourhood_size,
        pool_size: num_cpus::get(),
    };

    run_cross_validation(
        &ratings_path,
        &config,
        groups,
        min_users,
        report_path,
        profiles_path,
        &mut rng,
    ).unwrap();
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

/// Stand-in for an external clustering collaborator: ranks users by their
/// mean rating and slices the ranking into equally sized bands. Deployments
/// with a real clustering routine plug it in via the `Clusterer` trait.
struct MeanBandClusterer {
    groups: usize,
}

impl Clusterer for MeanBandClusterer {

    fn cluster(&self, candidates: &[ClusterCandidate]) -> Vec<Vec<u32>> {

        let mut ranked: Vec<(f64, u32)> = candidates.iter()
            .map(|candidate| {
                let rated: Vec<f64> = candidate.projection.iter()
                    .cloned()
                    .filter(|&value| value > 0.0)
                    .collect();
                let mean = if rated.is_empty() {
                    0.0
                } else {
                    rated.iter().sum::<f64>() / rated.len() as f64
                };
                (mean, candidate.user)
            })
            .collect();

        ranked.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let per_group = (ranked.len() + self.groups - 1) / self.groups;
        let mut clusters = vec![Vec::new(); self.groups];

        for (index, &(_, user)) in ranked.iter().enumerate() {
            clusters[index / per_group.max(1)].push(user);
        }

        clusters
    }
}

fn run_cross_validation(
    ratings_path: &str,
    config: &Config,
    groups: usize,
    min_users: usize,
    report_path: Option<String>,
    profiles_path: Option<String>,
    rng: &mut XorShiftRng,
) -> Result<(), Box<Error>> {

    println!("Reading {} (pass 1/2 for statistics, pass 2/2 for ratings)", ratings_path);
    let (matrix, data_dict) = io::load_dataset(ratings_path, min_users)?;

    println!(
        "Found {} ratings from {} users over {} items.",
        data_dict.num_ratings(),
        data_dict.num_users(),
        data_dict.num_items(),
    );

    println!(
        "Evaluating {} folds ({} layers, neighbourhood of {}, {} groups)",
        config.folds, config.layers, config.neighbourhood_size, groups,
    );

    let clusterer = MeanBandClusterer { groups };
    let report = cross_validate(&matrix, config, &clusterer, rng)?;

    println!("Writing evaluation report...");
    io::write_report(&report, report_path)?;

    if let Some(profiles_path) = profiles_path {
        println!("Building a final group model on the complete dataset...");

        let prediction = predict::predict(
            &matrix,
            config.neighbourhood_size,
            config.pool_size,
        )?;

        let candidates = ratefold::groups::cluster_candidates(&prediction.matrix);
        let clusters = clusterer.cluster(&candidates);
        let cluster_rows = ratefold::groups::rows_for_clusters(&prediction.matrix, &clusters);
        let model = ratefold::groups::build_group_profiles(&cluster_rows)?;

        println!("Writing group profiles to {}", profiles_path);
        io::write_profiles(&model.profiles, Some(profiles_path))?;
    }

    Ok(())
}
