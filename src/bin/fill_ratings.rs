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
extern crate ratefold;

use std::env;
use std::error::Error;

use getopts::Options;

use ratefold::io;
use ratefold::predict;

fn main() {

    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). One user id, item id, rating \
        and optional timestamp per line, separated by a tab.", "PATH");
    opts.optopt("o", "outputfile", "Output file name for the filled matrix (optional, output \
        will be written to stdout by default).", "PATH");
    opts.optopt("n", "neighbourhood", "Number of most similar users whose ratings are \
        consulted per prediction (optional, defaults to 10).", "NUMBER");
    opts.optopt("u", "min-users", "Minimum number of distinct users the dataset must hold \
        (optional, defaults to 2).", "NUMBER");
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
    let output_path = matches.opt_str("o");

    let neighbourhood_size: usize = match matches.opt_get_default("n", 10) {
        Ok(neighbourhood_size) => neighbourhood_size,
        Err(failure) => {
            let hint = format!("Problem with option 'n': {}", failure.to_string());
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

    fill_ratings(&ratings_path, neighbourhood_size, min_users, output_path).unwrap();
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

fn fill_ratings(
    ratings_path: &str,
    neighbourhood_size: usize,
    min_users: usize,
    output_path: Option<String>,
) -> Result<(), Box<Error>> {

    println!("Reading {} (pass 1/2 for statistics, pass 2/2 for ratings)", ratings_path);
    let (matrix, data_dict) = io::load_dataset(ratings_path, min_users)?;

    println!(
        "Found {} ratings from {} users over {} items.",
        data_dict.num_ratings(),
        data_dict.num_users(),
        data_dict.num_items(),
    );

    println!("Predicting all unrated cells (neighbourhood of {})", neighbourhood_size);
    let prediction = predict::predict(&matrix, neighbourhood_size, num_cpus::get())?;

    if !prediction.mean_fallbacks.is_empty() {
        println!(
            "{} cells received no neighbour votes and carry the row mean",
            prediction.mean_fallbacks.len(),
        );
    }

    println!("Writing filled matrix...");
    io::write_ratings(&prediction.matrix, output_path)?;

    Ok(())
}
