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

extern crate csv;
extern crate serde;
extern crate serde_json;

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::stdout;
use std::path::Path;
use std::str::FromStr;

use errors::{RatefoldError, Result};
use stats::DataDictionary;
use types::{SparseMatrix, SparseRow, MIN_RATING};
use super::CrossValidation;

/// Reads a ratings input file. We expect NO headers, and a
/// user-item-rating-timestamp tuple per line with tab separation. The
/// timestamp is discarded and may be absent.
pub fn csv_reader(file: &str) -> Result<csv::Reader<File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_path(file)?;

    Ok(reader)
}

fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    line: u64,
    name: &str,
) -> Result<T> {

    let raw = record.get(index).ok_or_else(|| RatefoldError::Validation {
        line: Some(line),
        reason: format!("missing {} field", name),
    })?;

    raw.trim().parse::<T>().map_err(|_| RatefoldError::Validation {
        line: Some(line),
        reason: format!("cannot parse {} from '{}'", name, raw),
    })
}

/// A single validated rating record. Rows with a user id or item id below 1
/// or a rating below the domain minimum are rejected, a corrupted dataset
/// must not silently produce a partial model.
fn parse_record(record: &csv::StringRecord, line: u64) -> Result<(u32, u32, f64)> {

    if record.len() < 3 {
        return Err(RatefoldError::Validation {
            line: Some(line),
            reason: String::from("expected user, item and rating fields"),
        });
    }

    let user: u32 = parse_field(record, 0, line, "user id")?;
    let item: u32 = parse_field(record, 1, line, "item id")?;
    let rating: f64 = parse_field(record, 2, line, "rating")?;

    if user < 1 {
        return Err(RatefoldError::Validation {
            line: Some(line),
            reason: String::from("user ids must be positive"),
        });
    }
    if item < 1 {
        return Err(RatefoldError::Validation {
            line: Some(line),
            reason: String::from("item ids must be positive"),
        });
    }
    if rating < MIN_RATING {
        return Err(RatefoldError::Validation {
            line: Some(line),
            reason: format!("ratings below {} denote unrated cells", MIN_RATING),
        });
    }

    Ok((user, item, rating))
}

/// First ingestion pass: validates every record and collects the dataset
/// statistics that size the second pass.
pub fn scan_statistics<R>(reader: &mut csv::Reader<R>) -> Result<DataDictionary>
    where R: io::Read {

    let mut dict = DataDictionary::new();
    let mut line: u64 = 0;

    for result in reader.records() {
        line += 1;
        let record = result?;
        let (user, item, _rating) = parse_record(&record, line)?;
        dict.observe(user, item);
    }

    Ok(dict)
}

/// Second ingestion pass: fills a matrix pre-sized to the dictionary's
/// dimensionality, so that all rows share one declared size.
pub fn read_ratings<R>(
    reader: &mut csv::Reader<R>,
    dict: &DataDictionary,
) -> Result<SparseMatrix>
    where R: io::Read {

    let mut matrix = SparseMatrix::with_dimensions(dict.dimensions());
    let mut line: u64 = 0;

    for result in reader.records() {
        line += 1;
        let record = result?;
        let (user, item, rating) = parse_record(&record, line)?;
        matrix.put(user, item, rating);
    }

    matrix.align_dimensions();

    Ok(matrix)
}

/// Loads a ratings dataset in two passes and enforces the minimum number of
/// distinct users.
pub fn load_dataset(file: &str, min_users: usize) -> Result<(SparseMatrix, DataDictionary)> {

    let mut reader_pass_one = csv_reader(file)?;
    let dict = scan_statistics(&mut reader_pass_one)?;

    if dict.num_users() < min_users {
        return Err(RatefoldError::Validation {
            line: None,
            reason: format!(
                "dataset holds {} distinct users, at least {} required",
                dict.num_users(),
                min_users
            ),
        });
    }

    let mut reader_pass_two = csv_reader(file)?;
    let matrix = read_ratings(&mut reader_pass_two, &dict)?;

    Ok((matrix, dict))
}

/// Struct used for JSON serialization of group profiles. Field names will be
/// used in JSON.
#[derive(Serialize)]
struct ProfileRecord<'a> {
    group: usize,
    ratings: &'a BTreeMap<u32, f64>,
}

#[derive(Serialize)]
struct RatingsRecord<'a> {
    user: u32,
    ratings: &'a BTreeMap<u32, f64>,
}

fn output_stream(path: Option<String>) -> io::Result<Box<Write>> {
    let out: Box<Write> = match path {
        Some(path) => Box::new(File::create(&Path::new(&path))?),
        _ => Box::new(stdout()),
    };
    Ok(out)
}

/// Output the cross-validation report in JSON format, one line per fold plus
/// a summary line. If an `report_path` is supplied, we write to a file at the
/// specified path, otherwise, we output to stdout.
pub fn write_report(report: &CrossValidation, report_path: Option<String>) -> io::Result<()> {

    let mut out = output_stream(report_path)?;

    for fold in &report.folds {
        write!(out, "{}\n", json!(fold).to_string())?;
    }

    let summary = json!({ "mean_rmse": report.mean_rmse });
    write!(out, "{}\n", summary.to_string())?;

    Ok(())
}

/// Output one JSON line per group profile.
pub fn write_profiles(profiles: &[SparseRow], profiles_path: Option<String>) -> io::Result<()> {

    let mut out = output_stream(profiles_path)?;

    for (group, profile) in profiles.iter().enumerate() {
        let record = ProfileRecord { group, ratings: profile.entries() };
        write!(out, "{}\n", json!(record).to_string())?;
    }

    Ok(())
}

/// Output one JSON line per user row, used for writing out filled matrices.
pub fn write_ratings(matrix: &SparseMatrix, ratings_path: Option<String>) -> io::Result<()> {

    let mut out = output_stream(ratings_path)?;

    for (&user, row) in matrix.rows() {
        let record = RatingsRecord { user, ratings: row.entries() };
        write!(out, "{}\n", json!(record).to_string())?;
    }

    Ok(())
}
