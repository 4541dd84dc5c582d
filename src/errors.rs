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

use std::error::Error;
use std::fmt;
use std::io;
use std::result;

/// Failures that abort a batch. Insufficient similarity data (fewer than two
/// common items) is deliberately not represented here: it resolves to a zero
/// coefficient and is only logged. The same goes for model-coverage gaps
/// during alignment, which are counted and logged instead of raised.
#[derive(Debug)]
pub enum RatefoldError {
    /// Malformed or out-of-range input data. Fatal, a corrupted dataset must
    /// not silently produce a partial model.
    Validation { line: Option<u64>, reason: String },
    /// A mean was requested for a row with no ratings and no explicit mean.
    EmptyRow { user: Option<u32> },
    /// Partitioning was requested for a matrix without any rows.
    EmptyMatrix,
    /// An operation received an empty collection.
    EmptyInput,
    /// Rows of differing declared size were combined.
    DimensionMismatch { expected: usize, actual: usize },
    /// A predicted rating fell outside the rating domain. Fatal, this
    /// indicates an algorithmic or weighting bug, not a data artifact.
    PredictionRange { user: u32, item: u32, value: f64 },
    /// RMSE over arrays of differing length.
    LengthMismatch { predicted: usize, actual: usize },
    Io(io::Error),
    Csv(csv::Error),
}

pub type Result<T> = result::Result<T, RatefoldError>;

impl fmt::Display for RatefoldError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RatefoldError::Validation { line: Some(line), ref reason } =>
                write!(formatter, "invalid input at line {}: {}", line, reason),
            RatefoldError::Validation { line: None, ref reason } =>
                write!(formatter, "invalid input: {}", reason),
            RatefoldError::EmptyRow { user: Some(user) } =>
                write!(formatter, "no ratings present for user {}", user),
            RatefoldError::EmptyRow { user: None } =>
                write!(formatter, "no ratings present in row"),
            RatefoldError::EmptyMatrix =>
                write!(formatter, "the rating matrix is empty"),
            RatefoldError::EmptyInput =>
                write!(formatter, "operation received an empty input"),
            RatefoldError::DimensionMismatch { expected, actual } =>
                write!(formatter, "dimension mismatch: expected {}, found {}", expected, actual),
            RatefoldError::PredictionRange { user, item, value } =>
                write!(formatter, "predicted rating {} for user {} and item {} is outside the \
                    rating domain", value, user, item),
            RatefoldError::LengthMismatch { predicted, actual } =>
                write!(formatter, "cannot compare {} predicted ratings to {} actual ratings",
                    predicted, actual),
            RatefoldError::Io(ref cause) => write!(formatter, "io error: {}", cause),
            RatefoldError::Csv(ref cause) => write!(formatter, "csv error: {}", cause),
        }
    }
}

impl Error for RatefoldError {}

impl From<io::Error> for RatefoldError {
    fn from(cause: io::Error) -> Self {
        RatefoldError::Io(cause)
    }
}

impl From<csv::Error> for RatefoldError {
    fn from(cause: csv::Error) -> Self {
        RatefoldError::Csv(cause)
    }
}


#[cfg(test)]
mod tests {

    use errors::RatefoldError;

    #[test]
    fn display_carries_the_line_number() {
        let failure = RatefoldError::Validation {
            line: Some(12),
            reason: String::from("user id must be positive"),
        };

        assert_eq!(failure.to_string(), "invalid input at line 12: user id must be positive");
    }

    #[test]
    fn display_of_range_violation_names_the_cell() {
        let failure = RatefoldError::PredictionRange { user: 3, item: 17, value: 5.8 };
        let message = failure.to_string();

        assert!(message.contains("user 3"));
        assert!(message.contains("item 17"));
    }
}
