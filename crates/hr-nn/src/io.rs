// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::loss::TripletRankingConfig;
use crate::record::TripletRecord;
use crate::{PureResult, TensorError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::warn;

fn io_error(err: std::io::Error) -> TensorError {
    TensorError::IoError {
        message: err.to_string(),
    }
}

fn serde_error(err: impl ToString) -> TensorError {
    TensorError::SerializationError {
        message: err.to_string(),
    }
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> PureResult<()> {
    let file = File::create(path).map_err(io_error)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value).map_err(serde_error)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> PureResult<T> {
    let file = File::open(path).map_err(io_error)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(serde_error)
}

fn validated(records: Vec<TripletRecord>, path: &Path) -> PureResult<Vec<TripletRecord>> {
    for (index, record) in records.iter().enumerate() {
        if let Err(err) = record.validate() {
            warn!(path = %path.display(), index, %err, "rejecting corrupt triplet record");
            return Err(err);
        }
    }
    Ok(records)
}

pub fn save_records_json<P: AsRef<Path>>(records: &[TripletRecord], path: P) -> PureResult<()> {
    write_json(records, path.as_ref())
}

pub fn load_records_json<P: AsRef<Path>>(path: P) -> PureResult<Vec<TripletRecord>> {
    let records = read_json(path.as_ref())?;
    validated(records, path.as_ref())
}

pub fn save_records_bincode<P: AsRef<Path>>(
    records: &[TripletRecord],
    path: P,
) -> PureResult<()> {
    let file = File::create(path.as_ref()).map_err(io_error)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, records).map_err(serde_error)?;
    Ok(())
}

pub fn load_records_bincode<P: AsRef<Path>>(path: P) -> PureResult<Vec<TripletRecord>> {
    let file = File::open(path.as_ref()).map_err(io_error)?;
    let reader = BufReader::new(file);
    let records: Vec<TripletRecord> =
        bincode::deserialize_from(reader).map_err(serde_error)?;
    validated(records, path.as_ref())
}

pub fn save_config_json<P: AsRef<Path>>(config: &TripletRankingConfig, path: P) -> PureResult<()> {
    write_json(config, path.as_ref())
}

/// Reads a loss configuration and validates it before returning.
pub fn load_config_json<P: AsRef<Path>>(path: P) -> PureResult<TripletRankingConfig> {
    let config: TripletRankingConfig = read_json(path.as_ref())?;
    config.validate()?;
    Ok(config)
}
