use reqwest::StatusCode;
use serde_json::Error as JSON_ERROR;
use serde_yaml::Error as YAML_ERROR;
use std::io::Error as IO_ERROR;
use thiserror::Error;

use crate::poller::CycleStage;

/// Failure reaching the data source.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("could not read response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Payload does not match the feed envelope shape.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{0}")]
    Json(#[from] JSON_ERROR),

    #[error("asset at index {0} has an empty id")]
    EmptyId(usize),

    #[error("asset id '{0}' appears more than once")]
    DuplicateId(String),
}

/// Backend-level storage failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Backend(String),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table {0} did not become active in time")]
    NotActive(String),
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("could not list tables: {0}")]
    List(#[source] StoreError),

    #[error("could not create table {table}: {source}")]
    Create {
        table: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Error, Debug)]
#[error("could not write asset '{id}': {source}")]
pub struct WriteError {
    pub id: String,
    #[source]
    pub source: StoreError,
}

/// Log sink delivery failure.
///
/// The sink URL embeds the account token, so transport errors are stored
/// with their URL stripped.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("sink answered {0}")]
    Status(StatusCode),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: IO_ERROR,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] YAML_ERROR),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("failed to load .env: {0}")]
    Env(#[source] dotenv::Error),
}

/// Fatal errors. Anything reaching the binary ends the process.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Provision error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Log delivery failed while {stage}: {source}")]
    LogDelivery {
        stage: CycleStage,
        #[source]
        source: SinkError,
    },
}
