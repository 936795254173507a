use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Mysql(#[from] mysql::Error),

    #[error("unexpected value in column `{column}`: {reason}")]
    Decode {
        column: &'static str,
        reason: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("row {id} missing from `{table}` after write")]
    Vanished { table: &'static str, id: u64 },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{context}: {source}")]
    Query {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Prefixes a store failure with the operation that hit it.
pub trait QueryContext<T> {
    fn context(self, context: &'static str) -> Result<T>;
}

impl<T> QueryContext<T> for std::result::Result<T, StoreError> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|source| Error::Query { context, source })
    }
}
