use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecError>;

#[derive(Debug, Error)]
pub enum RecError {
    #[error("missing required column `{column}` in {table} data")]
    Schema {
        table: &'static str,
        column: String,
    },

    #[error("cannot train on an empty interaction dataset")]
    EmptyDataset,

    #[error("unknown strategy `{0}` (expected popularity, top_rated, collaborative or embedding)")]
    UnknownStrategy(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {table} data: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
