use thiserror::Error;

/// Failure reported by a data collaborator while fetching or loading records.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Failure while serializing an export payload.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("format {0} is not supported by this exporter")]
    UnsupportedFormat(String),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}
