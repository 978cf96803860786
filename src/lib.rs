//! Academic analytics and reporting over grade, attendance and
//! participation records.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filter;
pub mod join;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod source;

pub use config::{AppConfig, ReportingConfig};
pub use error::{ExportError, ReportError, SourceError};
pub use export::{ExportFormat, ExportOptions, ExportPayload, ExportSink, FileExporter};
pub use filter::{filter_records, FilterSpec};
pub use join::JoinedStudentView;
pub use orchestrator::{Generation, ReportKind, ReportOrchestrator, ReportState, SummaryResult};
pub use source::{InMemorySource, RecordSource};
