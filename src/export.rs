//! Projection of records into a neutral tabular payload, and the
//! serializers that turn a payload into files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::CombinedRow;
use crate::error::ExportError;
use crate::models::{AttendanceRecord, Directory, GradeRecord, ParticipationRecord};

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const REMARKS_HEADER: &str = "Remarks";

/// How a column pulls and formats its cell from a record.
pub enum ColumnValue<'a, T> {
    Text(Box<dyn Fn(&T) -> String + 'a>),
    Date(Box<dyn Fn(&T) -> NaiveDate + 'a>),
    Decimal(Box<dyn Fn(&T) -> f64 + 'a>),
}

pub struct Column<'a, T> {
    pub header: String,
    pub value: ColumnValue<'a, T>,
}

impl<'a, T> Column<'a, T> {
    pub fn text(header: &str, extract: impl Fn(&T) -> String + 'a) -> Self {
        Self {
            header: header.to_string(),
            value: ColumnValue::Text(Box::new(extract)),
        }
    }

    pub fn date(header: &str, extract: impl Fn(&T) -> NaiveDate + 'a) -> Self {
        Self {
            header: header.to_string(),
            value: ColumnValue::Date(Box::new(extract)),
        }
    }

    pub fn decimal(header: &str, extract: impl Fn(&T) -> f64 + 'a) -> Self {
        Self {
            header: header.to_string(),
            value: ColumnValue::Decimal(Box::new(extract)),
        }
    }

    fn render(&self, record: &T) -> String {
        match &self.value {
            ColumnValue::Text(extract) => extract(record),
            ColumnValue::Date(extract) => extract(record).format(DATE_FORMAT).to_string(),
            ColumnValue::Decimal(extract) => format_decimal(extract(record)),
        }
    }
}

pub fn format_decimal(value: f64) -> String {
    format!("{value:.1}")
}

fn verdict(passing: bool) -> String {
    let label = if passing { "Pass" } else { "Fail" };
    label.to_string()
}

/// Appends the remarks column only when `include` is set.
fn with_remarks<'a, T>(
    mut columns: Vec<Column<'a, T>>,
    include: bool,
    extract: impl Fn(&T) -> String + 'a,
) -> Vec<Column<'a, T>> {
    if include {
        columns.push(Column::text(REMARKS_HEADER, extract));
    }
    columns
}

/// Ordered headers and rows handed to a serializer. Only [`project`]
/// builds one, so every row has exactly one cell per header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPayload {
    title: String,
    filename_stem: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ExportPayload {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn filename_stem(&self) -> &str {
        &self.filename_stem
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

pub fn project<T>(
    title: impl Into<String>,
    filename_stem: impl Into<String>,
    columns: &[Column<'_, T>],
    records: &[T],
) -> ExportPayload {
    ExportPayload {
        title: title.into(),
        filename_stem: filename_stem.into(),
        headers: columns.iter().map(|c| c.header.clone()).collect(),
        rows: records
            .iter()
            .map(|record| columns.iter().map(|c| c.render(record)).collect())
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportOptions {
    pub include_remarks: bool,
}

pub fn grade_columns<'a>(
    directory: &'a Directory,
    passing_grade: f64,
    options: ExportOptions,
) -> Vec<Column<'a, GradeRecord>> {
    let columns = vec![
        Column::text("Student ID", |g: &GradeRecord| g.student_id.clone()),
        Column::text("Student", move |g: &GradeRecord| directory.student_name(&g.student_id)),
        Column::text("Course", move |g: &GradeRecord| directory.course_label(&g.course_code)),
        Column::text("Subject", move |g: &GradeRecord| directory.subject_label(&g.subject_code)),
        Column::text("Criterion", |g: &GradeRecord| g.criterion.clone()),
        Column::decimal("Score", |g: &GradeRecord| g.score),
        Column::text("Result", move |g: &GradeRecord| verdict(g.score >= passing_grade)),
        Column::date("Date", |g: &GradeRecord| g.created_at.date_naive()),
    ];
    with_remarks(columns, options.include_remarks, |g: &GradeRecord| g.remarks.clone())
}

pub fn attendance_columns<'a>(
    directory: &'a Directory,
    options: ExportOptions,
) -> Vec<Column<'a, AttendanceRecord>> {
    let columns = vec![
        Column::text("Student ID", |a: &AttendanceRecord| a.student_id.clone()),
        Column::text("Student", move |a: &AttendanceRecord| directory.student_name(&a.student_id)),
        Column::text("Course", move |a: &AttendanceRecord| directory.course_label(&a.course_code)),
        Column::date("Date", |a: &AttendanceRecord| a.date),
        Column::text("Status", |a: &AttendanceRecord| a.status.to_string()),
        Column::text("Arrival", |a: &AttendanceRecord| {
            a.arrival_time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default()
        }),
    ];
    with_remarks(columns, options.include_remarks, |a: &AttendanceRecord| a.remarks.clone())
}

pub fn participation_columns<'a>(
    directory: &'a Directory,
    options: ExportOptions,
) -> Vec<Column<'a, ParticipationRecord>> {
    let columns = vec![
        Column::text("Student ID", |p: &ParticipationRecord| p.student_id.clone()),
        Column::text("Student", move |p: &ParticipationRecord| {
            directory.student_name(&p.student_id)
        }),
        Column::text("Course", move |p: &ParticipationRecord| {
            directory.course_label(&p.course_code)
        }),
        Column::text("Subject", move |p: &ParticipationRecord| {
            directory.subject_label(&p.subject_code)
        }),
        Column::date("Date", |p: &ParticipationRecord| p.date),
        Column::text("Type", |p: &ParticipationRecord| p.participation_type.clone()),
        Column::decimal("Score", |p: &ParticipationRecord| p.score),
    ];
    with_remarks(columns, options.include_remarks, |p: &ParticipationRecord| {
        p.remarks.clone()
    })
}

/// Combined rows carry no remarks, so the option has nothing to gate.
pub fn combined_columns<'a>() -> Vec<Column<'a, CombinedRow>> {
    vec![
        Column::text("Student ID", |r: &CombinedRow| r.student_id.clone()),
        Column::text("Student", |r: &CombinedRow| r.student_name.clone()),
        Column::decimal("Average Grade", |r: &CombinedRow| r.average_grade),
        Column::text("Grades", |r: &CombinedRow| r.grade_count.to_string()),
        Column::decimal("Attendance %", |r: &CombinedRow| r.attendance_rate),
        Column::decimal("Participation", |r: &CombinedRow| r.average_participation),
        Column::text("Result", |r: &CombinedRow| verdict(r.passing)),
        Column::text("Alert", |r: &CombinedRow| {
            let flag = if r.alert { "Yes" } else { "" };
            flag.to_string()
        }),
    ]
}

/// One line of a per-student detail export.
#[derive(Debug, Clone, Copy)]
pub enum StudentLine<'r> {
    Grade(&'r GradeRecord),
    Attendance(&'r AttendanceRecord),
    Participation(&'r ParticipationRecord),
}

impl StudentLine<'_> {
    fn kind(&self) -> &'static str {
        match self {
            StudentLine::Grade(_) => "Grade",
            StudentLine::Attendance(_) => "Attendance",
            StudentLine::Participation(_) => "Participation",
        }
    }

    fn date(&self) -> NaiveDate {
        match self {
            StudentLine::Grade(g) => g.created_at.date_naive(),
            StudentLine::Attendance(a) => a.date,
            StudentLine::Participation(p) => p.date,
        }
    }

    fn course_code(&self) -> &str {
        match self {
            StudentLine::Grade(g) => &g.course_code,
            StudentLine::Attendance(a) => &a.course_code,
            StudentLine::Participation(p) => &p.course_code,
        }
    }

    fn subject_code(&self) -> Option<&str> {
        match self {
            StudentLine::Grade(g) => Some(&g.subject_code),
            StudentLine::Attendance(_) => None,
            StudentLine::Participation(p) => Some(&p.subject_code),
        }
    }

    fn detail(&self) -> String {
        match self {
            StudentLine::Grade(g) => g.criterion.clone(),
            StudentLine::Attendance(a) => a.status.to_string(),
            StudentLine::Participation(p) => p.participation_type.clone(),
        }
    }

    fn score(&self) -> Option<f64> {
        match self {
            StudentLine::Grade(g) => Some(g.score),
            StudentLine::Attendance(_) => None,
            StudentLine::Participation(p) => Some(p.score),
        }
    }

    fn remarks(&self) -> &str {
        match self {
            StudentLine::Grade(g) => &g.remarks,
            StudentLine::Attendance(a) => &a.remarks,
            StudentLine::Participation(p) => &p.remarks,
        }
    }
}

pub fn student_line_columns<'a, 'r: 'a>(
    directory: &'a Directory,
    options: ExportOptions,
) -> Vec<Column<'a, StudentLine<'r>>> {
    let columns = vec![
        Column::text("Record", |l: &StudentLine<'r>| l.kind().to_string()),
        Column::date("Date", |l: &StudentLine<'r>| l.date()),
        Column::text("Course", move |l: &StudentLine<'r>| directory.course_label(l.course_code())),
        Column::text("Subject", move |l: &StudentLine<'r>| {
            l.subject_code()
                .map(|code| directory.subject_label(code))
                .unwrap_or_default()
        }),
        Column::text("Detail", |l: &StudentLine<'r>| l.detail()),
        Column::text("Score", |l: &StudentLine<'r>| {
            l.score().map(format_decimal).unwrap_or_default()
        }),
    ];
    with_remarks(columns, options.include_remarks, |l: &StudentLine<'r>| {
        l.remarks().to_string()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    Spreadsheet,
    DelimitedText,
    Document,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => "tsv",
            ExportFormat::DelimitedText => "csv",
            ExportFormat::Document => "md",
        }
    }
}

/// The external serializer seam.
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn serialize(
        &self,
        payload: &ExportPayload,
        format: ExportFormat,
    ) -> Result<PathBuf, ExportError>;
}

fn delimited(payload: &ExportPayload, delimiter: u8) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(payload.headers())?;
    for row in payload.rows() {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

fn markdown_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

fn document(payload: &ExportPayload) -> Vec<u8> {
    let mut output = String::new();

    let _ = writeln!(output, "# {}", payload.title());
    let _ = writeln!(output);

    if payload.rows().is_empty() {
        let _ = writeln!(output, "No records for this selection.");
        return output.into_bytes();
    }

    let headers: Vec<String> = payload.headers().iter().map(|h| markdown_cell(h)).collect();
    let _ = writeln!(output, "| {} |", headers.join(" | "));
    let _ = writeln!(output, "|{}", "---|".repeat(headers.len()));
    for row in payload.rows() {
        let cells: Vec<String> = row.iter().map(|c| markdown_cell(c)).collect();
        let _ = writeln!(output, "| {} |", cells.join(" | "));
    }
    let _ = writeln!(output);
    let count = payload.rows().len();
    let _ = writeln!(output, "{count} {}", if count == 1 { "row" } else { "rows" });

    output.into_bytes()
}

pub fn render(payload: &ExportPayload, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::DelimitedText => delimited(payload, b','),
        ExportFormat::Spreadsheet => delimited(payload, b'\t'),
        ExportFormat::Document => Ok(document(payload)),
    }
}

/// Writes `<dir>/<filename stem>.<extension>`.
#[derive(Debug, Clone)]
pub struct FileExporter {
    dir: PathBuf,
}

impl FileExporter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ExportSink for FileExporter {
    async fn serialize(
        &self,
        payload: &ExportPayload,
        format: ExportFormat,
    ) -> Result<PathBuf, ExportError> {
        let bytes = render(payload, format)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("{}.{}", payload.filename_stem(), format.extension()));
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %path.display(), rows = payload.rows().len(), "export written");
        Ok(path)
    }
}
