//! Wires fetch, filter, aggregation and projection for each report kind.
//!
//! The pure half ([`summarize`], [`export_payload`]) works on an already
//! fetched [`Dataset`]. [`ReportOrchestrator`] adds fetching and the
//! `idle -> loading -> ready | failed` state, where the most recently
//! started generation always wins.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::aggregate::{
    summarize_attendance, summarize_combined, summarize_grades, summarize_participation,
    summarize_student, AttendanceSummary, CombinedRow, CombinedSummary, GradeSummary,
    ParticipationSummary, StudentReport,
};
use crate::config::ReportingConfig;
use crate::error::{ReportError, SourceError};
use crate::export::{
    attendance_columns, combined_columns, grade_columns, participation_columns, project,
    student_line_columns, ExportFormat, ExportOptions, ExportPayload, ExportSink, StudentLine,
};
use crate::filter::{filter_records, FilterSpec};
use crate::join::{join_by_student, join_for_student, JoinedStudentView};
use crate::models::{AttendanceRecord, Directory, GradeRecord, ParticipationRecord};
use crate::source::RecordSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Academic,
    Attendance,
    Participation,
    Student,
    Combined,
}

impl ReportKind {
    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Academic => "Academic Report",
            ReportKind::Attendance => "Attendance Report",
            ReportKind::Participation => "Participation Report",
            ReportKind::Student => "Student Report",
            ReportKind::Combined => "Combined Report",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            ReportKind::Academic => "academic",
            ReportKind::Attendance => "attendance",
            ReportKind::Participation => "participation",
            ReportKind::Student => "student",
            ReportKind::Combined => "combined",
        }
    }

    fn needs_grades(self) -> bool {
        !matches!(self, ReportKind::Attendance | ReportKind::Participation)
    }

    fn needs_attendance(self) -> bool {
        !matches!(self, ReportKind::Academic | ReportKind::Participation)
    }

    fn needs_participation(self) -> bool {
        !matches!(self, ReportKind::Academic | ReportKind::Attendance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "summary", rename_all = "lowercase")]
pub enum SummaryResult {
    Academic(GradeSummary),
    Attendance(AttendanceSummary),
    Participation(ParticipationSummary),
    Student(StudentReport),
    Combined(CombinedSummary),
}

/// Everything one generation fetched. Either every fetch succeeded or
/// there is no dataset at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub grades: Vec<GradeRecord>,
    pub attendance: Vec<AttendanceRecord>,
    pub participation: Vec<ParticipationRecord>,
    pub directory: Directory,
}

async fn fetch_when<T, F>(wanted: bool, fetch: F) -> Result<Vec<T>, SourceError>
where
    F: Future<Output = Result<Vec<T>, SourceError>>,
{
    if wanted {
        fetch.await
    } else {
        Ok(Vec::new())
    }
}

impl Dataset {
    pub async fn fetch<S>(
        source: &S,
        kind: ReportKind,
        spec: &FilterSpec,
    ) -> Result<Self, SourceError>
    where
        S: RecordSource + ?Sized,
    {
        let (grades, attendance, participation, courses, subjects, students) = tokio::try_join!(
            fetch_when(kind.needs_grades(), source.fetch_grades(spec)),
            fetch_when(kind.needs_attendance(), source.fetch_attendance(spec)),
            fetch_when(kind.needs_participation(), source.fetch_participation(spec)),
            source.fetch_courses(),
            source.fetch_subjects(),
            source.fetch_students(),
        )?;

        Ok(Self {
            grades,
            attendance,
            participation,
            directory: Directory::new(courses, subjects, students),
        })
    }

    fn filtered(&self, spec: &FilterSpec) -> Filtered {
        Filtered {
            grades: filter_records(&self.grades, spec),
            attendance: filter_records(&self.attendance, spec),
            participation: filter_records(&self.participation, spec),
        }
    }
}

struct Filtered {
    grades: Vec<GradeRecord>,
    attendance: Vec<AttendanceRecord>,
    participation: Vec<ParticipationRecord>,
}

fn student_scope(spec: &FilterSpec) -> &str {
    spec.student.as_deref().unwrap_or_default()
}

pub fn summarize(
    kind: ReportKind,
    dataset: &Dataset,
    spec: &FilterSpec,
    config: &ReportingConfig,
) -> SummaryResult {
    let records = dataset.filtered(spec);
    let directory = &dataset.directory;

    match kind {
        ReportKind::Academic => {
            SummaryResult::Academic(summarize_grades(&records.grades, directory, config))
        }
        ReportKind::Attendance => {
            SummaryResult::Attendance(summarize_attendance(&records.attendance, directory, config))
        }
        ReportKind::Participation => SummaryResult::Participation(summarize_participation(
            &records.participation,
            directory,
            config,
        )),
        ReportKind::Student => {
            let view = join_for_student(
                student_scope(spec),
                &records.grades,
                &records.attendance,
                &records.participation,
                directory,
            );
            SummaryResult::Student(summarize_student(view, directory, config))
        }
        ReportKind::Combined => {
            let views = join_by_student(
                &records.grades,
                &records.attendance,
                &records.participation,
                directory,
            );
            SummaryResult::Combined(summarize_combined(&views, config))
        }
    }
}

fn export_title(kind: ReportKind, spec: &FilterSpec, directory: &Directory) -> String {
    match (&spec.course, kind) {
        (_, ReportKind::Student) => format!(
            "{} - {}",
            kind.title(),
            directory.student_name(student_scope(spec))
        ),
        (Some(course), _) => format!("{} - {}", kind.title(), directory.course_label(course)),
        (None, _) => kind.title().to_string(),
    }
}

fn export_stem(kind: ReportKind, spec: &FilterSpec, generated_on: NaiveDate) -> String {
    let date = generated_on.format("%Y-%m-%d");
    match (kind, spec.student.as_deref()) {
        (ReportKind::Student, Some(student)) => format!("student_report_{student}_{date}"),
        _ => format!("{}_report_{date}", kind.slug()),
    }
}

pub fn export_payload(
    kind: ReportKind,
    dataset: &Dataset,
    spec: &FilterSpec,
    options: ExportOptions,
    config: &ReportingConfig,
    generated_on: NaiveDate,
) -> ExportPayload {
    let records = dataset.filtered(spec);
    let directory = &dataset.directory;
    let title = export_title(kind, spec, directory);
    let stem = export_stem(kind, spec, generated_on);

    match kind {
        ReportKind::Academic => project(
            title,
            stem,
            &grade_columns(directory, config.passing_grade, options),
            &records.grades,
        ),
        ReportKind::Attendance => project(
            title,
            stem,
            &attendance_columns(directory, options),
            &records.attendance,
        ),
        ReportKind::Participation => project(
            title,
            stem,
            &participation_columns(directory, options),
            &records.participation,
        ),
        ReportKind::Student => {
            let view = join_for_student(
                student_scope(spec),
                &records.grades,
                &records.attendance,
                &records.participation,
                directory,
            );
            let lines: Vec<StudentLine<'_>> = view
                .grades
                .iter()
                .map(StudentLine::Grade)
                .chain(view.attendance.iter().map(StudentLine::Attendance))
                .chain(view.participation.iter().map(StudentLine::Participation))
                .collect();
            let columns = student_line_columns(directory, options);
            let payload = project(title, stem, &columns, &lines);
            payload
        }
        ReportKind::Combined => {
            let rows: Vec<CombinedRow> = join_by_student(
                &records.grades,
                &records.attendance,
                &records.participation,
                directory,
            )
            .iter()
            .map(|view| CombinedRow::from_view(view, config))
            .collect();
            project(title, stem, &combined_columns(), &rows)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportState {
    Idle,
    Loading { ticket: u64 },
    Ready { ticket: u64, summary: SummaryResult },
    Failed { ticket: u64, message: String },
}

/// What a caller gets back from one generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Current(SummaryResult),
    /// A newer request started before this one finished; its result was
    /// dropped without touching the published state.
    Superseded { ticket: u64 },
}

/// Owns the state of one report screen.
pub struct ReportOrchestrator<S> {
    source: S,
    kind: ReportKind,
    config: ReportingConfig,
    latest: AtomicU64,
    state: watch::Sender<ReportState>,
}

impl<S: RecordSource> ReportOrchestrator<S> {
    pub fn new(source: S, kind: ReportKind, config: ReportingConfig) -> Self {
        let (state, _) = watch::channel(ReportState::Idle);
        Self {
            source,
            kind,
            config,
            latest: AtomicU64::new(0),
            state,
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn subscribe(&self) -> watch::Receiver<ReportState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ReportState {
        self.state.borrow().clone()
    }

    /// Issues the ticket and publishes `Loading` under the channel lock, so
    /// an older `Loading` can never land on top of a newer result.
    fn begin(&self) -> u64 {
        let mut ticket = 0;
        self.state.send_modify(|state| {
            ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            *state = ReportState::Loading { ticket };
        });
        tracing::debug!(kind = ?self.kind, ticket, "report generation started");
        ticket
    }

    /// Publishes `next` only if `ticket` is still the newest request.
    fn settle(&self, ticket: u64, next: ReportState) -> bool {
        let applied = self.state.send_if_modified(|current| {
            if self.latest.load(Ordering::SeqCst) != ticket {
                return false;
            }
            *current = next;
            true
        });
        if !applied {
            tracing::debug!(kind = ?self.kind, ticket, "stale report result discarded");
        }
        applied
    }

    pub async fn generate_summary(&self, spec: &FilterSpec) -> Result<Generation, ReportError> {
        let ticket = self.begin();

        let dataset = match Dataset::fetch(&self.source, self.kind, spec).await {
            Ok(dataset) => dataset,
            Err(err) => {
                let failed = ReportState::Failed {
                    ticket,
                    message: err.to_string(),
                };
                if !self.settle(ticket, failed) {
                    return Ok(Generation::Superseded { ticket });
                }
                tracing::warn!(kind = ?self.kind, ticket, error = %err, "report generation failed");
                return Err(err.into());
            }
        };

        let summary = summarize(self.kind, &dataset, spec, &self.config);
        let ready = ReportState::Ready {
            ticket,
            summary: summary.clone(),
        };
        if self.settle(ticket, ready) {
            tracing::info!(
                kind = ?self.kind,
                ticket,
                grades = dataset.grades.len(),
                attendance = dataset.attendance.len(),
                participation = dataset.participation.len(),
                "report ready"
            );
            Ok(Generation::Current(summary))
        } else {
            Ok(Generation::Superseded { ticket })
        }
    }

    /// Fetches fresh records and shapes them for an exporter. Does not
    /// touch the published summary state.
    pub async fn generate_export(
        &self,
        spec: &FilterSpec,
        options: ExportOptions,
    ) -> Result<ExportPayload, ReportError> {
        let dataset = Dataset::fetch(&self.source, self.kind, spec).await?;
        let payload = export_payload(
            self.kind,
            &dataset,
            spec,
            options,
            &self.config,
            Utc::now().date_naive(),
        );
        tracing::debug!(kind = ?self.kind, rows = payload.rows().len(), "export payload built");
        Ok(payload)
    }

    pub async fn export_to(
        &self,
        spec: &FilterSpec,
        options: ExportOptions,
        sink: &dyn ExportSink,
        format: ExportFormat,
    ) -> Result<PathBuf, ReportError> {
        let payload = self.generate_export(spec, options).await?;
        Ok(sink.serialize(&payload, format).await?)
    }

    pub async fn join_for_student(
        &self,
        student_id: &str,
        spec: &FilterSpec,
    ) -> Result<JoinedStudentView, ReportError> {
        let scoped = FilterSpec {
            student: Some(student_id.to_string()),
            ..spec.clone()
        };
        let dataset = Dataset::fetch(&self.source, ReportKind::Student, &scoped).await?;
        let records = dataset.filtered(&scoped);
        Ok(join_for_student(
            student_id,
            &records.grades,
            &records.attendance,
            &records.participation,
            &dataset.directory,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use tokio::sync::oneshot;

    use super::*;
    use crate::models::{
        AttendanceStatus, CourseDirectoryEntry, StudentDirectoryEntry, SubjectDirectoryEntry,
    };
    use crate::source::InMemorySource;

    fn grade(student: &str, course: &str, score: f64) -> GradeRecord {
        GradeRecord {
            student_id: student.to_string(),
            course_code: course.to_string(),
            subject_code: "MAT".to_string(),
            criterion: "Exam".to_string(),
            score,
            remarks: String::new(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        }
    }

    fn attendance(student: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            student_id: student.to_string(),
            course_code: "C1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            status,
            arrival_time: None,
            remarks: String::new(),
        }
    }

    fn source() -> InMemorySource {
        InMemorySource {
            grades: vec![grade("S1", "C1", 95.0), grade("S1", "C1", 40.0), grade("S2", "C2", 70.0)],
            attendance: vec![
                attendance("S1", AttendanceStatus::Present),
                attendance("S3", AttendanceStatus::Absent),
            ],
            participation: vec![],
            courses: vec![CourseDirectoryEntry {
                code: "C1".to_string(),
                name: "Second Year".to_string(),
                level: "Secondary".to_string(),
                section: "A".to_string(),
            }],
            subjects: vec![SubjectDirectoryEntry {
                code: "MAT".to_string(),
                name: "Mathematics".to_string(),
            }],
            students: vec![StudentDirectoryEntry {
                id: "S1".to_string(),
                full_name: "Avery Lee".to_string(),
            }],
        }
    }

    fn course(code: &str) -> FilterSpec {
        FilterSpec {
            course: Some(code.to_string()),
            ..FilterSpec::default()
        }
    }

    struct FailingSource;

    #[async_trait]
    impl RecordSource for FailingSource {
        async fn fetch_grades(&self, _: &FilterSpec) -> Result<Vec<GradeRecord>, SourceError> {
            Err(SourceError::Unavailable("api offline".to_string()))
        }

        async fn fetch_attendance(
            &self,
            _: &FilterSpec,
        ) -> Result<Vec<AttendanceRecord>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch_participation(
            &self,
            _: &FilterSpec,
        ) -> Result<Vec<ParticipationRecord>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch_courses(&self) -> Result<Vec<CourseDirectoryEntry>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch_subjects(&self) -> Result<Vec<SubjectDirectoryEntry>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch_students(&self) -> Result<Vec<StudentDirectoryEntry>, SourceError> {
            Ok(Vec::new())
        }
    }

    /// Serves records until taken offline.
    struct SwitchableSource {
        inner: InMemorySource,
        offline: AtomicBool,
    }

    #[async_trait]
    impl RecordSource for SwitchableSource {
        async fn fetch_grades(&self, spec: &FilterSpec) -> Result<Vec<GradeRecord>, SourceError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(SourceError::Unavailable("connection reset".to_string()));
            }
            self.inner.fetch_grades(spec).await
        }

        async fn fetch_attendance(
            &self,
            spec: &FilterSpec,
        ) -> Result<Vec<AttendanceRecord>, SourceError> {
            self.inner.fetch_attendance(spec).await
        }

        async fn fetch_participation(
            &self,
            spec: &FilterSpec,
        ) -> Result<Vec<ParticipationRecord>, SourceError> {
            self.inner.fetch_participation(spec).await
        }

        async fn fetch_courses(&self) -> Result<Vec<CourseDirectoryEntry>, SourceError> {
            self.inner.fetch_courses().await
        }

        async fn fetch_subjects(&self) -> Result<Vec<SubjectDirectoryEntry>, SourceError> {
            self.inner.fetch_subjects().await
        }

        async fn fetch_students(&self) -> Result<Vec<StudentDirectoryEntry>, SourceError> {
            self.inner.fetch_students().await
        }
    }

    /// Holds the first grade fetch until the test releases it.
    struct GatedSource {
        inner: InMemorySource,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl RecordSource for GatedSource {
        async fn fetch_grades(&self, spec: &FilterSpec) -> Result<Vec<GradeRecord>, SourceError> {
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.inner.fetch_grades(spec).await
        }

        async fn fetch_attendance(
            &self,
            spec: &FilterSpec,
        ) -> Result<Vec<AttendanceRecord>, SourceError> {
            self.inner.fetch_attendance(spec).await
        }

        async fn fetch_participation(
            &self,
            spec: &FilterSpec,
        ) -> Result<Vec<ParticipationRecord>, SourceError> {
            self.inner.fetch_participation(spec).await
        }

        async fn fetch_courses(&self) -> Result<Vec<CourseDirectoryEntry>, SourceError> {
            self.inner.fetch_courses().await
        }

        async fn fetch_subjects(&self) -> Result<Vec<SubjectDirectoryEntry>, SourceError> {
            self.inner.fetch_subjects().await
        }

        async fn fetch_students(&self) -> Result<Vec<StudentDirectoryEntry>, SourceError> {
            self.inner.fetch_students().await
        }
    }

    #[tokio::test]
    async fn summary_moves_state_to_ready() {
        let orchestrator =
            ReportOrchestrator::new(source(), ReportKind::Academic, ReportingConfig::default());
        assert_eq!(orchestrator.state(), ReportState::Idle);

        let generation = orchestrator.generate_summary(&course("C1")).await.unwrap();
        let Generation::Current(SummaryResult::Academic(summary)) = generation else {
            panic!("expected a current academic summary");
        };
        assert_eq!(summary.total, 2);
        assert!((summary.average - 67.5).abs() < 1e-9);
        assert!(matches!(orchestrator.state(), ReportState::Ready { ticket: 1, .. }));
    }

    #[tokio::test]
    async fn repeated_generation_is_identical() {
        let orchestrator =
            ReportOrchestrator::new(source(), ReportKind::Combined, ReportingConfig::default());
        let first = orchestrator.generate_summary(&course("C1")).await.unwrap();
        let second = orchestrator.generate_summary(&course("C1")).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn fetch_failure_clears_result() {
        let orchestrator = ReportOrchestrator::new(
            FailingSource,
            ReportKind::Academic,
            ReportingConfig::default(),
        );
        let result = orchestrator.generate_summary(&FilterSpec::default()).await;
        assert!(matches!(result, Err(ReportError::Fetch(SourceError::Unavailable(_)))));
        match orchestrator.state() {
            ReportState::Failed { ticket, message } => {
                assert_eq!(ticket, 1);
                assert!(message.contains("api offline"));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_after_success_drops_previous_result() {
        let orchestrator = ReportOrchestrator::new(
            SwitchableSource {
                inner: source(),
                offline: AtomicBool::new(false),
            },
            ReportKind::Academic,
            ReportingConfig::default(),
        );
        let updates = orchestrator.subscribe();

        orchestrator.generate_summary(&course("C1")).await.unwrap();
        assert!(matches!(orchestrator.state(), ReportState::Ready { ticket: 1, .. }));

        orchestrator.source.offline.store(true, Ordering::SeqCst);
        let result = orchestrator.generate_summary(&course("C1")).await;
        assert!(matches!(result, Err(ReportError::Fetch(SourceError::Unavailable(_)))));

        let state = updates.borrow().clone();
        match state {
            ReportState::Failed { ticket, message } => {
                assert_eq!(ticket, 2);
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn student_summary_without_student_is_empty() {
        let orchestrator =
            ReportOrchestrator::new(source(), ReportKind::Student, ReportingConfig::default());
        let generation = orchestrator
            .generate_summary(&FilterSpec::default())
            .await
            .unwrap();
        let Generation::Current(SummaryResult::Student(report)) = generation else {
            panic!("expected a current student summary");
        };
        assert_eq!(report.view.student_id, "");
        assert!(report.view.grades.is_empty());
        assert!(report.view.attendance.is_empty());
        assert!(report.view.participation.is_empty());
        assert_eq!(report.average_grade, 0.0);
        assert!(!report.passing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_settle_on_newest_ticket() {
        const REQUESTS: u64 = 32;
        let orchestrator = Arc::new(ReportOrchestrator::new(
            source(),
            ReportKind::Academic,
            ReportingConfig::default(),
        ));

        let mut handles = Vec::new();
        for i in 0..REQUESTS {
            let orchestrator = Arc::clone(&orchestrator);
            let spec = course(if i % 2 == 0 { "C1" } else { "C2" });
            handles.push(tokio::spawn(async move {
                orchestrator.generate_summary(&spec).await
            }));
        }

        let mut current = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                Generation::Current(_) => current += 1,
                Generation::Superseded { ticket } => assert!(ticket < REQUESTS),
            }
        }

        assert!(current >= 1);
        assert!(matches!(
            orchestrator.state(),
            ReportState::Ready { ticket: REQUESTS, .. }
        ));
    }

    #[tokio::test]
    async fn latest_request_wins() {
        let (release, gate) = oneshot::channel();
        let orchestrator = ReportOrchestrator::new(
            GatedSource {
                inner: source(),
                gate: Mutex::new(Some(gate)),
            },
            ReportKind::Academic,
            ReportingConfig::default(),
        );
        let mut updates = orchestrator.subscribe();
        let first_spec = course("C1");
        let second_spec = course("C2");

        let slow = orchestrator.generate_summary(&first_spec);
        let fast = async {
            let result = orchestrator.generate_summary(&second_spec).await;
            let _ = release.send(());
            result
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow.unwrap(), Generation::Superseded { ticket: 1 });
        assert!(matches!(fast.unwrap(), Generation::Current(_)));
        let state = updates.borrow_and_update().clone();
        match state {
            ReportState::Ready {
                ticket,
                summary: SummaryResult::Academic(summary),
            } => {
                assert_eq!(ticket, 2);
                assert_eq!(summary.total, 1);
                assert_eq!(summary.by_course[0].key, "C2");
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn export_names_follow_kind_and_date() {
        let dataset = Dataset {
            grades: vec![grade("S1", "C1", 80.0)],
            directory: Directory::new(source().courses, vec![], source().students),
            ..Dataset::default()
        };
        let generated_on = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();

        let payload = export_payload(
            ReportKind::Academic,
            &dataset,
            &course("C1"),
            ExportOptions::default(),
            &ReportingConfig::default(),
            generated_on,
        );
        assert_eq!(payload.title(), "Academic Report - Second Year A");
        assert_eq!(payload.filename_stem(), "academic_report_2026-06-01");

        let student = export_payload(
            ReportKind::Student,
            &dataset,
            &FilterSpec::for_student("S1"),
            ExportOptions { include_remarks: true },
            &ReportingConfig::default(),
            generated_on,
        );
        assert_eq!(student.title(), "Student Report - Avery Lee");
        assert_eq!(student.filename_stem(), "student_report_S1_2026-06-01");
        assert_eq!(student.rows().len(), 1);
        assert_eq!(student.headers().len(), 7);
    }

    #[tokio::test]
    async fn student_join_is_scoped_to_one_student() {
        let orchestrator =
            ReportOrchestrator::new(source(), ReportKind::Student, ReportingConfig::default());
        let view = orchestrator
            .join_for_student("S1", &FilterSpec::default())
            .await
            .unwrap();
        assert_eq!(view.student_name, "Avery Lee");
        assert_eq!(view.grades.len(), 2);
        assert_eq!(view.attendance.len(), 1);
    }
}
