use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::error::SourceError;
use crate::filter::FilterSpec;
use crate::models::{
    AttendanceRecord, AttendanceStatus, CourseDirectoryEntry, GradeRecord, ParticipationRecord,
    RecordKind, StudentDirectoryEntry, SubjectDirectoryEntry,
};
use crate::source::RecordSource;

pub async fn connect(database_url: &str) -> Result<PgPool, SourceError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> Result<(), SourceError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn invalid_date(value: &str) -> SourceError {
    SourceError::InvalidValue {
        field: "date",
        value: value.to_string(),
    }
}

fn seed_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, SourceError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| invalid_date(&format!("{year}-{month}-{day}")))
}

fn seed_timestamp(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>, SourceError> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .ok_or_else(|| invalid_date(&format!("{year}-{month}-{day}")))
}

pub async fn seed(pool: &PgPool) -> Result<(), SourceError> {
    let courses = vec![
        ("SEC1-A", "First Year", "Secondary", "A"),
        ("SEC1-B", "First Year", "Secondary", "B"),
    ];
    for (code, name, level, section) in courses {
        sqlx::query(
            r#"
            INSERT INTO academic_reports.courses (code, name, level, section)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (code) DO UPDATE
            SET name = EXCLUDED.name, level = EXCLUDED.level, section = EXCLUDED.section
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(level)
        .bind(section)
        .execute(pool)
        .await?;
    }

    let subjects = vec![("MAT", "Mathematics"), ("LAN", "Language"), ("SCI", "Science")];
    for (code, name) in subjects {
        sqlx::query(
            r#"
            INSERT INTO academic_reports.subjects (code, name)
            VALUES ($1, $2)
            ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(code)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let students = vec![
        ("STU-001", "Avery Lee"),
        ("STU-002", "Jules Moreno"),
        ("STU-003", "Kiara Patel"),
        ("STU-004", "Tomas Rivera"),
    ];
    for (id, full_name) in students {
        sqlx::query(
            r#"
            INSERT INTO academic_reports.students (id, full_name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name
            "#,
        )
        .bind(id)
        .bind(full_name)
        .execute(pool)
        .await?;
    }

    let midterm_a = seed_timestamp(2026, 3, 9)?;
    let midterm_b = seed_timestamp(2026, 3, 10)?;
    let essay = seed_timestamp(2026, 3, 16)?;
    let lab = seed_timestamp(2026, 3, 20)?;
    let grades = vec![
        ("seed-g-001", "STU-001", "SEC1-A", "MAT", "Midterm exam", 92.0, "", midterm_a),
        ("seed-g-002", "STU-002", "SEC1-A", "MAT", "Midterm exam", 48.0, "Tutoring", midterm_a),
        ("seed-g-003", "STU-003", "SEC1-A", "MAT", "Midterm exam", 77.5, "", midterm_a),
        ("seed-g-004", "STU-001", "SEC1-A", "LAN", "Essay", 85.0, "", essay),
        ("seed-g-005", "STU-002", "SEC1-A", "LAN", "Essay", 55.0, "Late submission", essay),
        ("seed-g-006", "STU-003", "SEC1-A", "SCI", "Lab report", 64.0, "", lab),
        ("seed-g-007", "STU-004", "SEC1-B", "MAT", "Midterm exam", 71.0, "", midterm_b),
    ];
    for (source_key, student, course, subject, criterion, score, remarks, created_at) in grades {
        insert_grade(
            pool,
            source_key,
            &GradeRecord {
                student_id: student.to_string(),
                course_code: course.to_string(),
                subject_code: subject.to_string(),
                criterion: criterion.to_string(),
                score,
                remarks: remarks.to_string(),
                created_at,
            },
        )
        .await?;
    }

    let monday = seed_date(2026, 3, 2)?;
    let tuesday = seed_date(2026, 3, 3)?;
    let late_arrival = NaiveTime::from_hms_opt(8, 20, 0);
    let attendance = vec![
        ("seed-a-001", "STU-001", monday, AttendanceStatus::Present, None, ""),
        ("seed-a-002", "STU-002", monday, AttendanceStatus::Absent, None, "No notice"),
        ("seed-a-003", "STU-003", monday, AttendanceStatus::Late, late_arrival, ""),
        ("seed-a-004", "STU-001", tuesday, AttendanceStatus::Present, None, ""),
        ("seed-a-005", "STU-002", tuesday, AttendanceStatus::Absent, None, ""),
        ("seed-a-006", "STU-003", tuesday, AttendanceStatus::Excused, None, "Medical appointment"),
    ];
    for (source_key, student, date, status, arrival_time, remarks) in attendance {
        insert_attendance(
            pool,
            source_key,
            &AttendanceRecord {
                student_id: student.to_string(),
                course_code: "SEC1-A".to_string(),
                date,
                status,
                arrival_time,
                remarks: remarks.to_string(),
            },
        )
        .await?;
    }

    let participation = vec![
        ("seed-p-001", "STU-001", "MAT", seed_date(2026, 3, 4)?, "Oral answer", 5.0, ""),
        ("seed-p-002", "STU-003", "MAT", seed_date(2026, 3, 4)?, "Board exercise", 4.0, ""),
        ("seed-p-003", "STU-002", "LAN", seed_date(2026, 3, 5)?, "Debate", 2.0, "Distracted"),
        ("seed-p-004", "STU-001", "LAN", seed_date(2026, 3, 5)?, "Debate", 4.5, ""),
    ];
    for (source_key, student, subject, date, kind, score, remarks) in participation {
        insert_participation(
            pool,
            source_key,
            &ParticipationRecord {
                student_id: student.to_string(),
                course_code: "SEC1-A".to_string(),
                subject_code: subject.to_string(),
                date,
                participation_type: kind.to_string(),
                score,
                remarks: remarks.to_string(),
            },
        )
        .await?;
    }

    Ok(())
}

async fn insert_grade(
    pool: &PgPool,
    source_key: &str,
    record: &GradeRecord,
) -> Result<u64, SourceError> {
    let result = sqlx::query(
        r#"
        INSERT INTO academic_reports.grades
        (id, student_id, course_code, subject_code, criterion, score, remarks,
         created_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&record.student_id)
    .bind(&record.course_code)
    .bind(&record.subject_code)
    .bind(&record.criterion)
    .bind(record.score)
    .bind(&record.remarks)
    .bind(record.created_at)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

async fn insert_attendance(
    pool: &PgPool,
    source_key: &str,
    record: &AttendanceRecord,
) -> Result<u64, SourceError> {
    let result = sqlx::query(
        r#"
        INSERT INTO academic_reports.attendance
        (id, student_id, course_code, date, status, arrival_time, remarks, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&record.student_id)
    .bind(&record.course_code)
    .bind(record.date)
    .bind(record.status.as_str())
    .bind(record.arrival_time)
    .bind(&record.remarks)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

async fn insert_participation(
    pool: &PgPool,
    source_key: &str,
    record: &ParticipationRecord,
) -> Result<u64, SourceError> {
    let result = sqlx::query(
        r#"
        INSERT INTO academic_reports.participation
        (id, student_id, course_code, subject_code, date, participation_type, score,
         remarks, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&record.student_id)
    .bind(&record.course_code)
    .bind(&record.subject_code)
    .bind(record.date)
    .bind(&record.participation_type)
    .bind(record.score)
    .bind(&record.remarks)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

fn source_key_or_new(source_key: Option<String>) -> String {
    source_key
        .filter(|key| !key.trim().is_empty())
        .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()))
}

/// Loads one kind of record from a CSV file. Rows whose `source_key`
/// already exists are skipped; the count of inserted rows is returned.
pub async fn import_csv(
    pool: &PgPool,
    kind: RecordKind,
    csv_path: &Path,
) -> Result<usize, SourceError> {
    #[derive(Deserialize)]
    struct GradeRow {
        student_id: String,
        course_code: String,
        subject_code: String,
        criterion: String,
        score: f64,
        remarks: Option<String>,
        created_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    #[derive(Deserialize)]
    struct AttendanceRow {
        student_id: String,
        course_code: String,
        date: NaiveDate,
        status: String,
        arrival_time: Option<NaiveTime>,
        remarks: Option<String>,
        source_key: Option<String>,
    }

    #[derive(Deserialize)]
    struct ParticipationRow {
        student_id: String,
        course_code: String,
        subject_code: String,
        date: NaiveDate,
        participation_type: String,
        score: f64,
        remarks: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    match kind {
        RecordKind::Grades => {
            for result in reader.deserialize::<GradeRow>() {
                let row = result?;
                let record = GradeRecord {
                    student_id: row.student_id,
                    course_code: row.course_code,
                    subject_code: row.subject_code,
                    criterion: row.criterion,
                    score: row.score,
                    remarks: row.remarks.unwrap_or_default(),
                    created_at: row.created_at,
                };
                let key = source_key_or_new(row.source_key);
                if insert_grade(pool, &key, &record).await? > 0 {
                    inserted += 1;
                }
            }
        }
        RecordKind::Attendance => {
            for result in reader.deserialize::<AttendanceRow>() {
                let row = result?;
                let record = AttendanceRecord {
                    student_id: row.student_id,
                    course_code: row.course_code,
                    date: row.date,
                    status: row.status.parse()?,
                    arrival_time: row.arrival_time,
                    remarks: row.remarks.unwrap_or_default(),
                };
                let key = source_key_or_new(row.source_key);
                if insert_attendance(pool, &key, &record).await? > 0 {
                    inserted += 1;
                }
            }
        }
        RecordKind::Participation => {
            for result in reader.deserialize::<ParticipationRow>() {
                let row = result?;
                let record = ParticipationRecord {
                    student_id: row.student_id,
                    course_code: row.course_code,
                    subject_code: row.subject_code,
                    date: row.date,
                    participation_type: row.participation_type,
                    score: row.score,
                    remarks: row.remarks.unwrap_or_default(),
                };
                let key = source_key_or_new(row.source_key);
                if insert_participation(pool, &key, &record).await? > 0 {
                    inserted += 1;
                }
            }
        }
    }

    tracing::info!(kind = ?kind, inserted, path = %csv_path.display(), "csv import finished");
    Ok(inserted)
}

/// Server-side scoping columns for one table. `None` means the table has
/// no such dimension.
struct ScopeColumns {
    subject: Option<&'static str>,
    date: &'static str,
    selector: Option<&'static str>,
    score: Option<&'static str>,
}

/// Grades are dated by the UTC calendar day of `created_at`, whatever the
/// session time zone is.
const GRADE_SCOPE: ScopeColumns = ScopeColumns {
    subject: Some("subject_code"),
    date: "(created_at AT TIME ZONE 'UTC')::date",
    selector: None,
    score: Some("score"),
};

const ATTENDANCE_SCOPE: ScopeColumns = ScopeColumns {
    subject: None,
    date: "date",
    selector: Some("status"),
    score: None,
};

const PARTICIPATION_SCOPE: ScopeColumns = ScopeColumns {
    subject: Some("subject_code"),
    date: "date",
    selector: Some("participation_type"),
    score: Some("score"),
};

fn push_scope(
    builder: &mut QueryBuilder<'_, Postgres>,
    spec: &FilterSpec,
    columns: &ScopeColumns,
) {
    builder.push(" WHERE TRUE");

    if let Some(course) = &spec.course {
        builder.push(" AND course_code = ").push_bind(course.clone());
    }
    if let (Some(column), Some(subject)) = (columns.subject, &spec.subject) {
        builder.push(format!(" AND {column} = ")).push_bind(subject.clone());
    }
    if let Some(student) = &spec.student {
        builder.push(" AND student_id = ").push_bind(student.clone());
    }
    if let Some(range) = spec.date_range {
        if let Some(start) = range.start {
            builder.push(format!(" AND {} >= ", columns.date)).push_bind(start);
        }
        if let Some(end) = range.end {
            builder.push(format!(" AND {} <= ", columns.date)).push_bind(end);
        }
    }
    if let (Some(column), Some(selector)) = (columns.selector, &spec.selector) {
        builder.push(format!(" AND {column} = ")).push_bind(selector.clone());
    }
    if let (Some(column), Some(range)) = (columns.score, spec.score_range) {
        if let Some(min) = range.min {
            builder.push(format!(" AND {column} >= ")).push_bind(min);
        }
        if let Some(max) = range.max {
            builder.push(format!(" AND {column} <= ")).push_bind(max);
        }
    }
}

fn grade_from_row(row: &PgRow) -> Result<GradeRecord, SourceError> {
    Ok(GradeRecord {
        student_id: row.try_get("student_id")?,
        course_code: row.try_get("course_code")?,
        subject_code: row.try_get("subject_code")?,
        criterion: row.try_get("criterion")?,
        score: row.try_get("score")?,
        remarks: row.try_get("remarks")?,
        created_at: row.try_get("created_at")?,
    })
}

fn attendance_from_row(row: &PgRow) -> Result<AttendanceRecord, SourceError> {
    let status: String = row.try_get("status")?;
    Ok(AttendanceRecord {
        student_id: row.try_get("student_id")?,
        course_code: row.try_get("course_code")?,
        date: row.try_get("date")?,
        status: status.parse()?,
        arrival_time: row.try_get("arrival_time")?,
        remarks: row.try_get("remarks")?,
    })
}

fn participation_from_row(row: &PgRow) -> Result<ParticipationRecord, SourceError> {
    Ok(ParticipationRecord {
        student_id: row.try_get("student_id")?,
        course_code: row.try_get("course_code")?,
        subject_code: row.try_get("subject_code")?,
        date: row.try_get("date")?,
        participation_type: row.try_get("participation_type")?,
        score: row.try_get("score")?,
        remarks: row.try_get("remarks")?,
    })
}

#[derive(Debug, Clone)]
pub struct PgRecordSource {
    pool: PgPool,
}

impl PgRecordSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSource for PgRecordSource {
    async fn fetch_grades(&self, spec: &FilterSpec) -> Result<Vec<GradeRecord>, SourceError> {
        let mut builder = QueryBuilder::new(
            "SELECT student_id, course_code, subject_code, criterion, score, remarks, created_at \
             FROM academic_reports.grades",
        );
        push_scope(&mut builder, spec, &GRADE_SCOPE);
        builder.push(" ORDER BY created_at, student_id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let records = rows.iter().map(grade_from_row).collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(count = records.len(), "fetched grades");
        Ok(records)
    }

    async fn fetch_attendance(
        &self,
        spec: &FilterSpec,
    ) -> Result<Vec<AttendanceRecord>, SourceError> {
        let mut builder = QueryBuilder::new(
            "SELECT student_id, course_code, date, status, arrival_time, remarks \
             FROM academic_reports.attendance",
        );
        push_scope(&mut builder, spec, &ATTENDANCE_SCOPE);
        builder.push(" ORDER BY date, student_id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let records = rows
            .iter()
            .map(attendance_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(count = records.len(), "fetched attendance");
        Ok(records)
    }

    async fn fetch_participation(
        &self,
        spec: &FilterSpec,
    ) -> Result<Vec<ParticipationRecord>, SourceError> {
        let mut builder = QueryBuilder::new(
            "SELECT student_id, course_code, subject_code, date, participation_type, score, \
             remarks FROM academic_reports.participation",
        );
        push_scope(&mut builder, spec, &PARTICIPATION_SCOPE);
        builder.push(" ORDER BY date, student_id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let records = rows
            .iter()
            .map(participation_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(count = records.len(), "fetched participation");
        Ok(records)
    }

    async fn fetch_courses(&self) -> Result<Vec<CourseDirectoryEntry>, SourceError> {
        let rows = sqlx::query(
            "SELECT code, name, level, section FROM academic_reports.courses ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            courses.push(CourseDirectoryEntry {
                code: row.try_get("code")?,
                name: row.try_get("name")?,
                level: row.try_get("level")?,
                section: row.try_get("section")?,
            });
        }
        Ok(courses)
    }

    async fn fetch_subjects(&self) -> Result<Vec<SubjectDirectoryEntry>, SourceError> {
        let rows = sqlx::query("SELECT code, name FROM academic_reports.subjects ORDER BY code")
            .fetch_all(&self.pool)
            .await?;

        let mut subjects = Vec::with_capacity(rows.len());
        for row in rows {
            subjects.push(SubjectDirectoryEntry {
                code: row.try_get("code")?,
                name: row.try_get("name")?,
            });
        }
        Ok(subjects)
    }

    async fn fetch_students(&self) -> Result<Vec<StudentDirectoryEntry>, SourceError> {
        let rows = sqlx::query("SELECT id, full_name FROM academic_reports.students ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut students = Vec::with_capacity(rows.len());
        for row in rows {
            students.push(StudentDirectoryEntry {
                id: row.try_get("id")?,
                full_name: row.try_get("full_name")?,
            });
        }
        Ok(students)
    }
}
