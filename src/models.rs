use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// The three record streams the reports consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Grades,
    Attendance,
    Participation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub student_id: String,
    pub course_code: String,
    pub subject_code: String,
    pub criterion: String,
    pub score: f64,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 4] = [
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
        AttendanceStatus::Late,
        AttendanceStatus::Excused,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }

    /// Absent is the only status that does not count toward attendance.
    pub fn is_effective(self) -> bool {
        !matches!(self, AttendanceStatus::Absent)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = SourceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "excused" => Ok(AttendanceStatus::Excused),
            _ => Err(SourceError::InvalidValue {
                field: "attendance status",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: String,
    pub course_code: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub arrival_time: Option<NaiveTime>,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub student_id: String,
    pub course_code: String,
    pub subject_code: String,
    pub date: NaiveDate,
    pub participation_type: String,
    pub score: f64,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDirectoryEntry {
    pub code: String,
    pub name: String,
    pub level: String,
    pub section: String,
}

impl CourseDirectoryEntry {
    pub fn label(&self) -> String {
        if self.section.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.section)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDirectoryEntry {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDirectoryEntry {
    pub id: String,
    pub full_name: String,
}

/// Label lookup for courses, subjects and students. Never computed over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directory {
    courses: HashMap<String, CourseDirectoryEntry>,
    subjects: HashMap<String, String>,
    students: HashMap<String, String>,
}

impl Directory {
    pub fn new(
        courses: Vec<CourseDirectoryEntry>,
        subjects: Vec<SubjectDirectoryEntry>,
        students: Vec<StudentDirectoryEntry>,
    ) -> Self {
        Self {
            courses: courses.into_iter().map(|c| (c.code.clone(), c)).collect(),
            subjects: subjects.into_iter().map(|s| (s.code, s.name)).collect(),
            students: students.into_iter().map(|s| (s.id, s.full_name)).collect(),
        }
    }

    /// Falls back to the raw code for unknown courses.
    pub fn course_label(&self, code: &str) -> String {
        self.courses
            .get(code)
            .map(CourseDirectoryEntry::label)
            .unwrap_or_else(|| code.to_string())
    }

    pub fn subject_label(&self, code: &str) -> String {
        self.subjects
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    pub fn student_name(&self, id: &str) -> String {
        self.students
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}
