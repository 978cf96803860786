//! Client-side narrowing of record collections.
//!
//! `None` is the single representation of "no constraint". Raw UI values
//! pass through [`normalize_selector`] before they reach a [`FilterSpec`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{AttendanceRecord, GradeRecord, ParticipationRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Inclusive on both ends. A start after the end matches nothing.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start)
            && self.end.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ScoreRange {
    pub fn contains(&self, score: f64) -> bool {
        self.min.map_or(true, |min| score >= min)
            && self.max.map_or(true, |max| score <= max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub course: Option<String>,
    pub subject: Option<String>,
    pub student: Option<String>,
    pub date_range: Option<DateRange>,
    /// Attendance status or participation type.
    pub selector: Option<String>,
    pub score_range: Option<ScoreRange>,
}

/// Maps blank and `"all"` (any case) to `None`; trims everything else.
pub fn normalize_selector(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawFilter<'a> {
    pub course: Option<&'a str>,
    pub subject: Option<&'a str>,
    pub student: Option<&'a str>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub selector: Option<&'a str>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
}

impl FilterSpec {
    pub fn from_raw(raw: &RawFilter<'_>) -> Self {
        let date_range = (raw.from.is_some() || raw.to.is_some()).then_some(DateRange {
            start: raw.from,
            end: raw.to,
        });
        let score_range = (raw.min_score.is_some() || raw.max_score.is_some()).then_some(
            ScoreRange {
                min: raw.min_score,
                max: raw.max_score,
            },
        );

        Self {
            course: normalize_selector(raw.course),
            subject: normalize_selector(raw.subject),
            student: normalize_selector(raw.student),
            date_range,
            selector: normalize_selector(raw.selector),
            score_range,
        }
    }

    pub fn for_student(student_id: &str) -> Self {
        Self {
            student: Some(student_id.to_string()),
            ..Self::default()
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches<R: Filterable>(&self, record: &R) -> bool {
        fn eq(wanted: Option<&String>, actual: Option<&str>) -> bool {
            match (wanted, actual) {
                (Some(wanted), Some(actual)) => wanted == actual,
                _ => true,
            }
        }

        eq(self.course.as_ref(), Some(record.course_code()))
            && eq(self.subject.as_ref(), record.subject_code())
            && eq(self.student.as_ref(), Some(record.student_id()))
            && eq(self.selector.as_ref(), record.selector())
            && self
                .date_range
                .map_or(true, |range| range.contains(record.date()))
            && match (self.score_range, record.score()) {
                (Some(range), Some(score)) => range.contains(score),
                _ => true,
            }
    }
}

/// Dimensions a record exposes to a [`FilterSpec`]. A dimension a kind
/// does not carry returns `None` and is never constrained.
pub trait Filterable {
    fn student_id(&self) -> &str;
    fn course_code(&self) -> &str;
    fn subject_code(&self) -> Option<&str>;
    fn date(&self) -> NaiveDate;
    fn selector(&self) -> Option<&str>;
    fn score(&self) -> Option<f64>;
}

impl Filterable for GradeRecord {
    fn student_id(&self) -> &str {
        &self.student_id
    }

    fn course_code(&self) -> &str {
        &self.course_code
    }

    fn subject_code(&self) -> Option<&str> {
        Some(&self.subject_code)
    }

    fn date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    fn selector(&self) -> Option<&str> {
        None
    }

    fn score(&self) -> Option<f64> {
        Some(self.score)
    }
}

impl Filterable for AttendanceRecord {
    fn student_id(&self) -> &str {
        &self.student_id
    }

    fn course_code(&self) -> &str {
        &self.course_code
    }

    fn subject_code(&self) -> Option<&str> {
        None
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn selector(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn score(&self) -> Option<f64> {
        None
    }
}

impl Filterable for ParticipationRecord {
    fn student_id(&self) -> &str {
        &self.student_id
    }

    fn course_code(&self) -> &str {
        &self.course_code
    }

    fn subject_code(&self) -> Option<&str> {
        Some(&self.subject_code)
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn selector(&self) -> Option<&str> {
        Some(&self.participation_type)
    }

    fn score(&self) -> Option<f64> {
        Some(self.score)
    }
}

/// Records matching every populated field of `spec`, in input order.
pub fn filter_records<R: Filterable + Clone>(records: &[R], spec: &FilterSpec) -> Vec<R> {
    if spec.is_unconstrained() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| spec.matches(*record))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::AttendanceStatus;

    fn grade(student: &str, course: &str, subject: &str, score: f64, day: u32) -> GradeRecord {
        GradeRecord {
            student_id: student.to_string(),
            course_code: course.to_string(),
            subject_code: subject.to_string(),
            criterion: "Exam".to_string(),
            score,
            remarks: String::new(),
            created_at: Utc.with_ymd_and_hms(2026, 3, day, 10, 0, 0).unwrap(),
        }
    }

    fn attendance(student: &str, status: AttendanceStatus, day: u32) -> AttendanceRecord {
        AttendanceRecord {
            student_id: student.to_string(),
            course_code: "C1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            status,
            arrival_time: None,
            remarks: String::new(),
        }
    }

    #[test]
    fn unconstrained_spec_is_identity() {
        let grades = vec![
            grade("S1", "C1", "MAT", 90.0, 1),
            grade("S2", "C2", "LEN", 40.0, 2),
        ];
        assert_eq!(filter_records(&grades, &FilterSpec::default()), grades);
    }

    #[test]
    fn populated_fields_all_must_match() {
        let grades = vec![
            grade("S1", "C1", "MAT", 90.0, 1),
            grade("S1", "C1", "LEN", 70.0, 2),
            grade("S2", "C1", "MAT", 40.0, 3),
        ];
        let spec = FilterSpec {
            course: Some("C1".to_string()),
            subject: Some("MAT".to_string()),
            score_range: Some(ScoreRange {
                min: Some(50.0),
                max: None,
            }),
            ..FilterSpec::default()
        };
        let filtered = filter_records(&grades, &spec);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].student_id, "S1");
        assert_eq!(filtered[0].subject_code, "MAT");
    }

    #[test]
    fn date_range_is_inclusive() {
        let records = vec![
            attendance("S1", AttendanceStatus::Present, 1),
            attendance("S1", AttendanceStatus::Absent, 5),
            attendance("S1", AttendanceStatus::Late, 10),
        ];
        let spec = FilterSpec {
            date_range: Some(DateRange {
                start: NaiveDate::from_ymd_opt(2026, 3, 1),
                end: NaiveDate::from_ymd_opt(2026, 3, 5),
            }),
            ..FilterSpec::default()
        };
        assert_eq!(filter_records(&records, &spec).len(), 2);
    }

    #[test]
    fn inverted_date_range_yields_empty_result() {
        let records = vec![attendance("S1", AttendanceStatus::Present, 3)];
        let spec = FilterSpec {
            date_range: Some(DateRange {
                start: NaiveDate::from_ymd_opt(2026, 3, 10),
                end: NaiveDate::from_ymd_opt(2026, 3, 1),
            }),
            ..FilterSpec::default()
        };
        assert!(filter_records(&records, &spec).is_empty());
    }

    #[test]
    fn selector_matches_attendance_status() {
        let records = vec![
            attendance("S1", AttendanceStatus::Present, 1),
            attendance("S2", AttendanceStatus::Absent, 1),
        ];
        let spec = FilterSpec {
            selector: Some("absent".to_string()),
            ..FilterSpec::default()
        };
        let filtered = filter_records(&records, &spec);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].student_id, "S2");
    }

    #[test]
    fn dimensions_missing_from_a_kind_are_ignored() {
        let records = vec![attendance("S1", AttendanceStatus::Present, 1)];
        let spec = FilterSpec {
            subject: Some("MAT".to_string()),
            score_range: Some(ScoreRange {
                min: Some(99.0),
                max: None,
            }),
            ..FilterSpec::default()
        };
        assert_eq!(filter_records(&records, &spec).len(), 1);
    }

    #[test]
    fn blank_and_all_normalize_to_unset() {
        assert_eq!(normalize_selector(None), None);
        assert_eq!(normalize_selector(Some("")), None);
        assert_eq!(normalize_selector(Some("   ")), None);
        assert_eq!(normalize_selector(Some("ALL")), None);
        assert_eq!(normalize_selector(Some(" C1 ")), Some("C1".to_string()));

        let spec = FilterSpec::from_raw(&RawFilter {
            course: Some("all"),
            student: Some(""),
            ..RawFilter::default()
        });
        assert!(spec.is_unconstrained());
    }
}
