//! Per-student denormalized views over the three record streams.

use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::{effective_rate, mean};
use crate::models::{AttendanceRecord, Directory, GradeRecord, ParticipationRecord};

/// One student's records. Derived figures are computed on request so the
/// view never carries stale statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedStudentView {
    pub student_id: String,
    pub student_name: String,
    pub grades: Vec<GradeRecord>,
    pub attendance: Vec<AttendanceRecord>,
    pub participation: Vec<ParticipationRecord>,
}

impl JoinedStudentView {
    fn empty(student_id: &str, directory: &Directory) -> Self {
        Self {
            student_id: student_id.to_string(),
            student_name: directory.student_name(student_id),
            grades: Vec::new(),
            attendance: Vec::new(),
            participation: Vec::new(),
        }
    }

    pub fn mean_grade(&self) -> f64 {
        mean(self.grades.iter().map(|g| g.score))
    }

    pub fn attendance_rate(&self) -> f64 {
        effective_rate(&self.attendance)
    }

    pub fn mean_participation(&self) -> f64 {
        mean(self.participation.iter().map(|p| p.score))
    }

    pub fn is_passing(&self, passing_grade: f64) -> bool {
        !self.grades.is_empty() && self.mean_grade() >= passing_grade
    }

    pub fn is_participation_passing(&self, participation_passing: f64) -> bool {
        !self.participation.is_empty() && self.mean_participation() >= participation_passing
    }
}

/// Grade-anchored join: one view per student found in `grades`, in the
/// order they first appear. Students with only attendance or
/// participation records are left out.
pub fn join_by_student(
    grades: &[GradeRecord],
    attendance: &[AttendanceRecord],
    participation: &[ParticipationRecord],
    directory: &Directory,
) -> Vec<JoinedStudentView> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut views: Vec<JoinedStudentView> = Vec::new();

    for grade in grades {
        let position = *index.entry(grade.student_id.as_str()).or_insert_with(|| {
            views.push(JoinedStudentView::empty(&grade.student_id, directory));
            views.len() - 1
        });
        views[position].grades.push(grade.clone());
    }

    for record in attendance {
        if let Some(&position) = index.get(record.student_id.as_str()) {
            views[position].attendance.push(record.clone());
        }
    }

    for record in participation {
        if let Some(&position) = index.get(record.student_id.as_str()) {
            views[position].participation.push(record.clone());
        }
    }

    views
}

/// All records of one student. Unlike [`join_by_student`] this always
/// returns a view, empty when the student has no records.
pub fn join_for_student(
    student_id: &str,
    grades: &[GradeRecord],
    attendance: &[AttendanceRecord],
    participation: &[ParticipationRecord],
    directory: &Directory,
) -> JoinedStudentView {
    let mut view = JoinedStudentView::empty(student_id, directory);
    view.grades = grades
        .iter()
        .filter(|g| g.student_id == student_id)
        .cloned()
        .collect();
    view.attendance = attendance
        .iter()
        .filter(|a| a.student_id == student_id)
        .cloned()
        .collect();
    view.participation = participation
        .iter()
        .filter(|p| p.student_id == student_id)
        .cloned()
        .collect();
    view
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::models::AttendanceStatus;

    fn grade(student: &str, score: f64) -> GradeRecord {
        GradeRecord {
            student_id: student.to_string(),
            course_code: "C1".to_string(),
            subject_code: "MAT".to_string(),
            criterion: "Quiz".to_string(),
            score,
            remarks: String::new(),
            created_at: Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap(),
        }
    }

    fn attendance(student: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            student_id: student.to_string(),
            course_code: "C1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            status,
            arrival_time: None,
            remarks: String::new(),
        }
    }

    fn participation(student: &str, score: f64) -> ParticipationRecord {
        ParticipationRecord {
            student_id: student.to_string(),
            course_code: "C1".to_string(),
            subject_code: "MAT".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            participation_type: "oral".to_string(),
            score,
            remarks: String::new(),
        }
    }

    #[test]
    fn views_follow_grade_order_and_attach_matches() {
        let grades = vec![grade("S2", 70.0), grade("S1", 90.0), grade("S2", 50.0)];
        let attendance = vec![
            attendance("S1", AttendanceStatus::Present),
            attendance("S1", AttendanceStatus::Absent),
        ];
        let participation = vec![participation("S2", 4.0)];

        let views = join_by_student(&grades, &attendance, &participation, &Directory::default());
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].student_id, "S2");
        assert_eq!(views[0].grades.len(), 2);
        assert!((views[0].mean_grade() - 60.0).abs() < 1e-9);
        assert_eq!(views[0].participation.len(), 1);
        assert_eq!(views[1].attendance.len(), 2);
        assert_eq!(views[1].attendance_rate(), 50.0);
    }

    #[test]
    fn students_without_grades_are_excluded() {
        let grades = vec![grade("S1", 80.0)];
        let attendance = vec![attendance("S2", AttendanceStatus::Present)];
        let views = join_by_student(&grades, &attendance, &[], &Directory::default());
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].student_id, "S1");
        assert!(views[0].attendance.is_empty());
    }

    #[test]
    fn single_student_view_can_be_empty() {
        let view = join_for_student("S9", &[grade("S1", 80.0)], &[], &[], &Directory::default());
        assert_eq!(view.student_id, "S9");
        assert!(view.grades.is_empty());
        assert_eq!(view.mean_grade(), 0.0);
        assert_eq!(view.attendance_rate(), 0.0);
        assert!(!view.is_passing(51.0));
    }
}
