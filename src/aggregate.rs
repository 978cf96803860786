//! Summary statistics over filtered record collections.
//!
//! Every function here is total: empty input produces zeroed results,
//! never NaN and never an error.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{Bucket, ReportingConfig, GRADE_BUCKETS, PARTICIPATION_BUCKETS};
use crate::join::JoinedStudentView;
use crate::models::{
    AttendanceRecord, AttendanceStatus, Directory, GradeRecord, ParticipationRecord,
};

/// Arithmetic mean; an empty input has a mean of 0.
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0_f64, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// `part` as a percent of `total`; 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PassFail {
    pub passed: usize,
    pub failed: usize,
}

impl PassFail {
    pub fn pass_rate(&self) -> f64 {
        percentage(self.passed, self.passed + self.failed)
    }
}

/// A score passes when it is at or above `threshold`.
pub fn pass_fail<I>(scores: I, threshold: f64) -> PassFail
where
    I: IntoIterator<Item = f64>,
{
    scores
        .into_iter()
        .fold(PassFail::default(), |mut tally, score| {
            if score >= threshold {
                tally.passed += 1;
            } else {
                tally.failed += 1;
            }
            tally
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub percentage: f64,
}

/// Index of the bucket holding `score`. Buckets are ordered highest first
/// and contiguous; out-of-domain scores land in the nearest edge bucket.
fn bucket_index(score: f64, buckets: &[Bucket]) -> usize {
    buckets
        .iter()
        .position(|bucket| score >= bucket.min)
        .unwrap_or(buckets.len().saturating_sub(1))
}

pub fn distribution<I>(scores: I, buckets: &[Bucket]) -> Vec<BucketCount>
where
    I: IntoIterator<Item = f64>,
{
    let mut counts = vec![0usize; buckets.len()];
    let mut total = 0usize;
    if !buckets.is_empty() {
        for score in scores {
            counts[bucket_index(score, buckets)] += 1;
            total += 1;
        }
    }

    buckets
        .iter()
        .zip(counts)
        .map(|(bucket, count)| BucketCount {
            label: bucket.label.to_string(),
            min: bucket.min,
            max: bucket.max,
            count,
            percentage: percentage(count, total),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: AttendanceStatus,
    pub count: usize,
    pub percentage: f64,
}

/// All four statuses, always in the same order, zero-filled.
pub fn status_counts(records: &[AttendanceRecord]) -> Vec<StatusCount> {
    AttendanceStatus::ALL
        .iter()
        .map(|&status| {
            let count = records.iter().filter(|r| r.status == status).count();
            StatusCount {
                status,
                count,
                percentage: percentage(count, records.len()),
            }
        })
        .collect()
}

/// Percent of records whose status is present, late or excused.
pub fn effective_rate<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let (effective, total) = records.into_iter().fold((0usize, 0usize), |(e, t), r| {
        (e + usize::from(r.status.is_effective()), t + 1)
    });
    percentage(effective, total)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeCount {
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

/// Counts per participation label, in the order labels first appear.
pub fn type_counts(records: &[ParticipationRecord]) -> Vec<TypeCount> {
    group_first_seen(records, |r| r.participation_type.clone())
        .into_iter()
        .map(|(label, members)| TypeCount {
            label,
            count: members.len(),
            percentage: percentage(members.len(), records.len()),
        })
        .collect()
}

/// Groups items by key, keeping groups in first-encountered order.
fn group_first_seen<T, K, F>(items: &[T], key: F) -> Vec<(K, Vec<&T>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&T>)> = Vec::new();

    for item in items {
        let k = key(item);
        match index.get(&k) {
            Some(&position) => groups[position].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }

    groups
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub student_id: String,
    pub student_name: String,
    pub average: f64,
    pub count: usize,
}

/// Higher mean first, then more records, then identifier ascending.
fn leaderboard_order(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.average
        .total_cmp(&a.average)
        .then_with(|| b.count.cmp(&a.count))
        .then_with(|| a.student_id.cmp(&b.student_id))
}

/// Ranks students by mean score and keeps the top `size`.
pub fn leaderboard<'a, I>(
    scores: I,
    directory: &Directory,
    size: usize,
) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut entries = per_student_means(scores, directory);
    entries.sort_by(leaderboard_order);
    entries.truncate(size);
    entries
}

fn per_student_means<'a, I>(scores: I, directory: &Directory) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut totals: Vec<(&'a str, f64, usize)> = Vec::new();

    for (student_id, score) in scores {
        match index.get(student_id) {
            Some(&position) => {
                totals[position].1 += score;
                totals[position].2 += 1;
            }
            None => {
                index.insert(student_id, totals.len());
                totals.push((student_id, score, 1));
            }
        }
    }

    totals
        .into_iter()
        .map(|(student_id, sum, count)| LeaderboardEntry {
            student_id: student_id.to_string(),
            student_name: directory.student_name(student_id),
            average: sum / count as f64,
            count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBreakdown {
    pub key: String,
    pub label: String,
    pub count: usize,
    /// Mean score, or effective-attendance percent for attendance groups.
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    LowGrade,
    LowAttendance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAlert {
    pub student_id: String,
    pub student_name: String,
    pub reason: AlertReason,
    pub value: f64,
    pub count: usize,
}

fn collect_alerts<I>(candidates: I, reason: AlertReason, limit: Option<usize>) -> Vec<StudentAlert>
where
    I: IntoIterator<Item = LeaderboardEntry>,
{
    let mut alerts: Vec<StudentAlert> = candidates
        .into_iter()
        .map(|entry| StudentAlert {
            student_id: entry.student_id,
            student_name: entry.student_name,
            reason,
            value: entry.average,
            count: entry.count,
        })
        .collect();
    alerts.sort_by(|a, b| {
        a.value
            .total_cmp(&b.value)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    if let Some(limit) = limit {
        alerts.truncate(limit);
    }
    alerts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub total: usize,
    pub average: f64,
    pub pass_fail: PassFail,
    pub pass_rate: f64,
    pub distribution: Vec<BucketCount>,
    pub by_course: Vec<GroupBreakdown>,
    pub by_subject: Vec<GroupBreakdown>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub alerts: Vec<StudentAlert>,
}

pub fn summarize_grades(
    records: &[GradeRecord],
    directory: &Directory,
    config: &ReportingConfig,
) -> GradeSummary {
    let scores = || records.iter().map(|r| r.score);
    let tally = pass_fail(scores(), config.passing_grade);

    let by_course = group_first_seen(records, |r| r.course_code.clone())
        .into_iter()
        .map(|(code, members)| GroupBreakdown {
            label: directory.course_label(&code),
            key: code,
            count: members.len(),
            value: mean(members.iter().map(|r| r.score)),
        })
        .collect();
    let by_subject = group_first_seen(records, |r| r.subject_code.clone())
        .into_iter()
        .map(|(code, members)| GroupBreakdown {
            label: directory.subject_label(&code),
            key: code,
            count: members.len(),
            value: mean(members.iter().map(|r| r.score)),
        })
        .collect();

    let student_scores = || records.iter().map(|r| (r.student_id.as_str(), r.score));
    let low = per_student_means(student_scores(), directory)
        .into_iter()
        .filter(|entry| entry.average < config.passing_grade);

    GradeSummary {
        total: records.len(),
        average: mean(scores()),
        pass_fail: tally,
        pass_rate: tally.pass_rate(),
        distribution: distribution(scores(), &GRADE_BUCKETS),
        by_course,
        by_subject,
        leaderboard: leaderboard(student_scores(), directory, config.leaderboard_size),
        alerts: collect_alerts(low, AlertReason::LowGrade, config.alert_limit),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub total: usize,
    pub status_counts: Vec<StatusCount>,
    pub effective_rate: f64,
    pub by_course: Vec<GroupBreakdown>,
    pub by_date: Vec<GroupBreakdown>,
    pub alerts: Vec<StudentAlert>,
}

pub fn summarize_attendance(
    records: &[AttendanceRecord],
    directory: &Directory,
    config: &ReportingConfig,
) -> AttendanceSummary {
    let by_course = group_first_seen(records, |r| r.course_code.clone())
        .into_iter()
        .map(|(code, members)| GroupBreakdown {
            label: directory.course_label(&code),
            key: code,
            count: members.len(),
            value: effective_rate(members.iter().copied()),
        })
        .collect();

    let mut dated = group_first_seen(records, |r| r.date);
    dated.sort_by_key(|(date, _)| *date);
    let by_date = dated
        .into_iter()
        .map(|(date, members)| {
            date_group(date, members.len(), effective_rate(members.iter().copied()))
        })
        .collect();

    let low = group_first_seen(records, |r| r.student_id.clone())
        .into_iter()
        .map(|(student_id, members)| LeaderboardEntry {
            student_name: directory.student_name(&student_id),
            student_id,
            average: effective_rate(members.iter().copied()),
            count: members.len(),
        })
        .filter(|entry| entry.average < config.attendance_alert_rate);

    AttendanceSummary {
        total: records.len(),
        status_counts: status_counts(records),
        effective_rate: effective_rate(records),
        by_course,
        by_date,
        alerts: collect_alerts(low, AlertReason::LowAttendance, config.alert_limit),
    }
}

fn date_group(date: NaiveDate, count: usize, value: f64) -> GroupBreakdown {
    GroupBreakdown {
        key: date.format("%Y-%m-%d").to_string(),
        label: date.format("%d/%m/%Y").to_string(),
        count,
        value,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipationSummary {
    pub total: usize,
    pub average: f64,
    pub pass_fail: PassFail,
    pub pass_rate: f64,
    pub type_counts: Vec<TypeCount>,
    pub distribution: Vec<BucketCount>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub by_date: Vec<GroupBreakdown>,
}

pub fn summarize_participation(
    records: &[ParticipationRecord],
    directory: &Directory,
    config: &ReportingConfig,
) -> ParticipationSummary {
    let scores = || records.iter().map(|r| r.score);
    let tally = pass_fail(scores(), config.participation_passing);

    let mut dated = group_first_seen(records, |r| r.date);
    dated.sort_by_key(|(date, _)| *date);
    let by_date = dated
        .into_iter()
        .map(|(date, members)| {
            date_group(date, members.len(), mean(members.iter().map(|r| r.score)))
        })
        .collect();

    ParticipationSummary {
        total: records.len(),
        average: mean(scores()),
        pass_fail: tally,
        pass_rate: tally.pass_rate(),
        type_counts: type_counts(records),
        distribution: distribution(scores(), &PARTICIPATION_BUCKETS),
        leaderboard: leaderboard(
            records.iter().map(|r| (r.student_id.as_str(), r.score)),
            directory,
            config.leaderboard_size,
        ),
        by_date,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentReport {
    pub view: JoinedStudentView,
    pub average_grade: f64,
    pub attendance_rate: f64,
    pub average_participation: f64,
    pub passing: bool,
    pub participation_passing: bool,
    pub status_counts: Vec<StatusCount>,
    pub by_subject: Vec<GroupBreakdown>,
}

pub fn summarize_student(
    view: JoinedStudentView,
    directory: &Directory,
    config: &ReportingConfig,
) -> StudentReport {
    let by_subject = group_first_seen(&view.grades, |r| r.subject_code.clone())
        .into_iter()
        .map(|(code, members)| GroupBreakdown {
            label: directory.subject_label(&code),
            key: code,
            count: members.len(),
            value: mean(members.iter().map(|r| r.score)),
        })
        .collect();

    StudentReport {
        average_grade: view.mean_grade(),
        attendance_rate: view.attendance_rate(),
        average_participation: view.mean_participation(),
        passing: view.is_passing(config.passing_grade),
        participation_passing: view.is_participation_passing(config.participation_passing),
        status_counts: status_counts(&view.attendance),
        by_subject,
        view,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRow {
    pub student_id: String,
    pub student_name: String,
    pub average_grade: f64,
    pub grade_count: usize,
    pub attendance_rate: f64,
    pub attendance_count: usize,
    pub average_participation: f64,
    pub participation_count: usize,
    pub passing: bool,
    pub participation_passing: bool,
    pub alert: bool,
}

impl CombinedRow {
    pub fn from_view(view: &JoinedStudentView, config: &ReportingConfig) -> Self {
        let passing = view.is_passing(config.passing_grade);
        let attendance_rate = view.attendance_rate();
        let low_attendance =
            !view.attendance.is_empty() && attendance_rate < config.attendance_alert_rate;
        let participation_passing = view.is_participation_passing(config.participation_passing);
        let low_participation = !view.participation.is_empty() && !participation_passing;

        Self {
            student_id: view.student_id.clone(),
            student_name: view.student_name.clone(),
            average_grade: view.mean_grade(),
            grade_count: view.grades.len(),
            attendance_rate,
            attendance_count: view.attendance.len(),
            average_participation: view.mean_participation(),
            participation_count: view.participation.len(),
            passing,
            participation_passing,
            alert: !passing || low_attendance || low_participation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedSummary {
    pub rows: Vec<CombinedRow>,
    pub course_average: f64,
    pub alert_count: usize,
}

pub fn summarize_combined(
    views: &[JoinedStudentView],
    config: &ReportingConfig,
) -> CombinedSummary {
    let rows: Vec<CombinedRow> = views
        .iter()
        .map(|view| CombinedRow::from_view(view, config))
        .collect();
    let alert_count = rows.iter().filter(|row| row.alert).count();

    CombinedSummary {
        course_average: mean(views.iter().flat_map(|v| v.grades.iter().map(|g| g.score))),
        alert_count,
        rows,
    }
}
