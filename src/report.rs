use std::fmt::Write;

use crate::aggregate::{
    AttendanceSummary, BucketCount, CombinedSummary, GradeSummary, GroupBreakdown,
    LeaderboardEntry, ParticipationSummary, StudentAlert, StudentReport,
};
use crate::export::format_decimal;
use crate::orchestrator::SummaryResult;

fn write_distribution(output: &mut String, buckets: &[BucketCount]) {
    let _ = writeln!(output, "## Distribution");
    for bucket in buckets {
        let _ = writeln!(
            output,
            "- {}: {} ({}%)",
            bucket.label,
            bucket.count,
            format_decimal(bucket.percentage)
        );
    }
    let _ = writeln!(output);
}

fn write_groups(output: &mut String, heading: &str, unit: &str, groups: &[GroupBreakdown]) {
    let _ = writeln!(output, "## {heading}");
    if groups.is_empty() {
        let _ = writeln!(output, "No records for this selection.");
    } else {
        for group in groups {
            let _ = writeln!(
                output,
                "- {}: {}{} across {} records",
                group.label,
                format_decimal(group.value),
                unit,
                group.count
            );
        }
    }
    let _ = writeln!(output);
}

fn write_leaderboard(output: &mut String, entries: &[LeaderboardEntry]) {
    let _ = writeln!(output, "## Top Students");
    if entries.is_empty() {
        let _ = writeln!(output, "No students in this selection.");
    } else {
        for (rank, entry) in entries.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} ({}) average {} across {} records",
                rank + 1,
                entry.student_name,
                entry.student_id,
                format_decimal(entry.average),
                entry.count
            );
        }
    }
    let _ = writeln!(output);
}

fn write_alerts(output: &mut String, heading: &str, unit: &str, alerts: &[StudentAlert]) {
    let _ = writeln!(output, "## {heading}");
    if alerts.is_empty() {
        let _ = writeln!(output, "No students below the threshold.");
    } else {
        for alert in alerts {
            let _ = writeln!(
                output,
                "- {} ({}): {}{} across {} records",
                alert.student_name,
                alert.student_id,
                format_decimal(alert.value),
                unit,
                alert.count
            );
        }
    }
    let _ = writeln!(output);
}

fn academic(output: &mut String, summary: &GradeSummary) {
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Records: {}", summary.total);
    let _ = writeln!(output, "- Average: {}", format_decimal(summary.average));
    let _ = writeln!(
        output,
        "- Passed: {} / Failed: {} ({}% pass rate)",
        summary.pass_fail.passed,
        summary.pass_fail.failed,
        format_decimal(summary.pass_rate)
    );
    let _ = writeln!(output);
    write_distribution(output, &summary.distribution);
    write_groups(output, "By Course", "", &summary.by_course);
    write_groups(output, "By Subject", "", &summary.by_subject);
    write_leaderboard(output, &summary.leaderboard);
    write_alerts(output, "Low Performance Alerts", "", &summary.alerts);
}

fn attendance(output: &mut String, summary: &AttendanceSummary) {
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Records: {}", summary.total);
    let _ = writeln!(
        output,
        "- Effective attendance: {}%",
        format_decimal(summary.effective_rate)
    );
    for status in &summary.status_counts {
        let _ = writeln!(
            output,
            "- {}: {} ({}%)",
            status.status,
            status.count,
            format_decimal(status.percentage)
        );
    }
    let _ = writeln!(output);
    write_groups(output, "By Course", "%", &summary.by_course);
    write_groups(output, "By Date", "%", &summary.by_date);
    write_alerts(output, "Attendance Alerts", "%", &summary.alerts);
}

fn participation(output: &mut String, summary: &ParticipationSummary) {
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Records: {}", summary.total);
    let _ = writeln!(output, "- Average score: {}", format_decimal(summary.average));
    let _ = writeln!(
        output,
        "- Passed: {} / Failed: {} ({}% pass rate)",
        summary.pass_fail.passed,
        summary.pass_fail.failed,
        format_decimal(summary.pass_rate)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Participation Types");
    if summary.type_counts.is_empty() {
        let _ = writeln!(output, "No participation recorded.");
    } else {
        for kind in &summary.type_counts {
            let _ = writeln!(
                output,
                "- {}: {} ({}%)",
                kind.label,
                kind.count,
                format_decimal(kind.percentage)
            );
        }
    }
    let _ = writeln!(output);
    write_distribution(output, &summary.distribution);
    write_groups(output, "By Date", "", &summary.by_date);
    write_leaderboard(output, &summary.leaderboard);
}

fn student(output: &mut String, report: &StudentReport) {
    let view = &report.view;
    let _ = writeln!(output, "## {} ({})", view.student_name, view.student_id);
    let _ = writeln!(
        output,
        "- Average grade: {} across {} grades ({})",
        format_decimal(report.average_grade),
        view.grades.len(),
        if report.passing { "passing" } else { "not passing" }
    );
    let _ = writeln!(
        output,
        "- Effective attendance: {}% across {} days",
        format_decimal(report.attendance_rate),
        view.attendance.len()
    );
    let _ = writeln!(
        output,
        "- Participation average: {} across {} records ({})",
        format_decimal(report.average_participation),
        view.participation.len(),
        if report.participation_passing { "passing" } else { "not passing" }
    );
    let _ = writeln!(output);
    write_groups(output, "By Subject", "", &report.by_subject);

    let mut recent = view.grades.clone();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let _ = writeln!(output, "## Recent Grades");
    if recent.is_empty() {
        let _ = writeln!(output, "No grades recorded.");
    } else {
        for grade in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {}",
                grade.criterion,
                grade.subject_code,
                grade.created_at.date_naive(),
                format_decimal(grade.score)
            );
        }
    }
}

fn combined(output: &mut String, summary: &CombinedSummary) {
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Students: {}", summary.rows.len());
    let _ = writeln!(output, "- Course average: {}", format_decimal(summary.course_average));
    let _ = writeln!(output, "- Students flagged: {}", summary.alert_count);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");
    if summary.rows.is_empty() {
        let _ = writeln!(output, "No graded students in this selection.");
    }
    for row in &summary.rows {
        let _ = writeln!(
            output,
            "- {}{} ({}): grade {}, attendance {}%, participation {}",
            if row.alert { "[!] " } else { "" },
            row.student_name,
            row.student_id,
            format_decimal(row.average_grade),
            format_decimal(row.attendance_rate),
            format_decimal(row.average_participation)
        );
    }
}

/// Renders a summary as Markdown for terminal display.
pub fn build_report(title: &str, scope: Option<&str>, summary: &SummaryResult) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {title}");
    let _ = writeln!(output, "Generated for {}", scope.unwrap_or("all records"));
    let _ = writeln!(output);

    match summary {
        SummaryResult::Academic(s) => academic(&mut output, s),
        SummaryResult::Attendance(s) => attendance(&mut output, s),
        SummaryResult::Participation(s) => participation(&mut output, s),
        SummaryResult::Student(s) => student(&mut output, s),
        SummaryResult::Combined(s) => combined(&mut output, s),
    }

    output
}
