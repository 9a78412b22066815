use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{Record, RiskAssessment};
use crate::risk;

pub const PASS_MARK: f64 = 60.0;

const ATTENDANCE_BANDS: [(&str, f64); 5] = [
    ("90-100%", 90.0),
    ("80-89%", 80.0),
    ("70-79%", 70.0),
    ("60-69%", 60.0),
    ("Below 60%", f64::NEG_INFINITY),
];

#[derive(Debug, Clone, PartialEq)]
pub struct CohortSnapshot {
    pub total: usize,
    pub avg_attendance: f64,
    pub avg_study_hours: f64,
    pub avg_previous_percentage: f64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub label: String,
    pub count: usize,
}

pub fn snapshot(records: &[Record]) -> Option<CohortSnapshot> {
    if records.is_empty() {
        return None;
    }
    let total = records.len() as f64;
    let average = |value: fn(&Record) -> f64| records.iter().map(value).sum::<f64>() / total;
    let passing = records
        .iter()
        .filter(|record| record.fields.current_percentage >= PASS_MARK)
        .count();

    Some(CohortSnapshot {
        total: records.len(),
        avg_attendance: average(|record| record.fields.attendance_rate),
        avg_study_hours: average(|record| record.fields.study_hours_per_week),
        avg_previous_percentage: average(|record| record.fields.previous_percentage),
        pass_rate: passing as f64 / total * 100.0,
    })
}

/// Counts per distinct value, most common first, ties by label.
pub fn distribution(records: &[Record], value: fn(&Record) -> &str) -> Vec<Share> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(value(record)).or_insert(0) += 1;
    }

    let mut shares: Vec<Share> = counts
        .into_iter()
        .map(|(label, count)| Share {
            label: label.to_string(),
            count,
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

pub fn attendance_bands(records: &[Record]) -> Vec<Share> {
    let mut counts = [0usize; ATTENDANCE_BANDS.len()];
    for record in records {
        if let Some(index) = ATTENDANCE_BANDS
            .iter()
            .position(|(_, floor)| record.fields.attendance_rate >= *floor)
        {
            counts[index] += 1;
        }
    }

    ATTENDANCE_BANDS
        .iter()
        .zip(counts)
        .map(|((label, _), count)| Share {
            label: label.to_string(),
            count,
        })
        .collect()
}

pub fn highest_risk(records: &[Record]) -> Vec<(&Record, RiskAssessment)> {
    let mut ranked: Vec<(&Record, RiskAssessment)> = records
        .iter()
        .map(|record| (record, risk::classify_by_points(&record.fields)))
        .collect();
    ranked.sort_by(|a, b| b.1.points.cmp(&a.1.points));
    ranked
}

fn write_shares(output: &mut String, heading: &str, shares: &[Share], total: usize) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {heading}");
    for share in shares {
        let label = if share.label.is_empty() {
            "(blank)"
        } else {
            share.label.as_str()
        };
        let _ = writeln!(
            output,
            "- {}: {} ({:.1}%)",
            label,
            share.count,
            share.count as f64 / total as f64 * 100.0
        );
    }
}

pub fn build_report(records: &[Record]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Student Performance Report");

    let Some(snapshot) = snapshot(records) else {
        let _ = writeln!(output, "No student data available.");
        return output;
    };

    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohort Snapshot");
    let _ = writeln!(output, "- Students: {}", snapshot.total);
    let _ = writeln!(output, "- Average attendance: {:.1}%", snapshot.avg_attendance);
    let _ = writeln!(output, "- Average study hours: {:.1}/week", snapshot.avg_study_hours);
    let _ = writeln!(
        output,
        "- Average previous percentage: {:.1}%",
        snapshot.avg_previous_percentage
    );
    let _ = writeln!(output, "- Pass rate: {:.1}%", snapshot.pass_rate);

    write_shares(
        &mut output,
        "Class Grades",
        &distribution(records, |record| record.fields.grade_level.as_str()),
        snapshot.total,
    );
    write_shares(
        &mut output,
        "Attendance Bands",
        &attendance_bands(records),
        snapshot.total,
    );
    write_shares(
        &mut output,
        "Health Status",
        &distribution(records, |record| record.fields.health_status.as_str()),
        snapshot.total,
    );
    write_shares(
        &mut output,
        "Family Support",
        &distribution(records, |record| record.fields.family_support.as_str()),
        snapshot.total,
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");
    for (record, assessment) in highest_risk(records).iter().take(10) {
        let _ = writeln!(
            output,
            "- {} ({}, {}) {} risk, {} points",
            record.display_name(),
            record.identifier(),
            record.fields.grade_level,
            assessment.tier,
            assessment.points
        );
    }

    output
}
