use std::fmt;

use serde::Serialize;

use crate::error::FormatError;
use crate::models::RecordFields;

pub const DEFAULT_DELIMITER: u8 = b',';

/// Bulk-upload columns. Every one must be present in the header line; order
/// is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    StudentName,
    StudentId,
    ClassGrade,
    AttendanceRate,
    StudyHoursPerWeek,
    SleepDuration,
    HealthStatus,
    FamilySupport,
    InternetAccess,
    ParentalEducation,
    PreviousPercentage,
    ClassParticipation,
    ExtracurricularActivities,
    CurrentPercentage,
}

impl Column {
    pub const ALL: [Column; 14] = [
        Column::StudentName,
        Column::StudentId,
        Column::ClassGrade,
        Column::AttendanceRate,
        Column::StudyHoursPerWeek,
        Column::SleepDuration,
        Column::HealthStatus,
        Column::FamilySupport,
        Column::InternetAccess,
        Column::ParentalEducation,
        Column::PreviousPercentage,
        Column::ClassParticipation,
        Column::ExtracurricularActivities,
        Column::CurrentPercentage,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::StudentName => "student_name",
            Column::StudentId => "student_id",
            Column::ClassGrade => "class_grade",
            Column::AttendanceRate => "attendance_rate",
            Column::StudyHoursPerWeek => "study_hours_per_week",
            Column::SleepDuration => "sleep_duration",
            Column::HealthStatus => "health_status",
            Column::FamilySupport => "family_support",
            Column::InternetAccess => "internet_access",
            Column::ParentalEducation => "parental_education",
            Column::PreviousPercentage => "previous_percentage",
            Column::ClassParticipation => "class_participation",
            Column::ExtracurricularActivities => "extracurricular_activities",
            Column::CurrentPercentage => "current_percentage",
        }
    }

    pub fn from_header(token: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|column| column.header() == token)
    }

    fn assign(self, fields: &mut RecordFields, value: &str) {
        match self {
            Column::StudentName => fields.display_name = value.to_string(),
            Column::StudentId => fields.identifier = value.to_string(),
            Column::ClassGrade => fields.grade_level = value.to_string(),
            Column::AttendanceRate => fields.attendance_rate = coerce_number(value),
            Column::StudyHoursPerWeek => fields.study_hours_per_week = coerce_number(value),
            Column::SleepDuration => fields.sleep_duration_hours = coerce_number(value),
            Column::HealthStatus => fields.health_status = value.to_string(),
            Column::FamilySupport => fields.family_support = value.to_string(),
            Column::InternetAccess => fields.internet_access = value.to_string(),
            Column::ParentalEducation => fields.parental_education = value.to_string(),
            Column::PreviousPercentage => fields.previous_percentage = coerce_number(value),
            Column::ClassParticipation => fields.class_participation = value.to_string(),
            Column::ExtracurricularActivities => {
                fields.extracurricular_activities = value.to_string()
            }
            Column::CurrentPercentage => fields.current_percentage = coerce_number(value),
        }
    }
}

/// Header position to column, built once per batch. Columns with unknown
/// header names are skipped.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    positions: Vec<(usize, Column)>,
}

impl HeaderMap {
    pub fn build<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Result<Self, FormatError> {
        let mut positions: Vec<(usize, Column)> = Vec::new();
        for (index, token) in tokens.into_iter().enumerate() {
            if let Some(column) = Column::from_header(token.trim()) {
                // A repeated header name takes the later position.
                positions.retain(|(_, existing)| *existing != column);
                positions.push((index, column));
            }
        }

        let missing: Vec<String> = Column::ALL
            .into_iter()
            .filter(|column| positions.iter().all(|(_, found)| found != column))
            .map(|column| column.header().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(FormatError::MissingHeaders(missing));
        }

        Ok(Self { positions })
    }

    pub fn map_row(&self, values: &[&str]) -> RecordFields {
        let mut fields = RecordFields::default();
        for (index, column) in &self.positions {
            let value = values.get(*index).map(|value| strip_quotes(value)).unwrap_or("");
            column.assign(&mut fields, value);
        }
        fields
    }
}

/// Why a single row was skipped. The rest of the batch is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowRejection {
    MissingNameOrId,
    DuplicateInStore { identifier: String },
    DuplicateInBatch { identifier: String, first_row: usize },
    InvalidFormat,
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowRejection::MissingNameOrId => f.write_str("Missing student name or ID"),
            RowRejection::DuplicateInStore { identifier } => {
                write!(f, "Student ID {identifier} already exists")
            }
            RowRejection::DuplicateInBatch {
                identifier,
                first_row,
            } => write!(
                f,
                "Student ID {identifier} already appears in this upload (row {first_row})"
            ),
            RowRejection::InvalidFormat => f.write_str("Invalid data format"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub reason: RowRejection,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub accepted: usize,
    pub errors: Vec<RowError>,
}

impl BatchReport {
    pub fn reject(&mut self, row: usize, reason: RowRejection) {
        self.errors.push(RowError { row, reason });
    }

    pub fn total_rows(&self) -> usize {
        self.accepted + self.errors.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// 1-based line number in the submitted text.
    pub row: usize,
    pub outcome: Result<RecordFields, RowRejection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBatch {
    pub rows: Vec<ParsedRow>,
}

/// Splits bulk text into rows, checks the header and coerces every data row.
/// Does not look at any store; duplicates are handled by the caller.
pub fn parse_batch(text: &str, delimiter: u8) -> Result<ParsedBatch, FormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut lines: Vec<(usize, Option<csv::StringRecord>)> = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => {
                // Whitespace-only lines trim down to a single empty field.
                // Delimiter-only lines have several and are real rows.
                if record.len() == 1 && record.get(0) == Some("") {
                    continue;
                }
                let row = record.position().map_or(0, |pos| pos.line() as usize);
                lines.push((row, Some(record)));
            }
            // With quoting off, flexible widths and `&str` input the reader has
            // nothing left to fail on; should it ever fail, only that row is
            // rejected.
            Err(err) => {
                let row = err.position().map_or(0, |pos| pos.line() as usize);
                lines.push((row, None));
            }
        }
    }

    if lines.len() < 2 {
        return Err(FormatError::MissingRows);
    }

    let mut lines = lines.into_iter();
    let header = match lines.next() {
        Some((_, Some(record))) => HeaderMap::build(record.iter())?,
        _ => HeaderMap::build(std::iter::empty())?,
    };

    let rows = lines
        .map(|(row, record)| {
            let outcome = match record {
                Some(record) => {
                    let values: Vec<&str> = record.iter().collect();
                    let fields = header.map_row(&values);
                    if fields.display_name.is_empty() || fields.identifier.is_empty() {
                        Err(RowRejection::MissingNameOrId)
                    } else {
                        Ok(fields)
                    }
                }
                None => Err(RowRejection::InvalidFormat),
            };
            ParsedRow { row, outcome }
        })
        .collect();

    Ok(ParsedBatch { rows })
}

/// Numeric cells never reject a row. The leading number is used, so `92%`
/// reads as 92; a cell without one, or a non-finite value, becomes zero.
pub fn coerce_number(value: &str) -> f64 {
    match leading_number(value.trim()).parse::<f64>() {
        Ok(number) if number.is_finite() => number,
        _ => 0.0,
    }
}

/// Longest prefix shaped like `[+-]digits[.digits][e[+-]digits]`.
fn leading_number(value: &str) -> &str {
    let bytes = value.as_bytes();
    let digits_from = |start: usize| {
        bytes[start.min(bytes.len())..]
            .iter()
            .take_while(|byte| byte.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer = digits_from(end);
    end += integer;

    let mut mantissa = integer;
    if bytes.get(end) == Some(&b'.') {
        let fraction = digits_from(end + 1);
        if integer + fraction > 0 {
            end += 1 + fraction;
            mantissa += fraction;
        }
    }
    if mantissa == 0 {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent = digits_from(end + 1 + sign);
        if exponent > 0 {
            end += 1 + sign + exponent;
        }
    }

    &value[..end]
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"').trim()
}
