use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-supplied values for a new student. Text fields are kept as given;
/// only name and identifier are validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFields {
    #[serde(rename = "student_id")]
    pub identifier: String,
    #[serde(rename = "student_name")]
    pub display_name: String,
    #[serde(rename = "class_grade")]
    pub grade_level: String,
    pub attendance_rate: f64,
    pub study_hours_per_week: f64,
    #[serde(rename = "sleep_duration")]
    pub sleep_duration_hours: f64,
    pub health_status: String,
    pub family_support: String,
    pub internet_access: String,
    pub parental_education: String,
    pub previous_percentage: f64,
    pub class_participation: String,
    pub extracurricular_activities: String,
    pub current_percentage: f64,
}

impl RecordFields {
    pub fn validate(&self) -> Result<(), String> {
        if self.display_name.trim().is_empty() || self.identifier.trim().is_empty() {
            return Err("student name and ID are required".to_string());
        }
        Ok(())
    }
}

/// One stored student profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: Uuid,
    #[serde(flatten)]
    pub fields: RecordFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(fields: RecordFields, created_at: DateTime<Utc>) -> Self {
        Self {
            key: Uuid::new_v4(),
            fields,
            created_at,
            updated_at: None,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.fields.identifier
    }

    pub fn display_name(&self) -> &str {
        &self.fields.display_name
    }
}

/// Partial replacement of a record. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordUpdate {
    #[serde(rename = "student_id")]
    pub identifier: Option<String>,
    #[serde(rename = "student_name")]
    pub display_name: Option<String>,
    #[serde(rename = "class_grade")]
    pub grade_level: Option<String>,
    pub attendance_rate: Option<f64>,
    pub study_hours_per_week: Option<f64>,
    #[serde(rename = "sleep_duration")]
    pub sleep_duration_hours: Option<f64>,
    pub health_status: Option<String>,
    pub family_support: Option<String>,
    pub internet_access: Option<String>,
    pub parental_education: Option<String>,
    pub previous_percentage: Option<f64>,
    pub class_participation: Option<String>,
    pub extracurricular_activities: Option<String>,
    pub current_percentage: Option<f64>,
}

impl RecordUpdate {
    /// Returns the merged field set without touching `fields`.
    pub fn apply_to(&self, fields: &RecordFields) -> RecordFields {
        fn pick<T: Clone>(new: &Option<T>, old: &T) -> T {
            new.as_ref().unwrap_or(old).clone()
        }

        RecordFields {
            identifier: pick(&self.identifier, &fields.identifier),
            display_name: pick(&self.display_name, &fields.display_name),
            grade_level: pick(&self.grade_level, &fields.grade_level),
            attendance_rate: pick(&self.attendance_rate, &fields.attendance_rate),
            study_hours_per_week: pick(&self.study_hours_per_week, &fields.study_hours_per_week),
            sleep_duration_hours: pick(&self.sleep_duration_hours, &fields.sleep_duration_hours),
            health_status: pick(&self.health_status, &fields.health_status),
            family_support: pick(&self.family_support, &fields.family_support),
            internet_access: pick(&self.internet_access, &fields.internet_access),
            parental_education: pick(&self.parental_education, &fields.parental_education),
            previous_percentage: pick(&self.previous_percentage, &fields.previous_percentage),
            class_participation: pick(&self.class_participation, &fields.class_participation),
            extracurricular_activities: pick(
                &self.extracurricular_activities,
                &fields.extracurricular_activities,
            ),
            current_percentage: pick(&self.current_percentage, &fields.current_percentage),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeakFactor {
    PoorAttendance,
    BelowAverageAttendance,
    InsufficientStudyTime,
    BelowRecommendedHours,
    PoorAcademicHistory,
    BelowAveragePreviousPerformance,
    HealthConcerns,
    LimitedFamilySupport,
    PoorSleepHabits,
}

impl WeakFactor {
    pub fn label(self) -> &'static str {
        match self {
            WeakFactor::PoorAttendance => "poor attendance",
            WeakFactor::BelowAverageAttendance => "below average attendance",
            WeakFactor::InsufficientStudyTime => "insufficient study time",
            WeakFactor::BelowRecommendedHours => "below recommended hours",
            WeakFactor::PoorAcademicHistory => "poor academic history",
            WeakFactor::BelowAveragePreviousPerformance => "below average previous performance",
            WeakFactor::HealthConcerns => "health concerns",
            WeakFactor::LimitedFamilySupport => "limited family support",
            WeakFactor::PoorSleepHabits => "poor sleep habits",
        }
    }
}

impl fmt::Display for WeakFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub composite_score: f64,
    pub predicted_grade: Grade,
    pub predicted_gpa: f64,
    pub confidence: f64,
    pub weak_factors: Vec<WeakFactor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        };
        f.write_str(label)
    }
}

/// Outcome of the point-accumulation policy, kept with its points so
/// listings can rank students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,
    pub points: u32,
}

/// Everything the prediction view shows for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub student_id: String,
    pub student_name: String,
    #[serde(flatten)]
    pub scoring: ScoringResult,
    pub risk_level: RiskTier,
    pub recommendations: Vec<String>,
    pub improvement_areas: Vec<String>,
}
