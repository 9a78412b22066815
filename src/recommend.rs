use crate::models::RecordFields;

pub const ATTENDANCE_TIP: &str = "Improve class attendance - aim for 90%+ attendance rate";
pub const STUDY_TIP: &str = "Increase study time to 12-15 hours per week for optimal results";
pub const SLEEP_TIP: &str = "Get 7-8 hours of sleep nightly for better cognitive performance";
pub const HEALTH_TIP: &str = "Focus on physical health through exercise and proper nutrition";
pub const SUPPORT_TIP: &str = "Seek additional academic support from teachers or tutoring";
pub const PARTICIPATION_TIP: &str =
    "Increase active participation in class discussions and activities";
pub const COUNSELING_TIP: &str = "Consider academic counseling to address learning gaps";
pub const EXTRACURRICULAR_TIP: &str =
    "Join extracurricular activities for well-rounded development";
pub const MAINTAIN_MESSAGE: &str = "Maintain current excellent performance and study habits";

/// Interventions for a student, checked against the raw record in a fixed
/// order. Falls back to a single maintenance message.
pub fn recommend(fields: &RecordFields) -> Vec<String> {
    let checks = [
        (fields.attendance_rate < 85.0, ATTENDANCE_TIP),
        (fields.study_hours_per_week < 12.0, STUDY_TIP),
        (fields.sleep_duration_hours < 7.0, SLEEP_TIP),
        (
            matches!(fields.health_status.as_str(), "poor" | "fair"),
            HEALTH_TIP,
        ),
        (fields.family_support == "low", SUPPORT_TIP),
        (fields.class_participation == "low", PARTICIPATION_TIP),
        (fields.previous_percentage < 70.0, COUNSELING_TIP),
        (fields.extracurricular_activities == "none", EXTRACURRICULAR_TIP),
    ];

    let mut tips: Vec<String> = checks
        .into_iter()
        .filter(|(triggered, _)| *triggered)
        .map(|(_, tip)| tip.to_string())
        .collect();

    if tips.is_empty() {
        tips.push(MAINTAIN_MESSAGE.to_string());
    }
    tips
}
