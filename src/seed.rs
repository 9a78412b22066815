use tracing::info;

use crate::error::CoreError;
use crate::models::RecordFields;
use crate::service::StudentService;
use crate::store::RecordStore;

#[allow(clippy::too_many_arguments)]
fn sample(
    name: &str,
    identifier: &str,
    grade_level: &str,
    attendance_rate: f64,
    study_hours_per_week: f64,
    sleep_duration_hours: f64,
    health_status: &str,
    family_support: &str,
    internet_access: &str,
    parental_education: &str,
    previous_percentage: f64,
    class_participation: &str,
    extracurricular_activities: &str,
    current_percentage: f64,
) -> RecordFields {
    RecordFields {
        identifier: identifier.to_string(),
        display_name: name.to_string(),
        grade_level: grade_level.to_string(),
        attendance_rate,
        study_hours_per_week,
        sleep_duration_hours,
        health_status: health_status.to_string(),
        family_support: family_support.to_string(),
        internet_access: internet_access.to_string(),
        parental_education: parental_education.to_string(),
        previous_percentage,
        class_participation: class_participation.to_string(),
        extracurricular_activities: extracurricular_activities.to_string(),
        current_percentage,
    }
}

pub fn sample_students() -> Vec<RecordFields> {
    vec![
        sample(
            "Aarav Sharma", "STU2024001", "10th", 92.0, 18.0, 7.5, "excellent", "high", "yes",
            "higher", 88.0, "high", "high", 90.0,
        ),
        sample(
            "Priya Patel", "STU2024002", "10th", 78.0, 12.0, 6.5, "good", "medium", "yes",
            "secondary", 72.0, "medium", "medium", 75.0,
        ),
        sample(
            "Rohit Kumar", "STU2024003", "9th", 65.0, 8.0, 6.0, "fair", "low", "no", "primary",
            58.0, "low", "low", 62.0,
        ),
    ]
}

/// Adds the sample students, skipping any identifier already present.
pub fn load_samples<S: RecordStore>(service: &StudentService<S>) -> Result<usize, CoreError> {
    let mut inserted = 0usize;
    for fields in sample_students() {
        match service.add_record(fields) {
            Ok(_) => inserted += 1,
            Err(CoreError::Conflict { .. }) => {}
            Err(err) => return Err(err),
        }
    }
    info!(inserted, "loaded sample students");
    Ok(inserted)
}
