use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{Grade, RecordFields, ScoringResult, WeakFactor};

/// Source of the GPA jitter. `unit` must return a value in `[0, 1)`.
pub trait JitterSource: Send {
    fn unit(&mut self) -> f64;
}

pub struct RandomJitter {
    rng: StdRng,
}

impl RandomJitter {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl JitterSource for RandomJitter {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Always returns the same offset; used to pin GPA output.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn unit(&mut self) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpaBand {
    pub grade: Grade,
    /// Lowest composite score that lands in this band.
    pub min_score: f64,
    pub gpa_base: f64,
    /// Width of the random offset added to `gpa_base`.
    pub gpa_spread: f64,
}

/// Grade bands, checked in order; the first band whose `min_score` is met
/// wins. The last band should have `f64::NEG_INFINITY` as its floor.
#[derive(Debug, Clone, PartialEq)]
pub struct GpaBands {
    pub bands: Vec<GpaBand>,
}

impl Default for GpaBands {
    fn default() -> Self {
        let band = |grade, min_score, gpa_base, gpa_spread| GpaBand {
            grade,
            min_score,
            gpa_base,
            gpa_spread,
        };
        Self {
            bands: vec![
                band(Grade::A, 90.0, 3.7, 0.3),
                band(Grade::B, 80.0, 3.0, 0.7),
                band(Grade::C, 70.0, 2.0, 1.0),
                band(Grade::D, 60.0, 1.0, 1.0),
                band(Grade::F, f64::NEG_INFINITY, 0.0, 1.0),
            ],
        }
    }
}

impl GpaBands {
    pub fn band_for(&self, composite_score: f64) -> GpaBand {
        self.bands
            .iter()
            .copied()
            .find(|band| composite_score >= band.min_score)
            .unwrap_or(GpaBand {
                grade: Grade::F,
                min_score: f64::NEG_INFINITY,
                gpa_base: 0.0,
                gpa_spread: 1.0,
            })
    }
}

pub const MAX_GPA: f64 = 4.0;
pub const MIN_CONFIDENCE: f64 = 0.65;
pub const MAX_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    pub bands: GpaBands,
}

impl ScoringEngine {
    pub fn new(bands: GpaBands) -> Self {
        Self { bands }
    }

    pub fn score(&self, fields: &RecordFields, jitter: &mut dyn JitterSource) -> ScoringResult {
        let composite_score = composite_score(fields);
        let band = self.bands.band_for(composite_score);
        let predicted_gpa =
            (band.gpa_base + jitter.unit() * band.gpa_spread).clamp(0.0, MAX_GPA);

        ScoringResult {
            composite_score,
            predicted_grade: band.grade,
            predicted_gpa,
            confidence: confidence(composite_score),
            weak_factors: weak_factors(fields),
        }
    }
}

/// Weighted sum of the six factors. Not clamped: out-of-range inputs can push
/// it past 100 or below 0.
pub fn composite_score(fields: &RecordFields) -> f64 {
    let attendance = fields.attendance_rate * 0.30;
    let study = (fields.study_hours_per_week * 2.5).min(25.0);
    let previous = (fields.previous_percentage / 100.0) * 25.0;
    let sleep = if (7.0..=9.0).contains(&fields.sleep_duration_hours) {
        5.0
    } else {
        2.5
    };

    attendance
        + study
        + previous
        + health_points(&fields.health_status)
        + support_points(&fields.family_support)
        + sleep
}

pub fn health_points(health_status: &str) -> f64 {
    match health_status {
        "excellent" => 10.0,
        "good" => 7.5,
        "fair" => 5.0,
        "poor" => 2.5,
        _ => 5.0,
    }
}

pub fn support_points(family_support: &str) -> f64 {
    match family_support {
        "high" => 5.0,
        "medium" => 3.0,
        "low" => 1.0,
        _ => 3.0,
    }
}

pub fn confidence(composite_score: f64) -> f64 {
    (0.8 + (composite_score - 70.0) * 0.003).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

pub fn weak_factors(fields: &RecordFields) -> Vec<WeakFactor> {
    let mut factors = Vec::new();

    if fields.attendance_rate < 70.0 {
        factors.push(WeakFactor::PoorAttendance);
    } else if fields.attendance_rate < 85.0 {
        factors.push(WeakFactor::BelowAverageAttendance);
    }

    if fields.study_hours_per_week < 8.0 {
        factors.push(WeakFactor::InsufficientStudyTime);
    } else if fields.study_hours_per_week < 12.0 {
        factors.push(WeakFactor::BelowRecommendedHours);
    }

    if fields.previous_percentage < 60.0 {
        factors.push(WeakFactor::PoorAcademicHistory);
    } else if fields.previous_percentage < 70.0 {
        factors.push(WeakFactor::BelowAveragePreviousPerformance);
    }

    if matches!(fields.health_status.as_str(), "poor" | "fair") {
        factors.push(WeakFactor::HealthConcerns);
    }

    if fields.family_support == "low" {
        factors.push(WeakFactor::LimitedFamilySupport);
    }

    if fields.sleep_duration_hours < 6.0 || fields.sleep_duration_hours > 10.0 {
        factors.push(WeakFactor::PoorSleepHabits);
    }

    factors
}
