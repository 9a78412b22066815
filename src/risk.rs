use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{RecordFields, RiskAssessment, RiskTier, ScoringResult};

/// The two risk formulas in use. They disagree on purpose: the prediction
/// view counts weak factors of a fresh score, the browsing view adds points
/// straight from the record without scoring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskPolicy {
    #[default]
    FactorCount,
    PointAccumulation,
}

impl FromStr for RiskPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "factor-count" => Ok(RiskPolicy::FactorCount),
            "point-accumulation" => Ok(RiskPolicy::PointAccumulation),
            other => Err(format!(
                "unknown risk policy '{other}' (expected factor-count or point-accumulation)"
            )),
        }
    }
}

pub fn classify_by_factor_count(result: &ScoringResult) -> RiskTier {
    let weak = result.weak_factors.len();
    if weak >= 3 || result.composite_score < 60.0 {
        RiskTier::High
    } else if weak >= 1 || result.composite_score < 75.0 {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

pub fn risk_points(fields: &RecordFields) -> u32 {
    let mut points = 0;

    points += match fields.attendance_rate {
        rate if rate < 70.0 => 3,
        rate if rate < 85.0 => 1,
        _ => 0,
    };
    points += match fields.study_hours_per_week {
        hours if hours < 8.0 => 2,
        hours if hours < 12.0 => 1,
        _ => 0,
    };
    points += match fields.previous_percentage {
        pct if pct < 60.0 => 3,
        pct if pct < 70.0 => 1,
        _ => 0,
    };
    points += match fields.health_status.as_str() {
        "poor" => 2,
        "fair" => 1,
        _ => 0,
    };
    if fields.family_support == "low" {
        points += 2;
    }
    points += match fields.current_percentage {
        pct if pct < 60.0 => 3,
        pct if pct < 70.0 => 1,
        _ => 0,
    };

    points
}

pub fn tier_for_points(points: u32) -> RiskTier {
    if points >= 6 {
        RiskTier::High
    } else if points >= 3 {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

pub fn classify_by_points(fields: &RecordFields) -> RiskAssessment {
    let points = risk_points(fields);
    RiskAssessment {
        tier: tier_for_points(points),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, WeakFactor};

    fn scoring(composite_score: f64, weak_factors: Vec<WeakFactor>) -> ScoringResult {
        ScoringResult {
            composite_score,
            predicted_grade: Grade::B,
            predicted_gpa: 3.2,
            confidence: 0.83,
            weak_factors,
        }
    }

    #[test]
    fn factor_count_tiers() {
        assert_eq!(classify_by_factor_count(&scoring(85.0, vec![])), RiskTier::Low);
        assert_eq!(classify_by_factor_count(&scoring(74.9, vec![])), RiskTier::Medium);
        assert_eq!(
            classify_by_factor_count(&scoring(88.0, vec![WeakFactor::HealthConcerns])),
            RiskTier::Medium
        );
        assert_eq!(classify_by_factor_count(&scoring(59.0, vec![])), RiskTier::High);
        assert_eq!(
            classify_by_factor_count(&scoring(
                90.0,
                vec![
                    WeakFactor::HealthConcerns,
                    WeakFactor::PoorSleepHabits,
                    WeakFactor::LimitedFamilySupport
                ]
            )),
            RiskTier::High
        );
    }

    #[test]
    fn points_accumulate_for_struggling_student() {
        let fields = RecordFields {
            attendance_rate: 65.0,
            study_hours_per_week: 7.0,
            previous_percentage: 55.0,
            health_status: "poor".to_string(),
            family_support: "low".to_string(),
            current_percentage: 55.0,
            ..RecordFields::default()
        };
        let assessment = classify_by_points(&fields);
        assert_eq!(assessment.points, 15);
        assert_eq!(assessment.tier, RiskTier::High);
    }

    #[test]
    fn points_tier_boundaries() {
        assert_eq!(tier_for_points(0), RiskTier::Low);
        assert_eq!(tier_for_points(2), RiskTier::Low);
        assert_eq!(tier_for_points(3), RiskTier::Medium);
        assert_eq!(tier_for_points(5), RiskTier::Medium);
        assert_eq!(tier_for_points(6), RiskTier::High);
    }

    #[test]
    fn policies_can_disagree() {
        // Sleep is ignored by the points policy but counts as a weak factor.
        let fields = RecordFields {
            attendance_rate: 95.0,
            study_hours_per_week: 15.0,
            previous_percentage: 90.0,
            health_status: "good".to_string(),
            family_support: "high".to_string(),
            current_percentage: 92.0,
            sleep_duration_hours: 4.0,
            ..RecordFields::default()
        };
        assert_eq!(classify_by_points(&fields).tier, RiskTier::Low);
        assert_eq!(
            classify_by_factor_count(&scoring(90.0, vec![WeakFactor::PoorSleepHabits])),
            RiskTier::Medium
        );
    }

    #[test]
    fn policy_names_parse() {
        assert_eq!("factor-count".parse(), Ok(RiskPolicy::FactorCount));
        assert_eq!("point-accumulation".parse(), Ok(RiskPolicy::PointAccumulation));
        assert!("both".parse::<RiskPolicy>().is_err());
    }
}
