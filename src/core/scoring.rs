use chrono::NaiveDate;

use crate::core::calendar::age_on;
use crate::models::{MatchFactors, Profile, ScoringWeights};

/// Age assumed for a profile without a date of birth
pub const FALLBACK_AGE: u32 = 25;

/// Education rank assumed for unknown levels ("Graduate")
pub const FALLBACK_EDUCATION_RANK: u8 = 5;

/// No lifestyle attributes are modelled yet; every pair gets this value
pub const LIFESTYLE_BASELINE: u8 = 75;

/// Broad occupation groups used for occupation compatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupationGroup {
    Employed,
    Business,
    Student,
    Homemaker,
    Unemployed,
    Other,
}

/// Total score plus the factor breakdown it was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compatibility {
    pub match_score: u8,
    pub factors: MatchFactors,
}

/// Calculate compatibility (0-100) between two profiles
///
/// Scoring formula:
/// score = round(
///     age * 0.20 +          # 100 - 5 per year of age gap
///     education * 0.15 +    # 100 - 15 per education rank step
///     occupation * 0.15 +   # same occupation group = 100, else 60
///     location * 0.10 +     # same job location = 100, differ = 50, unknown = 70
///     family * 0.20 +       # 80, +20 for a shared mother tongue
///     lifestyle * 0.20      # constant 75
/// )
///
/// Every factor is symmetric, so `score(a, b) == score(b, a)`.
pub fn calculate_compatibility(
    a: &Profile,
    b: &Profile,
    today: NaiveDate,
    weights: &ScoringWeights,
) -> Compatibility {
    let factors = MatchFactors {
        age_compatibility: age_compatibility(profile_age(a, today), profile_age(b, today)),
        education_compatibility: education_compatibility(
            a.education.as_deref(),
            b.education.as_deref(),
        ),
        occupation_compatibility: occupation_compatibility(
            a.occupation.as_deref(),
            b.occupation.as_deref(),
        ),
        location_compatibility: location_compatibility(
            a.job_location.as_deref(),
            b.job_location.as_deref(),
        ),
        family_compatibility: family_compatibility(
            a.mother_tongue.as_deref(),
            b.mother_tongue.as_deref(),
        ),
        lifestyle_compatibility: LIFESTYLE_BASELINE,
    };

    Compatibility {
        match_score: weighted_score(&factors, weights),
        factors,
    }
}

/// Weighted sum of the factors, rounded and clamped to 0-100
pub fn weighted_score(factors: &MatchFactors, weights: &ScoringWeights) -> u8 {
    let total = f64::from(factors.age_compatibility) * weights.age
        + f64::from(factors.education_compatibility) * weights.education
        + f64::from(factors.occupation_compatibility) * weights.occupation
        + f64::from(factors.location_compatibility) * weights.location
        + f64::from(factors.family_compatibility) * weights.family
        + f64::from(factors.lifestyle_compatibility) * weights.lifestyle;

    total.round().clamp(0.0, 100.0) as u8
}

#[inline]
fn clamp_factor(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

fn profile_age(profile: &Profile, today: NaiveDate) -> u32 {
    profile
        .date_of_birth
        .map(|dob| age_on(dob, today))
        .unwrap_or(FALLBACK_AGE)
}

#[inline]
fn age_compatibility(age_a: u32, age_b: u32) -> u8 {
    let gap = i64::from(age_a.abs_diff(age_b));
    clamp_factor(100 - gap * 5)
}

/// Ordinal rank of an education level (1-7)
pub fn education_rank(level: Option<&str>) -> u8 {
    let Some(level) = level else {
        return FALLBACK_EDUCATION_RANK;
    };

    match level.trim().to_lowercase().as_str() {
        "below 10th" => 1,
        "10th" | "10th pass" | "high school" => 2,
        "12th" | "12th pass" | "higher secondary" => 3,
        "diploma" => 4,
        "graduate" | "bachelors" | "bachelor's" => 5,
        "post graduate" | "postgraduate" | "masters" | "master's" => 6,
        "doctorate" | "phd" | "professional" => 7,
        _ => FALLBACK_EDUCATION_RANK,
    }
}

#[inline]
fn education_compatibility(a: Option<&str>, b: Option<&str>) -> u8 {
    let gap = i64::from(education_rank(a).abs_diff(education_rank(b)));
    clamp_factor(100 - gap * 15)
}

/// Map a free-form occupation onto its group
pub fn occupation_group(occupation: Option<&str>) -> OccupationGroup {
    let Some(occupation) = occupation else {
        return OccupationGroup::Other;
    };

    match occupation.trim().to_lowercase().as_str() {
        "salaried"
        | "salaried (private)"
        | "salaried (government)"
        | "private job"
        | "government job"
        | "government/psu"
        | "defence"
        | "civil services"
        | "professional"
        | "doctor"
        | "engineer"
        | "teacher" => OccupationGroup::Employed,
        "business" | "business owner" | "self employed" | "self-employed" | "entrepreneur" => {
            OccupationGroup::Business
        }
        "student" => OccupationGroup::Student,
        "homemaker" | "housewife" => OccupationGroup::Homemaker,
        "not working" | "unemployed" | "retired" => OccupationGroup::Unemployed,
        _ => OccupationGroup::Other,
    }
}

#[inline]
fn occupation_compatibility(a: Option<&str>, b: Option<&str>) -> u8 {
    if occupation_group(a) == occupation_group(b) {
        100
    } else {
        60
    }
}

#[inline]
fn location_compatibility(a: Option<&str>, b: Option<&str>) -> u8 {
    fn present(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    match (present(a), present(b)) {
        (Some(a), Some(b)) if a.to_lowercase() == b.to_lowercase() => 100,
        (Some(_), Some(_)) => 50,
        _ => 70,
    }
}

#[inline]
fn family_compatibility(a: Option<&str>, b: Option<&str>) -> u8 {
    let shared_tongue = matches!((a, b), (Some(a), Some(b)) if a == b);
    let score: i64 = if shared_tongue { 80 + 20 } else { 80 };
    clamp_factor(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_compatibility() {
        assert_eq!(age_compatibility(28, 30), 90);
        assert_eq!(age_compatibility(30, 28), 90);
        assert_eq!(age_compatibility(20, 60), 0);
    }

    #[test]
    fn test_education_rank_table() {
        assert_eq!(education_rank(Some("Below 10th")), 1);
        assert_eq!(education_rank(Some("Post Graduate")), 6);
        assert_eq!(education_rank(Some("Doctorate")), 7);
        assert_eq!(education_rank(Some("Professional")), 7);
        assert_eq!(education_rank(Some("Astronaut school")), 5);
        assert_eq!(education_rank(None), 5);
    }

    #[test]
    fn test_education_compatibility() {
        assert_eq!(education_compatibility(Some("Graduate"), Some("Graduate")), 100);
        assert_eq!(education_compatibility(Some("Graduate"), Some("Doctorate")), 70);
        assert_eq!(education_compatibility(Some("Below 10th"), Some("Doctorate")), 10);
    }

    #[test]
    fn test_occupation_groups() {
        assert_eq!(occupation_group(Some("Salaried (Private)")), OccupationGroup::Employed);
        assert_eq!(occupation_group(Some("Self Employed")), OccupationGroup::Business);
        assert_eq!(occupation_group(Some("Not Working")), OccupationGroup::Unemployed);
        assert_eq!(occupation_compatibility(Some("Student"), Some("student")), 100);
        assert_eq!(occupation_compatibility(Some("Student"), Some("Business")), 60);
    }

    #[test]
    fn test_location_compatibility() {
        assert_eq!(location_compatibility(Some("Pune"), Some(" pune ")), 100);
        assert_eq!(location_compatibility(Some("Pune"), Some("Delhi")), 50);
        assert_eq!(location_compatibility(Some("Pune"), None), 70);
        assert_eq!(location_compatibility(Some(""), Some("Pune")), 70);
    }

    #[test]
    fn test_family_compatibility() {
        assert_eq!(family_compatibility(Some("Hindi"), Some("Hindi")), 100);
        assert_eq!(family_compatibility(Some("Hindi"), Some("hindi")), 80);
        assert_eq!(family_compatibility(None, None), 80);
    }

    #[test]
    fn test_weighted_score_bounds() {
        let weights = ScoringWeights::default();
        let best = MatchFactors {
            age_compatibility: 100,
            education_compatibility: 100,
            occupation_compatibility: 100,
            location_compatibility: 100,
            family_compatibility: 100,
            lifestyle_compatibility: 100,
        };
        assert_eq!(weighted_score(&best, &weights), 100);
        assert_eq!(weighted_score(&MatchFactors::default(), &weights), 0);
    }
}
