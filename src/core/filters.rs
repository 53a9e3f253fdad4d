use chrono::NaiveDate;

use crate::core::calendar::birth_date_window;
use crate::models::{CandidateCriteria, Profile};

/// Build the eligibility criteria for a requester's candidates
///
/// Counterparts are the opposite declared gender, complete and verified,
/// inside the requester's partner age range and preferred locations.
pub fn build_criteria(requester: &Profile, today: NaiveDate) -> CandidateCriteria {
    let (min_birth_date, max_birth_date) =
        birth_date_window(requester.partner.age_from, requester.partner.age_to, today);

    let locations = requester
        .partner
        .preferred_locations
        .iter()
        .map(|location| location.trim().to_string())
        .filter(|location| !location.is_empty())
        .collect();

    CandidateCriteria {
        gender: requester.gender.opposite(),
        exclude_user_id: requester.user_id.clone(),
        require_complete: true,
        require_verified: true,
        min_birth_date,
        max_birth_date,
        locations,
    }
}

/// Check whether a profile satisfies the candidate criteria
///
/// The directory applies the same filters server-side; this re-check keeps
/// ineligible profiles out even when a directory ignores one of them.
#[inline]
pub fn matches_criteria(profile: &Profile, criteria: &CandidateCriteria) -> bool {
    if profile.user_id == criteria.exclude_user_id {
        return false;
    }

    if profile.gender != criteria.gender {
        return false;
    }

    if (criteria.require_complete && !profile.is_complete)
        || (criteria.require_verified && !profile.is_verified)
    {
        return false;
    }

    // Birth-date window, inclusive on both ends
    if criteria.min_birth_date.is_some() || criteria.max_birth_date.is_some() {
        let Some(dob) = profile.date_of_birth else {
            return false;
        };
        if criteria.min_birth_date.is_some_and(|min| dob < min)
            || criteria.max_birth_date.is_some_and(|max| dob > max)
        {
            return false;
        }
    }

    if !criteria.locations.is_empty() {
        let Some(location) = profile.job_location.as_deref() else {
            return false;
        };
        if !criteria.locations.iter().any(|wanted| wanted == location) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, PartnerPreferences};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_profile(user_id: &str, gender: Gender, dob: NaiveDate, location: &str) -> Profile {
        Profile {
            id: format!("profile-{}", user_id),
            user_id: user_id.to_string(),
            gender,
            date_of_birth: Some(dob),
            marital_status: Some("Never Married".to_string()),
            mother_tongue: Some("Hindi".to_string()),
            height_cm: Some(165),
            education: Some("Graduate".to_string()),
            occupation: Some("Salaried (Private)".to_string()),
            job_location: Some(location.to_string()),
            partner: PartnerPreferences::default(),
            is_verified: true,
            is_complete: true,
            last_active: None,
        }
    }

    fn create_requester() -> Profile {
        let mut requester = create_test_profile("requester", Gender::Male, date(1995, 1, 1), "Pune");
        requester.partner = PartnerPreferences {
            age_from: Some(25),
            age_to: Some(30),
            preferred_locations: vec!["Pune".to_string(), " Mumbai ".to_string(), "".to_string()],
            min_income: None,
        };
        requester
    }

    #[test]
    fn test_build_criteria() {
        let today = date(2024, 6, 1);
        let criteria = build_criteria(&create_requester(), today);

        assert_eq!(criteria.gender, Gender::Female);
        assert_eq!(criteria.exclude_user_id, "requester");
        assert_eq!(criteria.max_birth_date, Some(date(1999, 6, 1)));
        assert_eq!(criteria.min_birth_date, Some(date(1993, 6, 1)));
        assert_eq!(criteria.locations, vec!["Pune", "Mumbai"]);
    }

    #[test]
    fn test_candidate_in_window_matches() {
        let criteria = build_criteria(&create_requester(), date(2024, 6, 1));
        let candidate = create_test_profile("c1", Gender::Female, date(1997, 3, 3), "Mumbai");

        assert!(matches_criteria(&candidate, &criteria));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let criteria = build_criteria(&create_requester(), date(2024, 6, 1));
        let youngest = create_test_profile("c1", Gender::Female, date(1999, 6, 1), "Pune");
        let oldest = create_test_profile("c2", Gender::Female, date(1993, 6, 1), "Pune");
        let too_old = create_test_profile("c3", Gender::Female, date(1993, 5, 31), "Pune");

        assert!(matches_criteria(&youngest, &criteria));
        assert!(matches_criteria(&oldest, &criteria));
        assert!(!matches_criteria(&too_old, &criteria));
    }

    #[test]
    fn test_same_gender_filtered() {
        let criteria = build_criteria(&create_requester(), date(2024, 6, 1));
        let candidate = create_test_profile("c1", Gender::Male, date(1997, 3, 3), "Pune");

        assert!(!matches_criteria(&candidate, &criteria));
    }

    #[test]
    fn test_unverified_or_incomplete_filtered() {
        let criteria = build_criteria(&create_requester(), date(2024, 6, 1));
        let mut unverified = create_test_profile("c1", Gender::Female, date(1997, 3, 3), "Pune");
        unverified.is_verified = false;
        let mut incomplete = create_test_profile("c2", Gender::Female, date(1997, 3, 3), "Pune");
        incomplete.is_complete = false;

        assert!(!matches_criteria(&unverified, &criteria));
        assert!(!matches_criteria(&incomplete, &criteria));
    }

    #[test]
    fn test_location_outside_preferences_filtered() {
        let criteria = build_criteria(&create_requester(), date(2024, 6, 1));
        let candidate = create_test_profile("c1", Gender::Female, date(1997, 3, 3), "Delhi");

        assert!(!matches_criteria(&candidate, &criteria));
    }

    #[test]
    fn test_no_preferences_accepts_any_age_and_location() {
        let mut requester = create_requester();
        requester.partner = PartnerPreferences::default();
        let criteria = build_criteria(&requester, date(2024, 6, 1));
        let mut candidate = create_test_profile("c1", Gender::Female, date(1970, 1, 1), "Delhi");
        candidate.date_of_birth = None;

        assert!(matches_criteria(&candidate, &criteria));
    }
}
