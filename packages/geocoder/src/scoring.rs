//! Address-match confidence scoring.
//!
//! The score is the mean of the sub-scores that could be computed:
//! street vs road, city vs locality, state vs subdivision. Components
//! missing on either side simply don't contribute.

use ice_maker_matcher::similarity;

use crate::AddressDetail;

/// Scores how well a geocoder hit matches the parsed address, 0.0–1.0.
#[must_use]
pub fn score_address(
    street: Option<&str>,
    city: Option<&str>,
    state: Option<&str>,
    detail: &AddressDetail,
) -> f64 {
    let mut scores: Vec<f64> = Vec::with_capacity(3);

    if let (Some(street), Some(road)) = (non_empty(street), non_empty(detail.road.as_deref())) {
        scores.push(similarity::ratio(
            &street.to_lowercase(),
            &road.to_lowercase(),
        ));
    }

    if let (Some(city), Some(locality)) = (non_empty(city), non_empty(detail.locality())) {
        scores.push(similarity::ratio(
            &city.to_lowercase(),
            &locality.to_lowercase(),
        ));
    }

    if let Some(state) = non_empty(state) {
        let st = state.trim().to_uppercase();

        if let Some(iso) = non_empty(detail.iso_subdivision.as_deref()) {
            // "US-IL" -> "IL"
            let abbrev = iso.rsplit('-').next().unwrap_or(iso).to_uppercase();
            scores.push(if st == abbrev { 1.0 } else { 0.0 });
        } else if let Some(geo_state) = non_empty(detail.state.as_deref()) {
            let geo_st = geo_state.trim().to_uppercase();
            let geo_prefix: String = geo_st.chars().take(2).collect();
            if st == geo_st || st.starts_with(&geo_prefix) {
                scores.push(1.0);
            } else {
                scores.push(similarity::ratio(&st, &geo_st));
            }
        }
    }

    if scores.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(road: &str, city: &str, iso: Option<&str>, state: Option<&str>) -> AddressDetail {
        AddressDetail {
            road: Some(road.to_string()),
            city: Some(city.to_string()),
            town: None,
            village: None,
            state: state.map(str::to_string),
            iso_subdivision: iso.map(str::to_string),
            postcode: None,
        }
    }

    #[test]
    fn perfect_match_scores_one() {
        let d = detail("North State Street", "Chicago", Some("US-IL"), None);
        let score = score_address(
            Some("NORTH STATE STREET"),
            Some("Chicago"),
            Some("IL"),
            &d,
        );
        assert!((score - 1.0).abs() < f64::EPSILON, "score was {score}");
    }

    #[test]
    fn iso_code_mismatch_zeroes_the_state_component() {
        let d = detail("Main Street", "Springfield", Some("US-MO"), None);
        let score = score_address(Some("MAIN STREET"), Some("Springfield"), Some("IL"), &d);
        // street 1.0 + city 1.0 + state 0.0, mean = 2/3
        assert!((score - 2.0 / 3.0).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn state_prefix_matches_full_name() {
        let d = detail("Main Street", "Minneapolis", None, Some("Minnesota"));
        let score = score_address(Some("MAIN STREET"), Some("Minneapolis"), Some("MI"), &d);
        // "MI" starts with "MI" of "MINNESOTA" -> state contributes 1.0.
        assert!((score - 1.0).abs() < f64::EPSILON, "score was {score}");
    }

    #[test]
    fn missing_components_drop_out_of_the_mean() {
        let d = AddressDetail {
            city: Some("Chicago".to_string()),
            ..AddressDetail::default()
        };
        let score = score_address(Some("MAIN STREET"), Some("Chicago"), None, &d);
        assert!((score - 1.0).abs() < f64::EPSILON, "score was {score}");
    }

    #[test]
    fn nothing_comparable_scores_zero() {
        let score = score_address(None, None, None, &AddressDetail::default());
        assert!(score.abs() < f64::EPSILON);
    }

    #[test]
    fn dissimilar_street_alone_scores_below_threshold() {
        let d = AddressDetail {
            road: Some("Completely Unrelated Parkway".to_string()),
            ..AddressDetail::default()
        };
        let score = score_address(Some("100 MAIN STREET"), None, None, &d);
        assert!(score < crate::CONFIDENCE_THRESHOLD, "score was {score}");
    }
}
