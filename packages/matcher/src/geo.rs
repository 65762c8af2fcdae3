//! Great-circle distance for layer-3 proximity checks.

use std::f64::consts::PI;

const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Haversine distance between two lat/lon points in miles.
#[must_use]
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let to_rad = |deg: f64| deg * PI / 180.0;

    let dlat = to_rad(lat2 - lat1);
    let dlon = to_rad(lon2 - lon1);

    let a = (dlat / 2.0).sin().powi(2)
        + to_rad(lat1).cos() * to_rad(lat2).cos() * (dlon / 2.0).sin().powi(2);

    EARTH_RADIUS_MILES * 2.0 * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        assert!(haversine_miles(41.88, -87.63, 41.88, -87.63).abs() < 1e-9);
    }

    #[test]
    fn minneapolis_to_st_paul_is_about_nine_miles() {
        let d = haversine_miles(44.96, -93.27, 44.94, -93.09);
        assert!((8.0..10.0).contains(&d), "distance was {d}");
    }

    #[test]
    fn adjacent_rinks_fall_inside_proximity_radius() {
        // ~0.2 miles apart.
        let d = haversine_miles(40.7128, -74.0060, 40.7157, -74.0060);
        assert!(d < crate::GEO_PROXIMITY_MILES, "distance was {d}");
    }
}
