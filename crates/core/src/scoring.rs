//! Candidate workshop scoring for emergency search.
//!
//! Pure and purely advisory: the dispatch engine takes whatever ordered
//! candidate list the caller sends, so callers may reuse, truncate, or
//! override this ranking.

use std::cmp::Ordering;

use serde::Serialize;

/// Mean Earth radius in kilometers, for haversine distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Points awarded when the workshop is in the customer's city.
pub const CITY_MATCH_POINTS: i32 = 2;

/// Points awarded when the workshop is on the customer's street.
pub const STREET_MATCH_POINTS: i32 = 3;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where the customer needs help.
#[derive(Debug, Clone)]
pub struct CustomerLocation {
    pub city: String,
    pub street: String,
    pub point: Option<GeoPoint>,
}

/// Locality score plus distance annotation for one candidate workshop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiteScore {
    pub points: i32,
    /// Great-circle distance in km; `None` when either side lacks coordinates.
    pub distance_km: Option<f64>,
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Score one candidate against the customer's location.
///
/// City and street comparisons are case-insensitive; a missing workshop field
/// simply scores no points for that component.
pub fn score_candidate(
    customer: &CustomerLocation,
    city: Option<&str>,
    street: Option<&str>,
    point: Option<GeoPoint>,
) -> SiteScore {
    let mut points = 0;

    if city.is_some_and(|c| c.eq_ignore_ascii_case(&customer.city)) {
        points += CITY_MATCH_POINTS;
    }
    if street.is_some_and(|s| s.eq_ignore_ascii_case(&customer.street)) {
        points += STREET_MATCH_POINTS;
    }

    let distance_km = match (customer.point, point) {
        (Some(a), Some(b)) => Some(haversine_km(a, b)),
        _ => None,
    };

    SiteScore { points, distance_km }
}

/// Ranking order: descending points, then ascending distance, with unknown
/// distance sorting last.
pub fn compare_scores(a: &SiteScore, b: &SiteScore) -> Ordering {
    b.points.cmp(&a.points).then_with(|| match (a.distance_km, b.distance_km) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(city: &str, street: &str, point: Option<GeoPoint>) -> CustomerLocation {
        CustomerLocation {
            city: city.to_string(),
            street: street.to_string(),
            point,
        }
    }

    // -- haversine -----------------------------------------------------------

    #[test]
    fn haversine_zero_for_same_point() {
        let p = GeoPoint {
            latitude: 31.9,
            longitude: 35.2,
        };
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn haversine_known_distance() {
        // Nablus to Ramallah, roughly 38 km great-circle.
        let nablus = GeoPoint {
            latitude: 32.2211,
            longitude: 35.2544,
        };
        let ramallah = GeoPoint {
            latitude: 31.8996,
            longitude: 35.2042,
        };
        let d = haversine_km(nablus, ramallah);
        assert!((35.0..41.0).contains(&d), "got {d}");
    }

    // -- scoring -------------------------------------------------------------

    #[test]
    fn city_and_street_matches_accumulate() {
        let c = customer("Nablus", "Main St", None);
        let score = score_candidate(&c, Some("Nablus"), Some("Main St"), None);
        assert_eq!(score.points, CITY_MATCH_POINTS + STREET_MATCH_POINTS);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let c = customer("Nablus", "main st", None);
        let score = score_candidate(&c, Some("NABLUS"), Some("Main St"), None);
        assert_eq!(score.points, CITY_MATCH_POINTS + STREET_MATCH_POINTS);
    }

    #[test]
    fn missing_workshop_fields_score_zero() {
        let c = customer("Nablus", "Main St", None);
        let score = score_candidate(&c, None, None, None);
        assert_eq!(score.points, 0);
        assert_eq!(score.distance_km, None);
    }

    #[test]
    fn distance_requires_both_sides() {
        let p = GeoPoint {
            latitude: 32.0,
            longitude: 35.0,
        };
        let with_coords = customer("A", "B", Some(p));
        let without = customer("A", "B", None);

        assert!(score_candidate(&with_coords, None, None, Some(p))
            .distance_km
            .is_some());
        assert!(score_candidate(&with_coords, None, None, None)
            .distance_km
            .is_none());
        assert!(score_candidate(&without, None, None, Some(p))
            .distance_km
            .is_none());
    }

    // -- ordering ------------------------------------------------------------

    #[test]
    fn higher_points_rank_first() {
        let a = SiteScore {
            points: 5,
            distance_km: Some(100.0),
        };
        let b = SiteScore {
            points: 2,
            distance_km: Some(1.0),
        };
        assert_eq!(compare_scores(&a, &b), Ordering::Less);
    }

    #[test]
    fn ties_break_by_ascending_distance() {
        let near = SiteScore {
            points: 2,
            distance_km: Some(1.5),
        };
        let far = SiteScore {
            points: 2,
            distance_km: Some(9.0),
        };
        assert_eq!(compare_scores(&near, &far), Ordering::Less);
    }

    #[test]
    fn unknown_distance_sorts_last() {
        let known = SiteScore {
            points: 2,
            distance_km: Some(50.0),
        };
        let unknown = SiteScore {
            points: 2,
            distance_km: None,
        };
        assert_eq!(compare_scores(&known, &unknown), Ordering::Less);
        assert_eq!(compare_scores(&unknown, &known), Ordering::Greater);
    }

    #[test]
    fn full_ranking_example() {
        let c = customer(
            "Nablus",
            "Main St",
            Some(GeoPoint {
                latitude: 32.22,
                longitude: 35.25,
            }),
        );

        // Same city + street, no coordinates.
        let exact = score_candidate(&c, Some("Nablus"), Some("Main St"), None);
        // Same city only, 0 km away.
        let near = score_candidate(
            &c,
            Some("Nablus"),
            Some("Other St"),
            Some(GeoPoint {
                latitude: 32.22,
                longitude: 35.25,
            }),
        );
        // Different city entirely.
        let elsewhere = score_candidate(&c, Some("Jenin"), Some("Main St 2"), None);

        let mut ranked = vec![elsewhere, near, exact];
        ranked.sort_by(compare_scores);

        assert_eq!(ranked[0], exact);
        assert_eq!(ranked[1], near);
        assert_eq!(ranked[2], elsewhere);
    }
}
