//! Great-circle distance and search-circle bounds on a spherical Earth.

/// Mean Earth radius used for every distance in the pipeline.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Slack added to bounding-box half-widths so that points sitting exactly
/// on the search radius are never pruned by floating-point rounding.
const BOUNDS_EPSILON_DEG: f64 = 1e-9;

/// Haversine great-circle distance between two lat/lng points in kilometers.
#[must_use]
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (lat1_r.cos() * lat2_r.cos()).mul_add(
        (d_lng / 2.0).sin().powi(2),
        (d_lat / 2.0).sin().powi(2),
    );
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Latitude/longitude half-widths (degrees) of the smallest box that
/// contains every point within `radius_km` of a center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchBounds {
    /// Half-height in degrees of latitude.
    pub lat_deg: f64,
    /// Half-width in degrees of longitude, `None` when the circle contains
    /// a pole and therefore spans every longitude.
    pub lng_deg: Option<f64>,
}

impl SearchBounds {
    /// Computes the bounds of the circle of `radius_km` around a point at
    /// latitude `lat`.
    ///
    /// The latitude extent is exact along a meridian. The longitude extent
    /// is `asin(sin(δ) / cos(φ))`, which widens towards the poles; once the
    /// circle reaches a pole every longitude is a candidate.
    #[must_use]
    pub fn around(lat: f64, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let lat_deg = angular.to_degrees() + BOUNDS_EPSILON_DEG;

        if lat.abs() + lat_deg >= 90.0 || angular >= std::f64::consts::FRAC_PI_2 {
            return Self {
                lat_deg,
                lng_deg: None,
            };
        }

        let ratio = angular.sin() / lat.to_radians().cos();
        if ratio >= 1.0 {
            return Self {
                lat_deg,
                lng_deg: None,
            };
        }

        Self {
            lat_deg,
            lng_deg: Some(ratio.asin().to_degrees() + BOUNDS_EPSILON_DEG),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert!(haversine_km(51.5, -0.1, 51.5, -0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.194_926_644_558_73).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = haversine_km(51.5, -0.1, 51.6, -0.2);
        let b = haversine_km(51.6, -0.2, 51.5, -0.1);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn known_london_distance() {
        // Nearby pair from the end-to-end scenario: roughly 66 m apart.
        let d = haversine_km(51.5000, -0.1000, 51.5005, -0.1005);
        assert!(d > 0.06 && d < 0.08, "got {d}");
    }

    #[test]
    fn longitude_bounds_widen_with_latitude() {
        let equator = SearchBounds::around(0.0, 1.0);
        let london = SearchBounds::around(51.5, 1.0);
        let eq_lng = equator.lng_deg.unwrap();
        let ldn_lng = london.lng_deg.unwrap();
        assert!((equator.lat_deg - london.lat_deg).abs() < 1e-12);
        assert!(ldn_lng > eq_lng * 1.5);
    }

    #[test]
    fn bounds_contain_points_on_the_radius() {
        let bounds = SearchBounds::around(51.5, 1.0);
        // Due east and due north points at exactly 1 km.
        let north = 51.5 + (1.0 / EARTH_RADIUS_KM).to_degrees();
        assert!(north - 51.5 <= bounds.lat_deg);
        let lng_deg = bounds.lng_deg.unwrap();
        let east = haversine_km(51.5, 0.0, 51.5, lng_deg);
        assert!(east >= 1.0, "east edge at {east} km");
    }

    #[test]
    fn polar_circles_span_all_longitudes() {
        let bounds = SearchBounds::around(89.999, 1.0);
        assert!(bounds.lng_deg.is_none());
    }
}
