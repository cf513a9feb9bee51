//! Distance helpers for "reports within N statute miles of the station".

const EARTH_RADIUS_SM: f64 = 3958.8;

/// Statute miles per degree of latitude.
const SM_PER_DEG_LAT: f64 = 69.0;

/// Great-circle distance in statute miles.
pub fn haversine_sm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_SM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Lat/lon box enclosing a circle, for services that only take boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box around (`lat`, `lon`) covering `radius_sm`.
    ///
    /// Longitude span widens with latitude and is clamped to the full
    /// range near the poles. Boxes crossing the antimeridian are clamped
    /// rather than wrapped.
    pub fn around(lat: f64, lon: f64, radius_sm: f64) -> Self {
        let dlat = radius_sm / SM_PER_DEG_LAT;
        let cos_lat = lat.to_radians().cos();
        let dlon = if cos_lat < 1e-6 {
            180.0
        } else {
            (radius_sm / (SM_PER_DEG_LAT * cos_lat)).min(180.0)
        };
        BoundingBox {
            min_lat: (lat - dlat).max(-90.0),
            min_lon: (lon - dlon).max(-180.0),
            max_lat: (lat + dlat).min(90.0),
            max_lon: (lon + dlon).min(180.0),
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        assert!(haversine_sm(35.0, -82.0, 35.0, -82.0) < 1e-9);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Asheville (KAVL) to Charlotte (KCLT), about 92 statute miles
        let d = haversine_sm(35.4362, -82.5418, 35.2140, -80.9431);
        assert!((d - 92.0).abs() < 3.0, "got {d}");
    }

    #[test]
    fn test_box_contains_circle_edge() {
        let bbox = BoundingBox::around(44.25, -81.6, 500.0);
        assert!(bbox.contains(44.25, -81.6));
        // A point ~490 sm due north must be inside
        assert!(bbox.contains(44.25 + 490.0 / 69.0, -81.6));
        assert!(bbox.max_lon - bbox.min_lon > bbox.max_lat - bbox.min_lat);
    }

    #[test]
    fn test_box_clamped_at_pole() {
        let bbox = BoundingBox::around(89.9, 0.0, 500.0);
        assert_eq!(bbox.max_lat, 90.0);
        assert_eq!(bbox.min_lon, -180.0);
        assert_eq!(bbox.max_lon, 180.0);
    }
}
