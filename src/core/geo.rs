use crate::models::Coordinate;

/// Earth's radius in metres
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Fallback centre (central London) used when no point is resolvable
pub const DEFAULT_CITY_CENTER: Coordinate = Coordinate::new(51.5074, -0.1278);

/// Arithmetic mean of the resolved points
///
/// `(0, 0)` sentinels are skipped. Returns [`DEFAULT_CITY_CENTER`] when
/// nothing is left to average.
pub fn centroid(points: &[Coordinate]) -> Coordinate {
    let (sum_lat, sum_lng, count) = points
        .iter()
        .filter(|p| p.is_resolved())
        .fold((0.0, 0.0, 0usize), |(lat, lng, n), p| (lat + p.lat, lng + p.lng, n + 1));

    if count == 0 {
        return DEFAULT_CITY_CENTER;
    }

    Coordinate::new(sum_lat / count as f64, sum_lng / count as f64)
}

/// Squared Euclidean distance in degree space
///
/// Not geodesic; only meaningful for ranking and proximity tests at city scale.
#[inline]
pub fn squared_distance(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = a.lat - b.lat;
    let d_lng = a.lng - b.lng;
    d_lat * d_lat + d_lng * d_lng
}

/// True when `a` and `b` are within `threshold_deg_sq` squared degrees
#[inline]
pub fn is_near(a: Coordinate, b: Coordinate, threshold_deg_sq: f64) -> bool {
    squared_distance(a, b) < threshold_deg_sq
}

/// Great-circle distance in metres
#[inline]
pub fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}
