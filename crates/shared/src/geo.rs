//! Great-circle geometry helpers.

/// Mean Earth radius used for all distance computations.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average city driving speed assumed for ETA estimates.
pub const AVG_CITY_SPEED_KMH: f64 = 25.0;

/// Distance in kilometers between two lat/lng points.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlng / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Rough trip duration in minutes assuming a constant average speed.
pub fn estimate_duration_minutes(distance_km: f64, avg_speed_kmh: f64) -> f64 {
    if avg_speed_kmh <= 0.0 {
        return 0.0;
    }
    (distance_km / avg_speed_kmh) * 60.0
}
