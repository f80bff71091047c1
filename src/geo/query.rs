//! Builds the Overpass QL query sent to the geodata backend.

pub const MIN_RADIUS_M: u32 = 100;
pub const MAX_RADIUS_M: u32 = 200_000;
pub const DEFAULT_RADIUS_M: u32 = 2_000;

/// `tourism` values the query selects. Any `historic` element is selected too.
pub const TOURISM_VALUES: &[&str] = &[
    "attraction",
    "museum",
    "gallery",
    "artwork",
    "viewpoint",
    "zoo",
    "theme_park",
    "aquarium",
    "picnic_site",
];

/// Radius upper bound (inclusive), backend timeout in seconds, per-call result cap.
const SCALING_STEPS: &[(u32, u32, u32)] = &[
    (5_000, 25, 500),
    (20_000, 40, 300),
    (50_000, 60, 200),
    (MAX_RADIUS_M, 90, 100),
];

#[derive(Debug, Clone, PartialEq)]
pub struct GeoQuery {
    pub radius_m: u32,
    pub timeout_sec: u32,
    pub max_results: u32,
    pub text: String,
}

/// Clamps a requested radius into `[MIN_RADIUS_M, MAX_RADIUS_M]`.
///
/// Missing or non-finite radii fall back to [`DEFAULT_RADIUS_M`].
pub fn effective_radius(requested: Option<f64>) -> u32 {
    match requested {
        Some(r) if r.is_finite() => {
            r.round().clamp(MIN_RADIUS_M as f64, MAX_RADIUS_M as f64) as u32
        }
        _ => DEFAULT_RADIUS_M,
    }
}

fn scaling_for(radius_m: u32) -> (u32, u32) {
    SCALING_STEPS
        .iter()
        .find(|(bound, _, _)| radius_m <= *bound)
        .map(|(_, timeout, cap)| (*timeout, *cap))
        .unwrap_or((90, 100))
}

pub fn build_query(latitude: f64, longitude: f64, requested_radius: Option<f64>) -> GeoQuery {
    let radius_m = effective_radius(requested_radius);
    let (timeout_sec, max_results) = scaling_for(radius_m);
    let around = format!("(around:{},{},{})", radius_m, latitude, longitude);
    let tourism = format!("[\"tourism\"~\"^({})$\"]", TOURISM_VALUES.join("|"));

    let mut text = format!("[out:json][timeout:{}];\n(\n", timeout_sec);
    for kind in ["node", "way", "relation"] {
        text.push_str(&format!("  {}{}{};\n", kind, tourism, around));
    }
    for kind in ["node", "way", "relation"] {
        text.push_str(&format!("  {}[\"historic\"]{};\n", kind, around));
    }
    text.push_str(&format!(");\nout center {};\n", max_results));

    GeoQuery {
        radius_m,
        timeout_sec,
        max_results,
        text,
    }
}
