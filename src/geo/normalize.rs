//! Maps raw backend elements into [`Attraction`] records.

use std::collections::HashMap;

use super::models::{Attraction, AttractionTags, GeometryKind, RawElement};

pub const DEFAULT_CATEGORY: &str = "attraction";

/// Tag keys consulted for the category, first present value wins.
const CATEGORY_KEYS: &[&str] = &["tourism", "historic", "attraction"];

/// Tag keys consulted for the display name.
const NAME_KEYS: &[&str] = &["name", "name:en"];

const EARTH_RADIUS_M: f64 = 6_371_000.0;

fn first_tag(tags: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| tags.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

impl AttractionTags {
    pub fn from_raw(tags: &HashMap<String, String>) -> Self {
        let get = |key: &str| first_tag(tags, &[key]);
        Self {
            tourism: get("tourism"),
            historic: get("historic"),
            attraction: get("attraction"),
            website: first_tag(tags, &["website", "url"]),
            wikidata: get("wikidata"),
            wikipedia: get("wikipedia"),
            opening_hours: get("opening_hours"),
            addr_city: get("addr:city"),
            addr_street: get("addr:street"),
            addr_housenumber: get("addr:housenumber"),
        }
    }
}

/// Whether the element carries the geometry its kind requires.
///
/// Nodes need their own coordinate pair, ways and relations a backend-provided center.
pub fn has_usable_geometry(element: &RawElement) -> bool {
    if element.kind.is_extended() {
        element.center.is_some()
    } else {
        element.lat.is_some() && element.lon.is_some()
    }
}

/// Normalizes one element.
///
/// Returns `None` when the resolved coordinate is missing or not finite.
pub fn normalize_element(element: &RawElement) -> Option<Attraction> {
    let (latitude, longitude) = if element.kind.is_extended() {
        let center = element.center?;
        (center.lat?, center.lon?)
    } else {
        (element.lat?, element.lon?)
    };
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }

    let category =
        first_tag(&element.tags, CATEGORY_KEYS).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let name = first_tag(&element.tags, NAME_KEYS).unwrap_or_else(|| category.clone());

    Some(Attraction {
        id: format!("{}/{}", element.kind.as_str(), element.id),
        name,
        category,
        latitude,
        longitude,
        tags: AttractionTags::from_raw(&element.tags),
        distance_meters: None,
        image_url: None,
    })
}

/// Normalizes a backend response, keeping input order and at most `max_items` records.
pub fn normalize_elements(elements: &[RawElement], max_items: usize) -> Vec<Attraction> {
    elements
        .iter()
        .filter(|element| element.kind != GeometryKind::Other)
        .filter(|element| has_usable_geometry(element))
        .filter_map(normalize_element)
        .take(max_items)
        .collect()
}

/// Great-circle distance between two coordinates, in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}
