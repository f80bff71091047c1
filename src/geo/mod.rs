//! Geodata lookup: query building, backend failover and record normalization.

pub mod fetcher;
pub mod models;
pub mod normalize;
pub mod query;

pub use fetcher::{GeoError, GeoFetcher};
pub use models::{Attraction, AttractionTags, GeoPayload, GeometryKind, RawElement};
pub use normalize::{haversine_meters, normalize_element, normalize_elements};
pub use query::{build_query, effective_radius, GeoQuery};
