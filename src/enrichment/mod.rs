//! Best-effort image enrichment of attraction records.

pub mod cache;
pub mod metadata;
pub mod resolver;
pub mod scheduler;
pub mod sources;

pub use cache::{CacheNamespace, Clock, ImageCache, SystemClock, TtlImageCache};
pub use resolver::{ImageResolver, ImageSource};
pub use scheduler::{enrich_all, enrich_within};
pub use sources::SourceError;
