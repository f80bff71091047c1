//! SSRF-hardened image proxy.

pub mod address;
pub mod error;
pub mod fetcher;
pub mod proxy;
pub mod transcode;

pub use address::{
    is_public_ip, validate_target, HostPolicy, HostResolver, SystemResolver, VettedTarget,
};
pub use error::ProxyError;
pub use fetcher::{FetchedResource, ReqwestFetcher, UpstreamFetcher};
pub use proxy::{ImageProxy, ImageRequest, ProxiedImage};
