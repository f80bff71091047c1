mod attractions;
pub mod config;
mod http_layers;
mod image;
pub mod metrics;
pub mod server;
pub mod state;

pub use attractions::{AttractionsParams, AttractionsResponse};
pub use config::ServerConfig;
pub use http_layers::*;
pub use image::ImageParams;
pub use server::{make_app, make_metrics_app, run_server};
pub use state::ServerState;
