pub mod config;
pub mod error;
pub mod http_server;
pub mod registry;
pub mod service;
pub mod snapshot;
pub mod toolchain;
pub mod validation;
pub mod zone;

pub use error::{AdminError, Result};
pub use service::ZoneService;
