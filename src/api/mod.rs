//! API endpoint modules.

pub mod health;
pub mod openapi;
pub mod references;
pub mod updates;
pub mod websocket;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use references::configure_routes as configure_reference_routes;
pub use updates::{UploadLimits, configure_routes as configure_update_routes};
pub use websocket::configure_routes as configure_websocket_routes;
