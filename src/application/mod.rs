// Application layer - use cases and orchestration shared by the CLI and the HTTP API

pub mod error;
pub mod service;
pub mod views;

pub use error::*;
pub use service::*;
pub use views::*;
