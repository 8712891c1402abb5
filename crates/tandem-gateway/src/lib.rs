pub mod auth;
pub mod error;
pub mod server;
pub mod types;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{create_router, start_server, AppState};
