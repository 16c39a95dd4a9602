pub mod app_state;
pub mod auth;
pub mod connection;

pub use app_state::{AppState, ConnectionInfo};
pub use auth::{AuthError, Identity, authenticate};
pub use connection::ControlConnection;
