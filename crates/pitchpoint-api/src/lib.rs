pub mod analytics;
pub mod auth;
pub mod content;
pub mod error;
pub mod forms;
pub mod messages;
pub mod middleware;
pub mod profiles;
pub mod reports;
pub mod router;
pub mod settings;
pub mod state;
pub mod users;
pub mod verifications;

pub use error::ApiError;
pub use router::router;
pub use state::{AppState, AppStateInner};
