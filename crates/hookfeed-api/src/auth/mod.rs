// Authentication module
// Decision: Thin gate in front of read endpoints; tokens are issued elsewhere
// Decision: Cookie-based tokens for the dashboard, bearer tokens for programmatic access

pub mod config;
pub mod jwt;
pub mod middleware;

pub use config::{AuthConfig, AuthMode};
pub use middleware::{AuthError, AuthState, AuthUser};
