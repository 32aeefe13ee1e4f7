// Identity module
// Verifies bearer credentials issued elsewhere and exposes the caller's id and role

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

pub use error::AuthError;
pub use middleware::{AdminUser, AuthenticatedUser};
pub use models::{Identity, Role};
pub use token::{Claims, IdentityVerifier, JwtVerifier};
