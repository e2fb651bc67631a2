pub mod auth;
pub mod error;

pub use auth::{JwtClaims, JwtHeader, User};
pub use error::AppError;
