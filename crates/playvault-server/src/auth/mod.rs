//! Authentication: JWT issuance/validation, password hashing, and the
//! request extractors that gate protected routes.

pub mod claims;
pub mod extract;
pub mod jwt;
pub mod password;

pub use claims::Claims;
pub use extract::{AuthAdmin, AuthGamer};
pub use jwt::JwtManager;
