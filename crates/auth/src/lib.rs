//! `storefront-auth` — admin credential boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the catalog
//! service wires it into request handling.

pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::{AdminClaims, Role, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, IssuedToken, JwtValidator, TokenError};
pub use password::{hash_password, verify_password};
