//! `queryapi-auth`: JWT claims and HS256 token handling.
//!
//! This crate is intentionally decoupled from HTTP; header parsing and the
//! request middleware live in the API crate.

pub mod claims;
pub mod jwt;

pub use claims::{TokenClaims, TokenError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator};
