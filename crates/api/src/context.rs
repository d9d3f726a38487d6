use queryapi_auth::TokenClaims;

/// Authenticated identity of a request.
///
/// Inserted by the JWT middleware; only present on authenticated routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    claims: TokenClaims,
}

impl AuthContext {
    pub fn new(claims: TokenClaims) -> Self {
        Self { claims }
    }

    pub fn user_id(&self) -> &str {
        &self.claims.id
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }
}
