use storefront_auth::{AdminClaims, Role};

/// Authenticated admin for a request.
///
/// Inserted by the admin middleware; present on every write route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    subject: String,
    roles: Vec<Role>,
}

impl AdminContext {
    pub fn new(subject: String, roles: Vec<Role>) -> Self {
        Self { subject, roles }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}

impl From<AdminClaims> for AdminContext {
    fn from(claims: AdminClaims) -> Self {
        Self::new(claims.sub, claims.roles)
    }
}
