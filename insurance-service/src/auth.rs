//! Demo authentication: a single hard-coded credential pair. A successful
//! login mints a uuid token and seeds a fresh [`Tenant`]; the token is carried
//! by clients in the `x-session-token` header.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::domain::User;
use crate::store::Tenant;

pub const DEMO_EMAIL: &str = "demo@insurance.com";
pub const DEMO_PASSWORD: &str = "demo";

pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

#[derive(Default)]
pub struct SessionRegistry {
    tenants: DashMap<String, Arc<Tenant>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the demo credentials; on success seed a tenant and hand back its
    /// token and user profile.
    pub fn login(&self, email: &str, password: &str) -> Option<(String, User)> {
        if email != DEMO_EMAIL || password != DEMO_PASSWORD {
            return None;
        }
        let token = Uuid::new_v4().to_string();
        let tenant = Arc::new(Tenant::seeded());
        let user = tenant.current_user();
        self.tenants.insert(token.clone(), tenant);
        info!(user_id = %user.id, "session created");
        Some((token, user))
    }

    pub fn resolve(&self, token: &str) -> Option<Arc<Tenant>> {
        self.tenants.get(token).map(|entry| entry.clone())
    }

    /// Drops the tenant store; all session data is gone after this.
    pub fn logout(&self, token: &str) -> bool {
        self.tenants.remove(token).is_some()
    }
}

/// Extract the raw session token from the request headers, or 401.
pub fn token_from_headers(headers: &HeaderMap) -> Result<&str, StatusCode> {
    headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)
}

/// Resolve the tenant for an incoming request, or 401.
pub fn tenant_from_headers(
    registry: &SessionRegistry,
    headers: &HeaderMap,
) -> Result<Arc<Tenant>, StatusCode> {
    let token = token_from_headers(headers)?;
    registry.resolve(token).ok_or(StatusCode::UNAUTHORIZED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_credentials_create_a_seeded_session() {
        let registry = SessionRegistry::new();
        let (token, user) = registry.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        assert_eq!(user.name, "John Doe");

        let tenant = registry.resolve(&token).unwrap();
        assert_eq!(tenant.current_user().id, user.id);
    }

    #[test]
    fn wrong_credentials_are_rejected() {
        let registry = SessionRegistry::new();
        assert!(registry.login(DEMO_EMAIL, "nope").is_none());
        assert!(registry.login("someone@else.com", DEMO_PASSWORD).is_none());
    }

    #[test]
    fn each_login_gets_its_own_data() {
        let registry = SessionRegistry::new();
        let (first, _) = registry.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        let (second, _) = registry.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        assert_ne!(first, second);

        // A claim in one session never shows up in the other.
        let tenant = registry.resolve(&first).unwrap();
        tenant
            .submit_claim(crate::store::NewClaim {
                policy_id: "1".to_string(),
                amount: 100.0,
                incident_date: chrono::NaiveDate::from_ymd_opt(2024, 9, 1),
                description: "scratch".to_string(),
            })
            .unwrap();
        let other = registry.resolve(&second).unwrap();
        assert_eq!(other.claims(None).len(), 2);
        assert_eq!(tenant.claims(None).len(), 3);
    }

    #[test]
    fn logout_drops_the_tenant() {
        let registry = SessionRegistry::new();
        let (token, _) = registry.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        assert!(registry.logout(&token));
        assert!(registry.resolve(&token).is_none());
        assert!(!registry.logout(&token));
    }
}
