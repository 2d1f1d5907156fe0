/// Key builders for the shared cache layout.
pub mod cache_keys {
    use keystone_domain::{SessionId, UserId};

    /// Revoked access token marker.
    #[must_use]
    pub fn blacklist(token_hash: &str) -> String {
        format!("blacklist:{token_hash}")
    }

    /// Live refresh token of one session.
    #[must_use]
    pub fn refresh_token(session_id: &SessionId) -> String {
        format!("refresh_token:{session_id}")
    }

    /// Set of session ids issued to one user.
    #[must_use]
    pub fn user_sessions(user_id: &UserId) -> String {
        format!("user_sessions:{user_id}")
    }

    /// Serialized permission snapshot of one user.
    #[must_use]
    pub fn user_permissions(user_id: &UserId) -> String {
        format!("user_permissions:{user_id}")
    }

    /// Snapshot generation counter of one user.
    #[must_use]
    pub fn user_permissions_generation(user_id: &UserId) -> String {
        format!("user_permissions_generation:{user_id}")
    }

}
