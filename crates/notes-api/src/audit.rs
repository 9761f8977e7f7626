//! Security audit logging for authentication events
//!
//! Every event is logged at INFO level with the `audit` target, so it can be
//! filtered and routed separately from application logs, e.g.
//! `RUST_LOG=audit=info`.

use axum::http::{header, HeaderMap};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Where a request came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Read the client address and user agent from request headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Security audit events for authentication
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    RegistrationSuccess {
        user_id: i64,
        email: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    RegistrationFailure {
        email: String,
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    LoginSuccess {
        user_id: i64,
        email: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Unknown email and wrong password are both recorded here
    LoginFailure {
        email: String,
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    TokenRefresh {
        user_id: i64,
        email: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    RefreshRejected {
        user_id: Option<i64>,
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    Logout {
        user_id: i64,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Bearer token refused by the auth middleware
    InvalidToken {
        reason: String,
        path: String,
        #[serde(flatten)]
        client: ClientInfo,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::RegistrationSuccess { .. } => "User registered",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::TokenRefresh { .. } => "Access token refreshed",
            AuditEvent::RefreshRejected { .. } => "Token refresh rejected",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::InvalidToken { .. } => "Invalid access token",
        }
    }

    fn user_id(&self) -> Option<i64> {
        match self {
            AuditEvent::RegistrationSuccess { user_id, .. }
            | AuditEvent::LoginSuccess { user_id, .. }
            | AuditEvent::TokenRefresh { user_id, .. }
            | AuditEvent::Logout { user_id, .. } => Some(*user_id),
            AuditEvent::RefreshRejected { user_id, .. } => *user_id,
            _ => None,
        }
    }

    fn client(&self) -> &ClientInfo {
        match self {
            AuditEvent::RegistrationSuccess { client, .. }
            | AuditEvent::RegistrationFailure { client, .. }
            | AuditEvent::LoginSuccess { client, .. }
            | AuditEvent::LoginFailure { client, .. }
            | AuditEvent::TokenRefresh { client, .. }
            | AuditEvent::RefreshRejected { client, .. }
            | AuditEvent::Logout { client, .. }
            | AuditEvent::InvalidToken { client, .. } => client,
        }
    }
}

/// Log a security audit event with structured fields
///
/// The whole event is also attached as JSON in the `event` field for log
/// aggregators.
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    let client = event.client();
    info!(
        target: "audit",
        timestamp = %timestamp,
        event = %event_json,
        user_id = ?event.user_id(),
        ip_address = ?client.ip_address,
        user_agent = ?client.user_agent,
        "{}",
        event.summary()
    );
}

/// Extract the client IP from proxy headers
///
/// Takes the first hop of `X-Forwarded-For`, then `X-Real-IP`.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// Extract the user agent from request headers
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientInfo {
        ClientInfo {
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: Some("Test Agent".to_string()),
        }
    }

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: 42,
            email: "test@example.com".to_string(),
            client: client(),
        };

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "login_success");
        assert_eq!(json["user_id"], 42);
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["ip_address"], "192.168.1.1");
    }

    #[test]
    fn test_event_fields() {
        let logout = AuditEvent::Logout {
            user_id: 5,
            client: client(),
        };
        assert_eq!(logout.user_id(), Some(5));
        assert_eq!(logout.summary(), "User logout");

        let rejected = AuditEvent::RefreshRejected {
            user_id: None,
            reason: "Token has expired".to_string(),
            client: ClientInfo::default(),
        };
        assert_eq!(rejected.user_id(), None);
        assert_eq!(rejected.client(), &ClientInfo::default());
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::LoginFailure {
            email: "test@example.com".to_string(),
            reason: "Invalid credentials".to_string(),
            client: client(),
        });
        audit_log(&AuditEvent::InvalidToken {
            reason: "Malformed token".to_string(),
            path: "/notes".to_string(),
            client: ClientInfo::default(),
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_client_info_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, "Mozilla/5.0 (Test)".parse().unwrap());

        let info = ClientInfo::from_headers(&headers);
        assert_eq!(info.ip_address, None);
        assert_eq!(info.user_agent, Some("Mozilla/5.0 (Test)".to_string()));

        assert_eq!(
            ClientInfo::from_headers(&HeaderMap::new()),
            ClientInfo::default()
        );
    }
}
