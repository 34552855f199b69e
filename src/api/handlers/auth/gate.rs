//! Request-time access gate.
//!
//! A per-request state machine: classify the route, verify the session
//! cookie, authorize against the policy table. Every evaluation is fresh and
//! stateless; the gate holds no shared mutable state and caches nothing.
//!
//! Outcomes are never rendered as errors. An unauthenticated caller on a
//! protected route bounces to login carrying the original path; an
//! authenticated but under-privileged caller bounces to their own dashboard,
//! never to login.

use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::claims::{verify_session_token, SessionClaims};
use super::cookie;
use super::policy;
use super::redirect::default_dashboard;
use super::secret::SessionKeys;
use super::state::AuthState;

#[derive(Debug)]
pub(crate) enum GateDecision {
    /// Public or unenumerated route; forward without touching the session.
    Allow,
    /// Protected route, session verified and authorized; claims travel with
    /// the request.
    Forward(SessionClaims),
    /// No session, or a session that failed verification (which also clears
    /// the stale cookies).
    LoginRedirect { location: String, clear_cookies: bool },
    /// Authenticated but under-privileged; send the caller home.
    DashboardRedirect { location: String },
}

/// Pure decision function of (path, cookie, policy table, now).
pub(crate) fn evaluate(keys: &SessionKeys, path: &str, token: Option<&str>) -> GateDecision {
    if policy::is_public(path) {
        return GateDecision::Allow;
    }

    let Some(access) = policy::required_access(path) else {
        // Non-enumerated routes are implicitly public by design.
        return GateDecision::Allow;
    };

    let Some(token) = token else {
        return GateDecision::LoginRedirect {
            location: login_redirect(path),
            clear_cookies: false,
        };
    };

    let claims = match verify_session_token(keys, token) {
        Ok(claims) => claims,
        Err(err) => {
            // Fail closed and self-heal: the broken cookie gets cleared on
            // the way back to login.
            debug!("session verification failed on {path}: {err}");
            return GateDecision::LoginRedirect {
                location: login_redirect(path),
                clear_cookies: true,
            };
        }
    };

    if policy::authorize(access, &claims) {
        GateDecision::Forward(claims)
    } else {
        GateDecision::DashboardRedirect {
            location: default_dashboard(claims.role, &claims.staff_roles).to_string(),
        }
    }
}

fn login_redirect(path: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("/login?redirect={encoded}")
}

/// Gate middleware; wraps the whole router.
pub async fn access_gate(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let token = cookie::extract_session_token(request.headers());

    match evaluate(state.keys(), &path, token.as_deref()) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Forward(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        GateDecision::LoginRedirect {
            location,
            clear_cookies,
        } => {
            let mut response = Redirect::temporary(&location).into_response();
            if clear_cookies {
                let host = cookie::request_host(request.headers(), state.config());
                for value in cookie::clear_session_cookies(state.config(), &host) {
                    response.headers_mut().append(SET_COOKIE, value);
                }
            }
            response
        }
        GateDecision::DashboardRedirect { location } => {
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::email::{LogMailSender, MailSender};
    use crate::api::handlers::auth::claims::create_session_token;
    use crate::api::handlers::auth::roles::{Role, StaffRole};
    use crate::api::handlers::auth::state::AuthConfig;
    use anyhow::Result;
    use axum::{
        body::Body,
        http::{header::LOCATION, Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_state() -> Arc<AuthState> {
        let keys = SessionKeys::from_secret(&secrecy::SecretString::from(
            "gate-test-secret-minimum-32-characters!".to_string(),
        ));
        let config = AuthConfig::new("http://localhost:3000".to_string());
        let mailer: Arc<dyn MailSender> = Arc::new(LogMailSender);
        Arc::new(AuthState::new(config, keys, mailer))
    }

    fn gated_router(state: Arc<AuthState>) -> Router {
        Router::new()
            .route("/", get(|| async { "home" }))
            .fallback(|| async { "forwarded" })
            .layer(from_fn_with_state(state, access_gate))
    }

    fn signed_token(
        state: &AuthState,
        role: Role,
        staff_roles: Vec<StaffRole>,
        ttl_seconds: i64,
    ) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: "User".to_string(),
            role,
            staff_roles,
            vendor: false,
            restaurateur: false,
            iat,
            exp: iat + ttl_seconds,
        };
        Ok(create_session_token(state.keys(), &claims)?)
    }

    async fn send(
        router: Router,
        path: &str,
        cookie_header: Option<&str>,
    ) -> Result<axum::response::Response> {
        let mut builder = HttpRequest::builder().uri(path).method("GET");
        if let Some(value) = cookie_header {
            builder = builder.header("cookie", value);
        }
        Ok(router.oneshot(builder.body(Body::empty())?).await?)
    }

    #[tokio::test]
    async fn unauthenticated_admin_request_bounces_to_login() -> Result<()> {
        let state = test_state();
        let response = send(gated_router(state), "/admin", None).await?;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/login?redirect=%2Fadmin")
        );
        Ok(())
    }

    #[tokio::test]
    async fn under_privileged_user_bounces_to_own_dashboard_not_login() -> Result<()> {
        let state = test_state();
        let token = signed_token(&state, Role::User, Vec::new(), 3600)?;
        let cookie = format!("session_token={token}");

        let response = send(gated_router(state), "/admin", Some(&cookie)).await?;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/user/dashboard")
        );
        Ok(())
    }

    #[tokio::test]
    async fn public_paths_never_require_a_session() -> Result<()> {
        let state = test_state();
        for path in ["/", "/login", "/events/concert", "/api/auth/session"] {
            let response = send(
                gated_router(state.clone()),
                path,
                Some("session_token=complete-garbage"),
            )
            .await?;
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn unenumerated_paths_are_public() -> Result<()> {
        let state = test_state();
        let response = send(gated_router(state), "/about", None).await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_cookie_is_cleared_on_the_way_to_login() -> Result<()> {
        let state = test_state();
        let response = send(
            gated_router(state),
            "/admin",
            Some("session_token=not-a-real-token"),
        )
        .await?;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/login?redirect=%2Fadmin")
        );
        let cleared: Vec<&str> = response
            .headers()
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(cleared.len(), 2);
        assert!(cleared[0].starts_with("session_token=;"));
        assert!(cleared[1].starts_with("auth-token=;"));
        assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
        Ok(())
    }

    #[tokio::test]
    async fn expired_session_is_treated_as_invalid() -> Result<()> {
        let state = test_state();
        let token = signed_token(&state, Role::Admin, Vec::new(), -60)?;
        let cookie = format!("session_token={token}");

        let response = send(gated_router(state), "/admin", Some(&cookie)).await?;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/login?redirect=%2Fadmin")
        );
        Ok(())
    }

    #[tokio::test]
    async fn authorized_requests_are_forwarded_unchanged() -> Result<()> {
        let state = test_state();

        let admin = signed_token(&state, Role::Admin, Vec::new(), 3600)?;
        let response = send(
            gated_router(state.clone()),
            "/admin/reports",
            Some(&format!("session_token={admin}")),
        )
        .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let team = signed_token(&state, Role::User, vec![StaffRole::TeamMembers], 3600)?;
        let response = send(
            gated_router(state.clone()),
            "/team/scans",
            Some(&format!("session_token={team}")),
        )
        .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let user = signed_token(&state, Role::User, Vec::new(), 3600)?;
        let response = send(
            gated_router(state),
            "/user/dashboard",
            Some(&format!("session_token={user}")),
        )
        .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn staff_without_the_required_tag_goes_to_their_own_dashboard() -> Result<()> {
        let state = test_state();
        let associate = signed_token(&state, Role::User, vec![StaffRole::Associates], 3600)?;

        let response = send(
            gated_router(state),
            "/team/scans",
            Some(&format!("session_token={associate}")),
        )
        .await?;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/associate/dashboard")
        );
        Ok(())
    }
}
