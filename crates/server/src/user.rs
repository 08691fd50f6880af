//! Per-browser user identity.
//!
//! Every request passes through [`ensure_user_id`], which reads the
//! `hypercontacts_uid` cookie and issues a fresh UUID when it is missing or
//! malformed. Handlers take the resolved id with the [`UserId`] extractor.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_COOKIE: &str = "hypercontacts_uid";

/// Identity of the browser making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn cookie_user(jar: &CookieJar) -> Option<UserId> {
    let value = jar.get(USER_COOKIE)?.value();
    Uuid::parse_str(value).ok().map(|uuid| UserId(uuid.to_string()))
}

/// Middleware that guarantees a [`UserId`] in the request extensions.
pub async fn ensure_user_id(jar: CookieJar, mut req: Request, next: Next) -> Response {
    if let Some(user) = cookie_user(&jar) {
        req.extensions_mut().insert(user);
        return next.run(req).await;
    }

    let user = UserId(Uuid::new_v4().to_string());
    tracing::debug!(user_id = %user, "Issued user cookie");
    let cookie = Cookie::build((USER_COOKIE, user.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    req.extensions_mut().insert(user);
    let response = next.run(req).await;
    (jar.add(cookie), response).into_response()
}

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserId>()
            .cloned()
            .ok_or_else(|| ApiError::Internal("user id middleware is not installed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(|user: UserId| async move { user.0 }))
            .layer(axum::middleware::from_fn(ensure_user_id))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_issues_cookie_when_missing() {
        let response = app()
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.starts_with("hypercontacts_uid="));
        assert!(set_cookie.contains("HttpOnly"));
        let user = body_string(response).await;
        assert!(set_cookie.contains(&user));
        assert!(Uuid::parse_str(&user).is_ok());
    }

    #[tokio::test]
    async fn test_keeps_valid_cookie() {
        let id = Uuid::new_v4().to_string();
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(header::COOKIE, format!("{USER_COOKIE}={id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body_string(response).await, id);
    }

    #[tokio::test]
    async fn test_replaces_malformed_cookie() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(header::COOKIE, format!("{USER_COOKIE}=not-a-uuid"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().contains_key(header::SET_COOKIE));
        assert_ne!(body_string(response).await, "not-a-uuid");
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_is_500() {
        let app = Router::new().route("/whoami", get(|user: UserId| async move { user.0 }));
        let response = app
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
