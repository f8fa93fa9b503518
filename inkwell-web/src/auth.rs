//! Identity extraction and the access enforcement boundary
//!
//! Handlers take a [`Guard`], load the resource, and call
//! [`Guard::authorize`] before acting. A denial is answered by
//! [`AccessDenied`]:
//!
//! - JSON callers get `403 {"status": 403, "message": ...}`
//! - anonymous callers asking for an action that needs a login are redirected
//!   to the login path with the requested path in `next`
//! - everyone else is sent back to the referring page with an `alert`, or gets
//!   the static forbidden page

use crate::{AppState, WebError};
use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::{header, request::Parts, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use inkwell_app::{Ability, Action, CurrentUser, Identity, Target, UserId};
use std::fmt;
use tracing::{debug, warn};
use url::Url;

/// Alert attached to the login redirect
pub const LOGIN_ALERT: &str = "Please log in to continue.";

/// Message used for every 403
pub const FORBIDDEN_MESSAGE: &str = "You are not allowed to access this resource.";

const FORBIDDEN_PAGE: &str = include_str!("../static/403.html");

/// The caller, resolved from the identity header
///
/// A missing or malformed header, or an id with no matching user, yields
/// [`Identity::Anonymous`]. The header is not verified here: deploy behind a
/// proxy that authenticates users and overwrites it on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let header_name = app_state.config.auth.identity_header.as_str();

        let Some(raw) = parts.headers.get(header_name) else {
            return Ok(CurrentIdentity(Identity::Anonymous));
        };

        let user_id = match raw.to_str().ok().and_then(|v| v.parse::<UserId>().ok()) {
            Some(user_id) => user_id,
            None => {
                debug!(header = header_name, "Malformed identity header, treating as anonymous");
                return Ok(CurrentIdentity(Identity::Anonymous));
            }
        };

        match app_state.posts.find_user(user_id).await? {
            Some(user) => Ok(CurrentIdentity(Identity::from_current_user(Some(
                &CurrentUser::from(&user),
            )))),
            None => {
                debug!(%user_id, "Unknown user in identity header, treating as anonymous");
                Ok(CurrentIdentity(Identity::Anonymous))
            }
        }
    }
}

/// Request details needed to answer a denial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenialContext {
    /// Path and query as the client sent them
    pub requested_path: String,
    pub wants_json: bool,
    pub referer: Option<String>,
    pub login_path: String,
}

impl DenialContext {
    pub fn from_parts(parts: &Parts, login_path: &str) -> Self {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(&parts.uri);
        let requested_path = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        let wants_json = parts
            .headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|accept| accept.contains("application/json"))
            .unwrap_or(false);

        let referer = parts
            .headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string);

        Self {
            requested_path,
            wants_json,
            referer,
            login_path: login_path.to_string(),
        }
    }
}

/// Per-request policy for the current caller
#[derive(Debug, Clone)]
pub struct Guard {
    ability: Ability,
    denial: DenialContext,
}

impl Guard {
    pub fn new(identity: Identity, denial: DenialContext) -> Self {
        Self {
            ability: Ability::new(identity),
            denial,
        }
    }

    pub fn ability(&self) -> &Ability {
        &self.ability
    }

    pub fn identity(&self) -> Identity {
        self.ability.identity()
    }

    /// Ask the policy; a denial carries everything needed to respond
    pub fn authorize<'a>(
        &self,
        action: Action,
        target: impl Into<Target<'a>>,
    ) -> Result<(), AccessDenied> {
        let target = target.into();
        if self.ability.can_perform(action, target) {
            return Ok(());
        }

        warn!(
            identity = %self.identity(),
            action = %action,
            kind = %target.kind(),
            path = %self.denial.requested_path,
            "Access denied"
        );
        Err(self.deny(action))
    }

    /// A denial of `action` for the current caller
    pub fn deny(&self, action: Action) -> AccessDenied {
        AccessDenied::new(self.identity(), action, self.denial.clone())
    }
}

impl<S> FromRequestParts<S> for Guard
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentIdentity(identity) = CurrentIdentity::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);
        let denial = DenialContext::from_parts(parts, &app_state.config.auth.login_path);
        Ok(Guard::new(identity, denial))
    }
}

/// How a denial is surfaced to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialResponse {
    Json,
    Login { location: String },
    Back { location: String },
    ForbiddenPage,
}

/// A negative policy decision
#[derive(Debug)]
pub struct AccessDenied {
    pub identity: Identity,
    pub action: Action,
    context: DenialContext,
}

impl AccessDenied {
    pub fn new(identity: Identity, action: Action, context: DenialContext) -> Self {
        Self {
            identity,
            action,
            context,
        }
    }

    pub fn response_kind(&self) -> DenialResponse {
        if self.context.wants_json {
            return DenialResponse::Json;
        }

        if self.identity.is_anonymous() && self.action.requires_authentication() {
            return DenialResponse::Login {
                location: login_location(&self.context.login_path, &self.context.requested_path),
            };
        }

        match self
            .context
            .referer
            .as_deref()
            .and_then(|referer| with_alert(referer, FORBIDDEN_MESSAGE))
        {
            Some(location) => DenialResponse::Back { location },
            None => DenialResponse::ForbiddenPage,
        }
    }
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} may not {} {}", self.identity, self.action, self.context.requested_path)
    }
}

impl std::error::Error for AccessDenied {}

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        match self.response_kind() {
            DenialResponse::Json => (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({
                    "status": 403,
                    "message": FORBIDDEN_MESSAGE,
                })),
            )
                .into_response(),
            DenialResponse::Login { location } | DenialResponse::Back { location } => {
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
            DenialResponse::ForbiddenPage => {
                (StatusCode::FORBIDDEN, Html(FORBIDDEN_PAGE)).into_response()
            }
        }
    }
}

fn login_location(login_path: &str, requested_path: &str) -> String {
    format!(
        "{}?next={}&alert={}",
        login_path,
        urlencoding::encode(requested_path),
        urlencoding::encode(LOGIN_ALERT)
    )
}

/// Append an `alert` query parameter to the referring URL.
/// Relative referers stay relative.
fn with_alert(referer: &str, alert: &str) -> Option<String> {
    if let Ok(mut url) = Url::parse(referer) {
        url.query_pairs_mut().append_pair("alert", alert);
        return Some(url.to_string());
    }

    let base = Url::parse("http://localhost/").ok()?;
    let mut url = base.join(referer).ok()?;
    url.query_pairs_mut().append_pair("alert", alert);
    Some(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn context(accept: Option<&str>, referer: Option<&str>) -> DenialContext {
        let mut builder = Request::builder().uri("/api/posts/7/edit?tab=collaborators");
        if let Some(accept) = accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        if let Some(referer) = referer {
            builder = builder.header(header::REFERER, referer);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        DenialContext::from_parts(&parts, "/users/sign_in")
    }

    #[test]
    fn reads_request_details() {
        let ctx = context(Some("application/json, text/plain"), Some("http://x.test/a"));
        assert_eq!(ctx.requested_path, "/api/posts/7/edit?tab=collaborators");
        assert!(ctx.wants_json);
        assert_eq!(ctx.referer.as_deref(), Some("http://x.test/a"));
    }

    #[test]
    fn anonymous_edit_is_sent_to_login_with_next() {
        let denied = AccessDenied::new(Identity::Anonymous, Action::Edit, context(None, None));
        assert_eq!(
            denied.response_kind(),
            DenialResponse::Login {
                location: "/users/sign_in?next=%2Fapi%2Fposts%2F7%2Fedit%3Ftab%3Dcollaborators\
                           &alert=Please%20log%20in%20to%20continue."
                    .to_string()
            }
        );
    }

    #[test]
    fn anonymous_show_is_forbidden_not_login() {
        let denied = AccessDenied::new(Identity::Anonymous, Action::Show, context(None, None));
        assert_eq!(denied.response_kind(), DenialResponse::ForbiddenPage);
    }

    #[test]
    fn json_callers_always_get_structured_403() {
        let denied = AccessDenied::new(
            Identity::Anonymous,
            Action::Destroy,
            context(Some("application/json"), Some("http://x.test/a")),
        );
        assert_eq!(denied.response_kind(), DenialResponse::Json);
    }

    #[test]
    fn signed_in_callers_go_back_with_alert() {
        let denied = AccessDenied::new(
            Identity::User(UserId(3)),
            Action::Destroy,
            context(None, Some("http://x.test/posts?page=2")),
        );
        assert_eq!(
            denied.response_kind(),
            DenialResponse::Back {
                location: "http://x.test/posts?page=2&alert=You+are+not+allowed+to+access+this+resource."
                    .to_string()
            }
        );
    }

    #[test]
    fn relative_referer_stays_relative() {
        assert_eq!(
            with_alert("/posts", "Nope").as_deref(),
            Some("/posts?alert=Nope")
        );
    }

    #[test]
    fn signed_in_callers_without_referer_get_forbidden_page() {
        let denied = AccessDenied::new(
            Identity::User(UserId(3)),
            Action::Update,
            context(None, None),
        );
        assert_eq!(denied.response_kind(), DenialResponse::ForbiddenPage);
        assert_eq!(denied.into_response().status(), StatusCode::FORBIDDEN);
    }
}
