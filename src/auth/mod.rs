use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request},
    http::{
        HeaderMap, StatusCode,
        header::{REFERER, USER_AGENT},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    CookieJar, PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use chrono::{Days, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub mod login;

/// Admin sessions ride in this private cookie. There is a single admin
/// role, so the payload is just an expiry.
pub const ADMIN_COOKIE: &str = "nothing_but_net";

/// Anonymous visitor id, generated on first visit. Reactions, RSVPs and
/// votes all key on it.
pub const VISITOR_COOKIE: &str = "courtside_visitor";

pub const THEME_COOKIE: &str = "courtside_theme";
pub const INSTALL_COOKIE: &str = "courtside_install_dismissed";

#[derive(Debug)]
pub enum AuthError {
    CookieMissingOrMalformed,
    /// Not signed in as admin; redirects to the login page, which will
    /// come back to `next` after a successful login.
    Unauthorized { next: String },
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::CookieMissingOrMalformed => {
                (StatusCode::UNAUTHORIZED, "Cookie missing or malformed")
                    .into_response()
            }
            AuthError::Unauthorized { next } => {
                let query =
                    serde_urlencoded::to_string([("next", next)]).unwrap();
                Redirect::to(&format!("/admin/login?{query}")).into_response()
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct AdminSession {
    expiry: NaiveDateTime,
}

/// Request guard for the admin panel.
#[derive(Debug)]
pub struct Admin;

#[async_trait]
impl<S> FromRequestParts<S> for Admin
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> =
            PrivateCookieJar::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::CookieMissingOrMalformed)?;

        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/admin/scores".to_string());

        let cookie = match jar.get(ADMIN_COOKIE) {
            Some(cookie) => cookie,
            None => return Err(AuthError::Unauthorized { next }),
        };

        match serde_json::from_str::<AdminSession>(cookie.value()) {
            Ok(session) if Utc::now().naive_utc() < session.expiry => Ok(Admin),
            _ => Err(AuthError::Unauthorized { next }),
        }
    }
}

pub fn set_admin_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((
            ADMIN_COOKIE,
            serde_json::to_string(&AdminSession {
                expiry: Utc::now()
                    .naive_utc()
                    .checked_add_days(Days::new(7))
                    .unwrap(),
            })
            .unwrap(),
        ))
        .path("/")
        .same_site(SameSite::Lax),
    )
}

pub fn clear_admin_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(ADMIN_COOKIE).path("/"))
}

/// Guarantees every request carries a visitor id cookie. Handlers read
/// the id through the [`Viewer`] extractor.
pub async fn ensure_visitor(
    jar: PrivateCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match jar.get(VISITOR_COOKIE) {
        Some(cookie) => {
            req.extensions_mut()
                .insert(VisitorId(cookie.value().to_string()));
            next.run(req).await
        }
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            req.extensions_mut().insert(VisitorId(id.clone()));

            let jar = jar.add(
                Cookie::build((VISITOR_COOKIE, id))
                    .path("/")
                    .same_site(SameSite::Lax)
                    .permanent(),
            );

            (jar, next.run(req).await).into_response()
        }
    }
}

#[derive(Clone, Debug)]
struct VisitorId(String);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Everything the page chrome needs to know about the requester: their
/// visitor id, theme, whether they dismissed the install banner, and
/// whether they hold an admin session.
#[derive(Clone, Debug)]
pub struct Viewer {
    pub id: String,
    pub theme: Theme,
    pub admin: bool,
    pub install_dismissed: bool,
    pub ios: bool,
}

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<VisitorId>()
            .ok_or(AuthError::CookieMissingOrMalformed)?
            .0
            .clone();

        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::CookieMissingOrMalformed)?;

        let theme = match jar.get(THEME_COOKIE).map(|c| c.value()) {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        };
        let install_dismissed = jar.get(INSTALL_COOKIE).is_some();

        let admin = Admin::from_request_parts(parts, state).await.is_ok();

        let ios = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ua| ua.contains("iPhone") || ua.contains("iPad"));

        Ok(Viewer {
            id,
            theme,
            admin,
            install_dismissed,
            ios,
        })
    }
}

/// Pulls the path (and query) out of the Referer header so that cookie
/// toggles can bounce straight back. Only the path is kept, never the
/// host, so the redirect cannot leave the site.
fn back_path(headers: &HeaderMap) -> String {
    headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<Url>().ok())
        .map(|url| {
            let mut path = url.path().to_string();
            if let Some(query) = url.query() {
                path.push('?');
                path.push_str(query);
            }
            path
        })
        .unwrap_or_else(|| "/".to_string())
}

pub async fn toggle_theme(
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let flipped = match jar.get(THEME_COOKIE).map(|c| c.value()) {
        Some("dark") => "light",
        _ => "dark",
    };

    let jar = jar.add(
        Cookie::build((THEME_COOKIE, flipped))
            .path("/")
            .same_site(SameSite::Lax)
            .permanent(),
    );

    (jar, Redirect::to(&back_path(&headers)))
}

pub async fn dismiss_install_banner(
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let jar = jar.add(
        Cookie::build((INSTALL_COOKIE, "1"))
            .path("/")
            .same_site(SameSite::Lax)
            .permanent(),
    );

    (jar, Redirect::to(&back_path(&headers)))
}
