use axum::response::Redirect;
use axum_extra::extract::{Form, PrivateCookieJar, Query};
use hypertext::prelude::*;
use serde::Deserialize;
use url::Url;

use crate::{
    auth::{Viewer, clear_admin_cookie, set_admin_cookie},
    league::settings::{self, LeagueConfig},
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, SuccessResponse},
    widgets::alert::ErrorAlert,
};

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

/// Clamps the post-login destination to a same-site path. Anything that
/// does not look like one falls back to the admin panel.
fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => {
            next.to_string()
        }
        Some(next) => next
            .parse::<Url>()
            .ok()
            .map(|url| {
                let mut path = url.path().to_string();
                if let Some(query) = url.query() {
                    path.push('?');
                    path.push_str(query);
                }
                path
            })
            .unwrap_or_else(|| "/admin/scores".to_string()),
        None => "/admin/scores".to_string(),
    }
}

fn login_form(
    viewer: &Viewer,
    config: LeagueConfig,
    next: Option<&str>,
    error: Option<&str>,
) -> Rendered<String> {
    let action = match next {
        Some(next) => format!(
            "/admin/login?{}",
            serde_urlencoded::to_string([("next", next)]).unwrap()
        ),
        None => "/admin/login".to_string(),
    };

    Page::new()
        .viewer(viewer)
        .config(config)
        .body(maud! {
            h1 { "Admin access" }
            @if let Some(error) = error {
                ErrorAlert msg=(error);
            }
            div class="card" {
                form method="post" action=(action) {
                    label for="pin" { "Admin PIN" }
                    input type="password" id="pin" name="pin"
                          inputmode="numeric" autocomplete="current-password"
                          placeholder="Enter PIN" required;
                    button type="submit" class="button" { "Unlock" }
                }
            }
        })
        .render()
}

#[tracing::instrument(skip(viewer, conn))]
pub async fn login_page(
    viewer: Viewer,
    Query(query): Query<NextQuery>,
    mut conn: Conn<true>,
) -> StandardResponse {
    if viewer.admin {
        return Ok(SuccessResponse::SeeOther(Box::new(Redirect::to(
            &safe_next(query.next.as_deref()),
        ))));
    }

    let config = settings::LeagueConfig::load(&mut *conn);
    Ok(SuccessResponse::Success(login_form(
        &viewer,
        config,
        query.next.as_deref(),
        None,
    )))
}

#[derive(Deserialize)]
pub struct LoginForm {
    pin: String,
}

#[tracing::instrument(skip(viewer, conn, jar, form))]
pub async fn do_admin_login(
    viewer: Viewer,
    Query(query): Query<NextQuery>,
    mut conn: Conn<true>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(PrivateCookieJar, SuccessResponse), FailureResponse> {
    if !settings::verify_admin_pin(&form.pin, &mut *conn) {
        tracing::info!("rejected admin login attempt");
        let config = settings::LeagueConfig::load(&mut *conn);
        return Err(FailureResponse::BadRequest(login_form(
            &viewer,
            config,
            query.next.as_deref(),
            Some("Incorrect PIN"),
        )));
    }

    let jar = set_admin_cookie(jar);

    Ok((
        jar,
        SuccessResponse::SeeOther(Box::new(Redirect::to(&safe_next(
            query.next.as_deref(),
        )))),
    ))
}

pub async fn do_admin_logout(
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    (clear_admin_cookie(jar), Redirect::to("/"))
}

#[cfg(test)]
mod test {
    use super::safe_next;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(None), "/admin/scores");
        assert_eq!(safe_next(Some("/admin/potw")), "/admin/potw");
        assert_eq!(
            safe_next(Some("/admin/scores?week=3")),
            "/admin/scores?week=3"
        );
        assert_eq!(
            safe_next(Some("https://evil.example/phish?x=1")),
            "/phish?x=1"
        );
        assert_eq!(safe_next(Some("//evil.example/phish")), "/admin/scores");
        assert_eq!(safe_next(Some("garbage")), "/admin/scores");
    }
}
