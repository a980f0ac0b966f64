//! The PIN-protected admin panel: score entry, schedule times, team and
//! roster editing, POTW announcements, and settings.

pub mod players;
pub mod potw;
pub mod schedule;
pub mod scores;
pub mod settings;
pub mod teams;

use axum::response::Redirect;
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    util_resp::{StandardResponse, see_other_ok},
    widgets::alert::{ErrorAlert, SuccessAlert},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AdminTab {
    Scores,
    Schedule,
    Teams,
    Players,
    Potw,
    Settings,
}

const ADMIN_TABS: &[(AdminTab, &str, &str, &str)] = &[
    (AdminTab::Scores, "/admin/scores", "📝", "Scores"),
    (AdminTab::Schedule, "/admin/schedule", "📅", "Times"),
    (AdminTab::Teams, "/admin/teams", "👥", "Teams"),
    (AdminTab::Players, "/admin/players", "🏃", "Players"),
    (AdminTab::Potw, "/admin/potw", "⭐", "POTW"),
    (AdminTab::Settings, "/admin/settings", "⚙️", "Settings"),
];

/// Transient feedback carried across the post/redirect/get hop as
/// `?msg=` / `?err=` query parameters.
#[derive(Deserialize, Debug, Default)]
pub struct Feedback {
    pub msg: Option<String>,
    pub err: Option<String>,
}

/// Pill navigation and the feedback banners shared by every admin tab.
pub struct AdminShell<'a, R: Renderable> {
    pub active: AdminTab,
    pub feedback: &'a Feedback,
    pub children: R,
}

impl<R: Renderable> Renderable for AdminShell<'_, R> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="admin-tabs" {
                @for (tab, href, icon, label) in ADMIN_TABS {
                    @let class = if *tab == self.active {
                        "admin-tab active"
                    } else {
                        "admin-tab"
                    };
                    a class=(class) href=(*href) {
                        (*icon) " " (*label)
                    }
                }
            }
            @if let Some(msg) = &self.feedback.msg {
                SuccessAlert msg=(msg);
            }
            @if let Some(err) = &self.feedback.err {
                ErrorAlert msg=(err);
            }
            (self.children)
        }
        .render_to(buffer)
    }
}

/// Post/redirect/get with a success banner.
pub fn redirect_msg(path: &str, msg: &str) -> StandardResponse {
    let qs = serde_urlencoded::to_string([("msg", msg)]).unwrap();
    let sep = if path.contains('?') { '&' } else { '?' };
    see_other_ok(Redirect::to(&format!("{path}{sep}{qs}")))
}

/// Post/redirect/get with an error banner.
pub fn redirect_err(path: &str, err: &str) -> StandardResponse {
    let qs = serde_urlencoded::to_string([("err", err)]).unwrap();
    let sep = if path.contains('?') { '&' } else { '?' };
    see_other_ok(Redirect::to(&format!("{path}{sep}{qs}")))
}

pub async fn admin_index() -> Redirect {
    Redirect::to("/admin/scores")
}
