//! Templating code.
//!
//! This defines the [`Page`] item, which wraps every full page in the
//! shared chrome (header, install banner, bottom navigation).

use hypertext::prelude::*;

use crate::{
    auth::{Theme, Viewer},
    league::settings::LeagueConfig,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tab {
    Games,
    Standings,
    Teams,
    Vote,
    Recap,
    Admin,
}

const NAV_TABS: &[(Tab, &str, &str, &str)] = &[
    (Tab::Games, "/", "🏀", "Games"),
    (Tab::Standings, "/standings", "📊", "Standings"),
    (Tab::Teams, "/teams", "👥", "Teams"),
    (Tab::Vote, "/vote", "⭐", "Vote"),
    (Tab::Recap, "/recap", "🎬", "Recap"),
];

pub struct Page<R1: Renderable, R2: Renderable> {
    body: Option<R1>,
    extra_head: Option<R2>,
    viewer: Option<Viewer>,
    config: Option<LeagueConfig>,
    active: Option<Tab>,
}

// unfortunate generic argument shenanigans
impl<R1: Renderable> Page<R1, String> {
    pub fn new() -> Self {
        Default::default()
    }
}

impl<R1: Renderable, R2: Renderable> Page<R1, R2> {
    pub fn new_full() -> Self {
        Default::default()
    }
}

impl<R1: Renderable, R2: Renderable> Page<R1, R2> {
    pub fn body(mut self, body: R1) -> Self {
        self.body = Some(body);
        self
    }

    pub fn extra_head(mut self, content: R2) -> Page<R1, R2> {
        self.extra_head = Some(content);
        self
    }

    pub fn viewer(mut self, viewer: &Viewer) -> Self {
        self.viewer = Some(viewer.clone());
        self
    }

    pub fn config(mut self, config: LeagueConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn active(mut self, tab: Tab) -> Self {
        self.active = Some(tab);
        self
    }
}

impl<R1: Renderable, R2: Renderable> Renderable for Page<R1, R2> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let config = self.config.clone().unwrap_or_default();
        let dark = self
            .viewer
            .as_ref()
            .is_some_and(|viewer| viewer.theme == Theme::Dark);
        let is_admin = self
            .viewer
            .as_ref()
            .is_some_and(|viewer| viewer.admin);
        let show_banner = self
            .viewer
            .as_ref()
            .is_some_and(|viewer| !viewer.install_dismissed);
        let ios = self.viewer.as_ref().is_some_and(|viewer| viewer.ios);

        maud! {
            html class=(if dark { "dark" } else { "" }) {
                head {
                    title { (config.abbrv) }
                    script src="https://cdn.jsdelivr.net/npm/htmx.org@2.0.7/dist/htmx.min.js" integrity="sha384-ZBXiYtYQ6hJ2Y0ZNoYuI+Nq5MqWBr+chMrS/RkXpNzQCApHEhOt2aY8EJgqwHLkJ" crossorigin="anonymous" {
                    }
                    script src="https://cdn.jsdelivr.net/npm/htmx-ext-ws@2.0.3/dist/ws.min.js" {
                    }
                    script src="https://cdn.jsdelivr.net/npm/morphdom@2.7.4/dist/morphdom-umd.min.js" {
                    }
                    script src="https://cdn.jsdelivr.net/npm/htmx-ext-morphdom-swap@2.0.1/dist/morphdom-swap.min.js" {
                    }
                    style {
                        (include_str!("../../assets/style.css"))
                    }
                    meta
                        name="viewport"
                        content="width=device-width, initial-scale=1";
                    meta name="theme-color" content="#1e3a5f";
                    link rel="manifest" href="/manifest.json";
                    @if let Some(extra) = &self.extra_head {
                        (extra)
                    }
                }
                body {
                    header class="topbar" {
                        a class="brand" href="/" { (config.abbrv) }
                        div class="topbar-controls" {
                            form method="post" action="/theme" {
                                button type="submit" class="icon-button"
                                       aria-label="Toggle dark mode" {
                                    @if dark { "☀️" } @else { "🌙" }
                                }
                            }
                            @if is_admin {
                                a class="icon-button" href="/admin/scores"
                                  aria-label="Admin panel" { "🔐" }
                            } @else {
                                a class="icon-button" href="/admin/login"
                                  aria-label="Admin login" { "🔓" }
                            }
                        }
                    }
                    main class="content" {
                        @if let Some(body) = &self.body {
                            (body)
                        }
                    }
                    @if show_banner {
                        div class="install-banner" {
                            @if ios {
                                span {
                                    "Get the full-screen app: tap "
                                    b { "Share" }
                                    " then "
                                    b { "Add to Home Screen" }
                                    "."
                                }
                            } @else {
                                span {
                                    "Add this app to your home screen for quick access."
                                }
                            }
                            form method="post" action="/install/dismiss" {
                                button type="submit" class="banner-dismiss"
                                       aria-label="Dismiss" { "✕" }
                            }
                        }
                    }
                    nav class="bottom-nav" {
                        @for (tab, href, icon, label) in NAV_TABS {
                            a class=(if self.active == Some(*tab) { "nav-item active" } else { "nav-item" })
                              href=(href) {
                                span class="nav-icon" { (icon) }
                                span class="nav-label" { (label) }
                            }
                        }
                        @if is_admin {
                            a class=(if self.active == Some(Tab::Admin) { "nav-item active" } else { "nav-item" })
                              href="/admin/scores" {
                                span class="nav-icon" { "🔧" }
                                span class="nav-label" { "Admin" }
                            }
                        }
                    }
                }
            }
        }
        .render_to(buffer)
    }
}

impl<R1: Renderable, R2: Renderable> Default for Page<R1, R2> {
    fn default() -> Self {
        Self {
            body: Default::default(),
            extra_head: Default::default(),
            viewer: Default::default(),
            config: Default::default(),
            active: Default::default(),
        }
    }
}
