use axum_extra::extract::{Form, Query};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    admin::{AdminShell, AdminTab, Feedback, redirect_err, redirect_msg},
    auth::{Admin, Viewer},
    league::settings::{
        self, LeagueConfig, set_admin_pin, verify_admin_pin,
    },
    schema::{games, players, teams},
    state::Conn,
    template::{Page, Tab},
    util_resp::{StandardResponse, bad_request, success},
    validation::is_valid_pin,
    widgets::alert::ErrorAlert,
};

struct QuickStats {
    teams: i64,
    players: i64,
    games: i64,
    completed: i64,
}

impl QuickStats {
    fn load(conn: &mut impl LoadConnection<Backend = Sqlite>) -> QuickStats {
        QuickStats {
            teams: teams::table
                .count()
                .get_result::<i64>(&mut *conn)
                .unwrap(),
            players: players::table
                .count()
                .get_result::<i64>(&mut *conn)
                .unwrap(),
            games: games::table
                .count()
                .get_result::<i64>(&mut *conn)
                .unwrap(),
            completed: games::table
                .filter(games::is_complete.eq(true))
                .count()
                .get_result::<i64>(&mut *conn)
                .unwrap(),
        }
    }
}

/// The settings tab body. The league TOML is passed through so a failed
/// save can re-render with the admin's text intact.
struct SettingsView<'a> {
    voting: bool,
    league_toml: &'a str,
    stats: &'a QuickStats,
}

impl Renderable for SettingsView<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="card" {
                h2 { "Change PIN" }
                form method="post" action="/admin/settings/pin" {
                    label {
                        "Current PIN"
                        input type="password" name="current_pin"
                              class="input" inputmode="numeric" required;
                    }
                    label {
                        "New PIN"
                        input type="password" name="new_pin"
                              class="input" inputmode="numeric" required;
                    }
                    label {
                        "New PIN (again)"
                        input type="password" name="confirm_pin"
                              class="input" inputmode="numeric" required;
                    }
                    button type="submit" class="button" { "Change PIN" }
                }
            }

            div class="card" {
                h2 { "Voting" }
                p {
                    @if self.voting {
                        "Player of the Week voting is "
                        b { "open" } "."
                    } @else {
                        "Player of the Week voting is "
                        b { "closed" } "."
                    }
                }
                form method="post" action="/admin/settings/voting" {
                    button type="submit" class="button" {
                        @if self.voting {
                            "Disable voting"
                        } @else {
                            "Enable voting"
                        }
                    }
                }
            }

            div class="card" {
                h2 { "League" }
                form method="post" action="/admin/settings/league" {
                    textarea name="config" class="textarea" rows="6" {
                        (self.league_toml)
                    }
                    button type="submit" class="button" { "Save" }
                }
            }

            div class="card" {
                h2 { "Quick Stats" }
                div class="stat-grid" {
                    div class="stat-card" {
                        div class="stat-value" { (self.stats.teams) }
                        div class="stat-label" { "Teams" }
                    }
                    div class="stat-card" {
                        div class="stat-value" { (self.stats.players) }
                        div class="stat-label" { "Players" }
                    }
                    div class="stat-card" {
                        div class="stat-value" { (self.stats.games) }
                        div class="stat-label" { "Games" }
                    }
                    div class="stat-card" {
                        div class="stat-value" { (self.stats.completed) }
                        div class="stat-label" { "Completed" }
                    }
                }
            }

            p class="week-hint" {
                "courtside v" (env!("CARGO_PKG_VERSION"))
            }
        }
        .render_to(buffer)
    }
}

#[tracing::instrument(skip(viewer, conn))]
pub async fn settings_tab(
    _admin: Admin,
    viewer: Viewer,
    Query(feedback): Query<Feedback>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);
    let voting = settings::voting_enabled(&mut *conn);
    let league_toml = toml::to_string(&config).unwrap();
    let stats = QuickStats::load(&mut *conn);

    success(
        Page::new()
            .viewer(&viewer)
            .config(config)
            .active(Tab::Admin)
            .body(maud! {
                h1 { "Settings" }
                AdminShell
                    active=(AdminTab::Settings)
                    feedback=(&feedback) {
                    SettingsView
                        voting=(voting)
                        league_toml=(&league_toml)
                        stats=(&stats);
                }
            })
            .render(),
    )
}

#[derive(Deserialize)]
pub struct PinForm {
    current_pin: String,
    new_pin: String,
    confirm_pin: String,
}

#[tracing::instrument(skip_all)]
pub async fn change_pin(
    _admin: Admin,
    mut conn: Conn<true>,
    Form(form): Form<PinForm>,
) -> StandardResponse {
    if !verify_admin_pin(&form.current_pin, &mut *conn) {
        tracing::warn!("refused PIN change: current PIN mismatch");
        return redirect_err("/admin/settings", "Current PIN is incorrect");
    }

    if let Err(why) = is_valid_pin(&form.new_pin) {
        tracing::warn!("refused PIN change: invalid new PIN");
        return redirect_err("/admin/settings", &why);
    }

    if form.new_pin != form.confirm_pin {
        return redirect_err("/admin/settings", "New PINs do not match");
    }

    set_admin_pin(&form.new_pin, &mut *conn);
    tracing::info!("admin PIN changed");

    redirect_msg("/admin/settings", "PIN changed successfully!")
}

#[tracing::instrument(skip_all)]
pub async fn toggle_voting(
    _admin: Admin,
    mut conn: Conn<true>,
) -> StandardResponse {
    let enabled = !settings::voting_enabled(&mut *conn);
    settings::set_voting_enabled(enabled, &mut *conn);
    tracing::info!(enabled, "voting toggled");

    redirect_msg(
        "/admin/settings",
        if enabled {
            "Voting enabled!"
        } else {
            "Voting disabled!"
        },
    )
}

#[derive(Deserialize)]
pub struct LeagueForm {
    config: String,
}

#[tracing::instrument(skip(viewer, conn, form))]
pub async fn save_league_config(
    _admin: Admin,
    viewer: Viewer,
    mut conn: Conn<true>,
    Form(form): Form<LeagueForm>,
) -> StandardResponse {
    let current = LeagueConfig::load(&mut *conn);

    let parsed: Result<LeagueConfig, String> =
        toml::from_str::<LeagueConfig>(&form.config)
            .map_err(|e| e.to_string())
            .and_then(|config| {
                config.validate()?;
                Ok(config)
            });

    let new_config = match parsed {
        Ok(config) => config,
        Err(why) => {
            tracing::warn!(why, "refused league config");
            let voting = settings::voting_enabled(&mut *conn);
            let stats = QuickStats::load(&mut *conn);
            return bad_request(
                Page::new()
                    .viewer(&viewer)
                    .config(current)
                    .active(Tab::Admin)
                    .body(maud! {
                        h1 { "Settings" }
                        AdminShell
                            active=(AdminTab::Settings)
                            feedback=(&Feedback::default()) {
                            ErrorAlert msg=(&why);
                            SettingsView
                                voting=(voting)
                                league_toml=(&form.config)
                                stats=(&stats);
                        }
                    })
                    .render(),
            );
        }
    };

    new_config.store(&mut *conn);
    tracing::info!(name = new_config.name, "league config saved");

    redirect_msg("/admin/settings", "League settings saved!")
}
