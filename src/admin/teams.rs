use axum::{Extension, extract::Path};
use axum_extra::extract::{Form, Query};
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    admin::{AdminShell, AdminTab, Feedback, redirect_err, redirect_msg},
    auth::{Admin, Viewer},
    league::{players::Player, settings::LeagueConfig, teams::Team},
    msg::{Msg, MsgQueue},
    schema::{games, teams},
    state::Conn,
    template::{Page, Tab},
    util_resp::{StandardResponse, success},
    validation::{is_valid_hex_color, is_valid_short_code},
};

#[tracing::instrument(skip(viewer, conn))]
pub async fn teams_tab(
    _admin: Admin,
    viewer: Viewer,
    Query(feedback): Query<Feedback>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);
    let teams = Team::all(&mut *conn);
    let players = Player::all(&mut *conn);

    success(
        Page::new()
            .viewer(&viewer)
            .config(config)
            .active(Tab::Admin)
            .body(maud! {
                h1 { "Edit Teams" }
                AdminShell
                    active=(AdminTab::Teams)
                    feedback=(&feedback) {
                    @if teams.is_empty() {
                        div class="empty-state" {
                            "No teams yet. Run the seed tool or add data."
                        }
                    }
                    @for team in &teams {
                        @let count = players
                            .iter()
                            .filter(|p| p.team_id == Some(team.id))
                            .count();
                        details class="card" {
                            summary {
                                span class="dot"
                                     style=(format!(
                                         "background:{}", team.color
                                     )) {}
                                " " (team.name) " "
                                span class="week-hint" {
                                    "(" (count) " players)"
                                }
                            }
                            form method="post"
                                 action=(format!(
                                     "/admin/teams/{}", team.id
                                 )) {
                                label {
                                    "Name"
                                    input type="text" name="name"
                                          class="input" required
                                          value=(team.name);
                                }
                                label {
                                    "Short code (3 letters)"
                                    input type="text" name="short_name"
                                          class="input" maxlength="3"
                                          required
                                          value=(team.short_name);
                                }
                                label {
                                    "Accent color"
                                    div class="field-row" {
                                        input type="color"
                                              value=(team.color)
                                              oninput="this.nextElementSibling.value = this.value";
                                        input type="text" name="color"
                                              class="input"
                                              value=(team.color);
                                    }
                                }
                                label {
                                    "Motto"
                                    input type="text" name="motto"
                                          class="input"
                                          value=(team
                                              .motto
                                              .as_deref()
                                              .unwrap_or(""));
                                }
                                button type="submit" class="button" {
                                    "Save"
                                }
                            }
                        }
                    }
                }
            })
            .render(),
    )
}

#[derive(Deserialize)]
pub struct TeamForm {
    name: String,
    short_name: String,
    color: String,
    #[serde(default)]
    motto: String,
}

#[tracing::instrument(skip(conn, queue, form))]
pub async fn save_team(
    _admin: Admin,
    Path(team_id): Path<i64>,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
    Form(form): Form<TeamForm>,
) -> StandardResponse {
    let team = Team::fetch(team_id, &mut *conn)?;

    let name = form.name.trim().to_string();
    if name.is_empty() {
        return redirect_err("/admin/teams", "Team name is required");
    }

    let short_name = form.short_name.trim().to_uppercase();
    if let Err(why) = is_valid_short_code(&short_name) {
        return redirect_err("/admin/teams", &why);
    }

    let color = form.color.trim().to_string();
    if let Err(why) = is_valid_hex_color(&color) {
        return redirect_err("/admin/teams", &why);
    }

    let motto = match form.motto.trim() {
        "" => None,
        motto => Some(motto.to_string()),
    };

    let n = diesel::update(teams::table.filter(teams::id.eq(team.id)))
        .set((
            teams::name.eq(&name),
            teams::short_name.eq(&short_name),
            teams::color.eq(&color),
            teams::motto.eq(&motto),
        ))
        .execute(&mut *conn)
        .unwrap();
    assert_eq!(n, 1);

    // games carry denormalized team names
    diesel::update(games::table.filter(games::home_team_id.eq(team.id)))
        .set(games::home_team.eq(&name))
        .execute(&mut *conn)
        .unwrap();
    diesel::update(games::table.filter(games::away_team_id.eq(team.id)))
        .set(games::away_team.eq(&name))
        .execute(&mut *conn)
        .unwrap();

    tracing::info!(team_id, name, "team updated");
    queue.push(Msg::TeamsChanged);

    redirect_msg("/admin/teams", "Team updated!")
}
