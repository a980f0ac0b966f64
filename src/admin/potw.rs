use axum::Extension;
use axum_extra::extract::{Form, Query};
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    admin::{AdminShell, AdminTab, Feedback, redirect_err, redirect_msg},
    auth::{Admin, Viewer},
    league::{
        games::Game,
        players::Player,
        potw::{PotwVote, PotwWinner, VoteWeekQuery, default_vote_week, tally},
        settings::LeagueConfig,
    },
    msg::{Msg, MsgQueue},
    state::Conn,
    template::{Page, Tab},
    util_resp::{StandardResponse, success},
};

#[tracing::instrument(skip(viewer, conn))]
pub async fn potw_tab(
    _admin: Admin,
    viewer: Viewer,
    Query(query): Query<VoteWeekQuery>,
    Query(feedback): Query<Feedback>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);
    let week = config.clamp_week(query.week.unwrap_or_else(|| {
        default_vote_week(&config, &Game::all(&mut *conn))
    }));

    let players = Player::all(&mut *conn);
    let votes = PotwVote::for_week(week, &mut *conn);
    let winner = PotwWinner::for_week(week, &mut *conn);
    let counts = tally(&votes);

    success(
        Page::new()
            .viewer(&viewer)
            .config(config.clone())
            .active(Tab::Admin)
            .body(maud! {
                h1 { "Player of the Week" }
                AdminShell
                    active=(AdminTab::Potw)
                    feedback=(&feedback) {
                    div class="week-pills" {
                        @for pill_week in 1..=config.total_weeks {
                            @let class = if pill_week == week {
                                "week-pill active"
                            } else {
                                "week-pill"
                            };
                            a class=(class)
                              href=(format!(
                                  "/admin/potw?week={pill_week}"
                              )) {
                                "Wk " (pill_week)
                            }
                        }
                    }

                    @if let Some((winner, player)) = &winner {
                        div class="winner-banner" {
                            "✓ Winner: " (player.name)
                            @if let Some(note) = &winner.announcement {
                                div class="week-hint" { (note) }
                            }
                        }
                    }

                    @if counts.is_empty() {
                        div class="empty-state" {
                            "No votes yet for Week " (week)
                        }
                    }
                    @for (player_id, count) in &counts {
                        @let name = players
                            .iter()
                            .find(|p| p.id == *player_id)
                            .map(|p| p.name.as_str())
                            .unwrap_or("Unknown");
                        div class="card tally-row" {
                            span { (name) }
                            span { (count) " votes" }
                            form method="post"
                                 action="/admin/potw/winner"
                                 class="inline-form"
                                 onsubmit="return confirm('Announce this player as the winner?');" {
                                input type="text" hidden name="week"
                                      value=(week);
                                input type="text" hidden name="player_id"
                                      value=(player_id);
                                input type="text" name="announcement"
                                      class="input"
                                      placeholder="Announcement note (optional)";
                                button type="submit" class="button" {
                                    "👑 Make winner"
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
pub struct WinnerForm {
    week: i64,
    player_id: i64,
    #[serde(default)]
    announcement: String,
}

#[tracing::instrument(skip(conn, queue, form))]
pub async fn announce_winner(
    _admin: Admin,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
    Form(form): Form<WinnerForm>,
) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);
    if !(1..=config.total_weeks).contains(&form.week) {
        tracing::warn!(week = form.week, "refused winner for unknown week");
        return redirect_err(
            "/admin/potw",
            "That week is not part of the season",
        );
    }

    let player = Player::fetch(form.player_id, &mut *conn)?;

    let note = match form.announcement.trim() {
        "" => None,
        note => Some(note),
    };
    PotwWinner::announce(form.week, player.id, note, &mut *conn);

    tracing::info!(week = form.week, name = player.name, "POTW announced");
    queue.push(Msg::WinnerAnnounced { week: form.week });

    redirect_msg(
        &format!("/admin/potw?week={}", form.week),
        "POTW announced!",
    )
}
