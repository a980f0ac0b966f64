use axum::{Extension, extract::Path};
use axum_extra::extract::{Form, Query};
use chrono::NaiveDate;
use diesel::prelude::*;
use hypertext::prelude::*;
use itertools::Itertools;
use serde::Deserialize;

use crate::{
    admin::{AdminShell, AdminTab, Feedback, redirect_err, redirect_msg},
    auth::{Admin, Viewer},
    league::{games::Game, settings::LeagueConfig},
    msg::{Msg, MsgQueue},
    schema::games,
    state::Conn,
    template::{Page, Tab},
    util_resp::{StandardResponse, success},
    validation::is_valid_game_time,
};

#[tracing::instrument(skip(viewer, conn))]
pub async fn schedule_tab(
    _admin: Admin,
    viewer: Viewer,
    Query(feedback): Query<Feedback>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);
    let all = Game::all(&mut *conn);
    let grouped = all.iter().chunk_by(|g| g.week);
    let by_week = grouped
        .into_iter()
        .map(|(week, games)| (week, games.collect::<Vec<_>>()))
        .collect::<Vec<_>>();

    success(
        Page::new()
            .viewer(&viewer)
            .config(config.clone())
            .active(Tab::Admin)
            .body(maud! {
                h1 { "Game Times" }
                AdminShell
                    active=(AdminTab::Schedule)
                    feedback=(&feedback) {
                    div class="week-hint" {
                        "Changes push live to any open schedule pages."
                    }
                    @if by_week.is_empty() {
                        div class="empty-state" {
                            "No games scheduled yet."
                        }
                    }
                    @for (week, games) in &by_week {
                        h2 { (config.week_header(*week)) }
                        @for game in games {
                            TimeCard game=(*game);
                        }
                    }
                }
            })
            .render(),
    )
}

struct TimeCard<'a> {
    game: &'a Game,
}

impl Renderable for TimeCard<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let game = self.game;
        let date = game
            .game_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        maud! {
            details class="card" {
                summary {
                    (game.home_team) " vs " (game.away_team)
                    " "
                    span class="week-hint" {
                        (game.game_time) " • Court " (game.court)
                    }
                }
                form method="post"
                     action=(format!("/admin/games/{}/schedule", game.id)) {
                    label {
                        "Date (optional)"
                        input type="date" name="game_date" class="input"
                              value=(date);
                    }
                    label {
                        "Tip-off time"
                        input type="text" name="game_time" class="input"
                              placeholder="6:00 PM" required
                              value=(game.game_time);
                    }
                    label {
                        "Court"
                        input type="number" name="court" class="input"
                              min="1" required value=(game.court);
                    }
                    button type="submit" class="button" { "Save" }
                }
            }
        }
        .render_to(buffer)
    }
}

#[derive(Deserialize)]
pub struct ScheduleForm {
    #[serde(default)]
    game_date: String,
    game_time: String,
    court: i64,
}

#[tracing::instrument(skip(conn, queue, form))]
pub async fn save_schedule(
    _admin: Admin,
    Path(game_id): Path<i64>,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
    Form(form): Form<ScheduleForm>,
) -> StandardResponse {
    let game = Game::fetch(game_id, &mut *conn)?;

    let time = form.game_time.trim();
    if let Err(why) = is_valid_game_time(time) {
        tracing::warn!(game_id, time, "refused schedule edit");
        return redirect_err("/admin/schedule", &why);
    }

    let date = match form.game_date.trim() {
        "" => None,
        raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                tracing::warn!(game_id, raw, "refused malformed date");
                return redirect_err(
                    "/admin/schedule",
                    "Date should look like 2025-07-02",
                );
            }
        },
    };

    if form.court < 1 {
        return redirect_err("/admin/schedule", "Court must be 1 or more");
    }

    let n = diesel::update(games::table.filter(games::id.eq(game.id)))
        .set((
            games::game_date.eq(date),
            games::game_time.eq(time),
            games::court.eq(form.court),
        ))
        .execute(&mut *conn)
        .unwrap();
    assert_eq!(n, 1);

    tracing::info!(game_id, time, court = form.court, "schedule updated");
    queue.push(Msg::ScheduleChanged { game_id });

    redirect_msg("/admin/schedule", "Schedule updated!")
}
