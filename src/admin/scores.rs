use axum::{Extension, extract::Path};
use axum_extra::extract::{Form, Query};
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
};

#[tracing::instrument(skip(viewer, conn))]
pub async fn scores_page(
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
                h1 { "Enter Scores" }
                AdminShell
                    active=(AdminTab::Scores)
                    feedback=(&feedback) {
                    @if by_week.is_empty() {
                        div class="empty-state" {
                            "No games scheduled yet."
                        }
                    }
                    @for (week, games) in &by_week {
                        h2 { (config.week_header(*week)) }
                        @for game in games {
                            ScoreCard game=(*game);
                        }
                    }
                }
            })
            .render(),
    )
}

struct ScoreCard<'a> {
    game: &'a Game,
}

impl Renderable for ScoreCard<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let game = self.game;
        let prior_home = game
            .home_score
            .map(|s| s.to_string())
            .unwrap_or_default();
        let prior_away = game
            .away_score
            .map(|s| s.to_string())
            .unwrap_or_default();

        maud! {
            details class="card" {
                summary {
                    @if let Some(badge) = game.badge() {
                        span class="badge" { (badge) " " }
                    }
                    (game.home_team) " vs " (game.away_team)
                    @if game.is_complete {
                        " "
                        span class="final-tag" {
                            (prior_home) " - " (prior_away)
                        }
                    }
                }
                div class="week-hint" {
                    "Week " (game.week) " • " (game.game_time)
                }
                form method="post"
                     action=(format!("/admin/games/{}/score", game.id)) {
                    div class="field-row" {
                        label {
                            (game.home_team)
                            input type="number" name="home_score"
                                  class="score-input" min="0" required
                                  value=(prior_home);
                        }
                        label {
                            (game.away_team)
                            input type="number" name="away_score"
                                  class="score-input" min="0" required
                                  value=(prior_away);
                        }
                    }
                    button type="submit" class="button" { "Save score" }
                }
                @if game.is_complete {
                    form method="post"
                         action=(format!("/admin/games/{}/clear", game.id))
                         onsubmit="return confirm('Clear this score?');" {
                        button type="submit" class="button-danger" {
                            "✕ Clear score"
                        }
                    }
                }
            }
        }
        .render_to(buffer)
    }
}

#[derive(Debug, Deserialize)]
pub struct ScoreForm {
    home_score: i64,
    away_score: i64,
}

#[tracing::instrument(skip(conn, queue))]
pub async fn save_score(
    _admin: Admin,
    Path(game_id): Path<i64>,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
    Form(form): Form<ScoreForm>,
) -> StandardResponse {
    let game = Game::fetch(game_id, &mut *conn)?;

    if form.home_score < 0 || form.away_score < 0 {
        tracing::warn!(game_id, "refused negative score");
        return redirect_err("/admin/scores", "Scores must be zero or more");
    }

    let n = diesel::update(games::table.filter(games::id.eq(game.id)))
        .set((
            games::home_score.eq(form.home_score),
            games::away_score.eq(form.away_score),
            games::is_complete.eq(true),
        ))
        .execute(&mut *conn)
        .unwrap();
    assert_eq!(n, 1);

    tracing::info!(game_id, form.home_score, form.away_score, "score saved");
    queue.push(Msg::ResultsChanged { game_id });

    redirect_msg("/admin/scores", "Score saved!")
}

#[tracing::instrument(skip(conn, queue))]
pub async fn clear_score(
    _admin: Admin,
    Path(game_id): Path<i64>,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let game = Game::fetch(game_id, &mut *conn)?;

    let n = diesel::update(games::table.filter(games::id.eq(game.id)))
        .set((
            games::home_score.eq(None::<i64>),
            games::away_score.eq(None::<i64>),
            games::is_complete.eq(false),
        ))
        .execute(&mut *conn)
        .unwrap();
    assert_eq!(n, 1);

    tracing::info!(game_id, "score cleared");
    queue.push(Msg::ResultsChanged { game_id });

    redirect_msg("/admin/scores", "Score cleared!")
}
