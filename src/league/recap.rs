use axum_extra::extract::Query;
use hypertext::{Raw, prelude::*};
use serde::Deserialize;

use crate::{
    auth::Viewer,
    league::{
        games::Game,
        potw::PotwWinner,
        schedule::{self, SHARE_SCRIPT},
        settings::LeagueConfig,
        stats::recap::{league_records, team_recap},
        teams::{Team, TeamAvatar},
    },
    state::Conn,
    template::{Page, Tab},
    util_resp::{StandardResponse, success},
};

#[derive(Debug, Deserialize)]
pub struct RecapQuery {
    pub team: Option<i64>,
}

#[tracing::instrument(skip(viewer, conn))]
pub async fn recap_page(
    viewer: Viewer,
    Query(query): Query<RecapQuery>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);
    let teams = Team::all(&mut *conn);
    let games = Game::all(&mut *conn);
    let winners = PotwWinner::all(&mut *conn);

    let selected = query
        .team
        .and_then(|id| teams.iter().find(|t| t.id == id))
        .or_else(|| teams.first());
    let recap = selected.map(|team| (team, team_recap(team.id, &games)));
    let records = league_records(&games);

    let total_games = games.len();
    let completed_games = games.iter().filter(|g| g.is_complete).count();
    let current_week = schedule::default_week(&games, &config);
    let percent = if total_games == 0 {
        0
    } else {
        100 * completed_games / total_games
    };
    let season_over = total_games > 0 && completed_games == total_games;
    let teams = &teams;

    success(
        Page::new()
            .viewer(&viewer)
            .config(config.clone())
            .active(Tab::Recap)
            .body(maud! {
                h1 { "Season Recap" }

                @if teams.is_empty() {
                    div class="empty-state" {
                        "No teams yet. Run the seed tool or add data."
                    }
                } @else {
                    div class="chip-row" {
                        @for team in teams {
                            @let class = if selected
                                .is_some_and(|s| s.id == team.id)
                            {
                                "team-chip active"
                            } else {
                                "team-chip"
                            };
                            a class=(class)
                              href=(format!("/recap?team={}", team.id)) {
                                (team.short_name)
                            }
                        }
                    }
                }

                @if let Some((team, recap)) = &recap {
                    @let share = format!(
                        "{}: {}-{} in the {} {:+} 🏀 #{}",
                        team.name,
                        recap.wins,
                        recap.losses,
                        config.name,
                        recap.diff,
                        config.abbrv,
                    );
                    div class="card" {
                        div class="team-line" {
                            TeamAvatar
                                team=(Some(*team))
                                name=(&team.name)
                                small=(false);
                            span class="team-name" { (team.name) }
                        }
                        div class="stat-grid" {
                            div class="stat-card" {
                                div class="stat-value" { (recap.wins) }
                                div class="stat-label" { "Wins" }
                            }
                            div class="stat-card" {
                                div class="stat-value" { (recap.losses) }
                                div class="stat-label" { "Losses" }
                            }
                            div class="stat-card" {
                                div class="stat-value" {
                                    (format!("{:.1}", recap.ppg))
                                }
                                div class="stat-label" { "PPG" }
                            }
                            div class="stat-card" {
                                div class="stat-value" {
                                    (format!("{:+}", recap.diff))
                                }
                                div class="stat-label" { "+/-" }
                            }
                        }
                        @if recap.best_streak > 0 {
                            div class="record-row" {
                                span { "Best win streak" }
                                span class="streak-win" {
                                    "W" (recap.best_streak)
                                }
                            }
                        }
                        @if let Some(win) = &recap.biggest_win {
                            div class="record-row" {
                                span { "Biggest win" }
                                span {
                                    "by " (win.margin) ", "
                                    (win.team_score) " - "
                                    (win.opponent_score)
                                    " vs " (win.opponent)
                                }
                            }
                        }
                        div class="share-button" data-share=(share) {
                            "📣 Share"
                        }
                    }
                }

                div class="card" {
                    h2 { "Season Progress" }
                    div class="record-row" {
                        span {
                            "Week " (current_week) " of "
                            (config.total_weeks)
                        }
                        span { (percent) "%" }
                    }
                    div class="progress" {
                        div class="progress-fill"
                            style=(format!("width:{percent}%")) {}
                    }
                    div class="week-hint" {
                        (completed_games) " of " (total_games)
                        " games completed"
                    }
                }

                @if let Some(records) = &records {
                    div class="card" {
                        h2 { "League Records" }
                        div class="record-row" {
                            span { "🔥 Highest score" }
                            span {
                                (records.highest_score) " ("
                                (records.highest_scorer) ")"
                            }
                        }
                        div class="record-row" {
                            span { "💪 Biggest blowout" }
                            span {
                                "by " (records.blowout_margin) " ("
                                (records.blowout_winner) ")"
                            }
                        }
                        div class="record-row" {
                            span { "😅 Closest game" }
                            span {
                                (records.closest_home_score) " - "
                                (records.closest_away_score)
                                " (by " (records.closest_margin) ")"
                            }
                        }
                    }
                }

                @if !winners.is_empty() {
                    div class="card" {
                        h2 { "Players of the Week" }
                        @for (winner, player) in &winners {
                            div class="record-row" {
                                span { "⭐ Week " (winner.week) }
                                span { (player.name) }
                            }
                        }
                    }
                }

                @if !season_over {
                    div class="card empty-state" {
                        "Season still in progress. Full highlights after "
                        "the final week!"
                    }
                }

                script {
                    (Raw::dangerously_create(SHARE_SCRIPT))
                }
            })
            .render(),
    )
}
