use axum::extract::Path;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::Viewer,
    league::{
        games::Game,
        players::{Player, position_label},
        settings::LeagueConfig,
        stats::recap::team_recap,
    },
    schema::teams,
    state::Conn,
    template::{Page, Tab},
    util_resp::{FailureResponse, StandardResponse, success},
};

#[derive(Serialize, Deserialize, Queryable, Clone, Debug, PartialEq)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub short_name: String,
    pub color: String,
    pub motto: Option<String>,
}

impl Team {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        team_id: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Team, FailureResponse> {
        teams::table
            .filter(teams::id.eq(team_id))
            .first::<Team>(&mut *conn)
            .optional()
            .unwrap()
            .ok_or(FailureResponse::NotFound(()))
    }

    pub fn all(conn: &mut impl LoadConnection<Backend = Sqlite>) -> Vec<Team> {
        teams::table
            .order(teams::id.asc())
            .load::<Team>(&mut *conn)
            .unwrap()
    }

    /// Whether black text is readable on this team's accent color. Dark
    /// accents get white text instead.
    pub fn has_light_color(&self) -> bool {
        let hex = self.color.trim_start_matches('#');
        let expanded: String = if hex.len() == 3 {
            hex.chars().flat_map(|c| [c, c]).collect()
        } else {
            hex.to_string()
        };

        let channel = |i: usize| {
            u8::from_str_radix(expanded.get(i..i + 2).unwrap_or("00"), 16)
                .unwrap_or(0) as f64
        };
        let (r, g, b) = (channel(0), channel(2), channel(4));

        (0.299 * r + 0.587 * g + 0.114 * b) / 255.0 > 0.5
    }
}

/// Round avatar showing a team's short code on its accent color. Falls
/// back to the denormalized name's initials when the team row is gone.
pub struct TeamAvatar<'a> {
    pub team: Option<&'a Team>,
    pub name: &'a str,
    pub small: bool,
}

impl Renderable for TeamAvatar<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let code = match self.team {
            Some(team) => team.short_name.clone(),
            None => self.name.chars().take(2).collect::<String>(),
        };
        let color = self.team.map(|t| t.color.as_str()).unwrap_or("#64748b");
        let text = if self.team.is_some_and(|t| t.has_light_color()) {
            "#000"
        } else {
            "#fff"
        };

        maud! {
            span class=(if self.small { "team-avatar small" } else { "team-avatar" })
                 style=(format!("background:{color};color:{text}")) {
                (code)
            }
        }
        .render_to(buffer)
    }
}

#[tracing::instrument(skip(viewer, conn))]
pub async fn teams_page(viewer: Viewer, mut conn: Conn<true>) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);
    let all_teams = Team::all(&mut *conn);
    let players = Player::all(&mut *conn);

    success(
        Page::new()
            .viewer(&viewer)
            .config(config)
            .active(Tab::Teams)
            .body(maud! {
                h1 { "Teams" }
                @if all_teams.is_empty() {
                    div class="empty-state" {
                        "No teams yet. Run the seed tool or add data."
                    }
                }
                @for team in &all_teams {
                    @let roster_size = players
                        .iter()
                        .filter(|p| p.team_id == Some(team.id))
                        .count();
                    @let captain = players
                        .iter()
                        .find(|p| p.team_id == Some(team.id) && p.is_captain);
                    a class="card team-line" href=(format!("/teams/{}", team.id)) {
                        TeamAvatar team=(Some(team)) name=(&team.name) small=(false);
                        span class="team-name" {
                            (team.name)
                            @if let Some(motto) = &team.motto {
                                br;
                                span class="week-hint" { "“" (motto) "”" }
                            }
                        }
                        span class="rsvp-count" {
                            (roster_size) " players"
                            @if let Some(captain) = captain {
                                " • Capt: " (captain.first_name())
                            }
                        }
                    }
                }
            })
            .render(),
    )
}

struct TeamGameRow<'a> {
    team: &'a Team,
    game: &'a Game,
}

impl Renderable for TeamGameRow<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let game = self.game;
        let at_home = game.home_team_id == self.team.id;
        let opponent = if at_home { &game.away_team } else { &game.home_team };
        let (ours, theirs) = if at_home {
            (game.home_score, game.away_score)
        } else {
            (game.away_score, game.home_score)
        };
        let won = game.is_complete && (at_home == game.home_won());
        let score_line = match (ours, theirs) {
            (Some(ours), Some(theirs)) if game.is_complete => Some(format!(
                "{} {ours}-{theirs}",
                if won { "W" } else { "L" }
            )),
            _ => None,
        };

        maud! {
            div class="record-row" {
                span {
                    @if at_home { "vs " } @else { "@ " }
                    (opponent)
                    " · Week " (game.week) " • " (game.game_time)
                }
                @if let Some(line) = &score_line {
                    @if won {
                        span class="streak-win" { (line) }
                    } @else {
                        span class="streak-loss" { (line) }
                    }
                } @else {
                    span class="rsvp-count" { "Upcoming" }
                }
            }
        }
        .render_to(buffer)
    }
}

#[tracing::instrument(skip(viewer, conn))]
pub async fn team_detail_page(
    Path(team_id): Path<i64>,
    viewer: Viewer,
    mut conn: Conn<true>,
) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);

    let team = match Team::fetch(team_id, &mut *conn) {
        Ok(team) => team,
        Err(_) => {
            return Err(FailureResponse::NotFoundPage(
                Page::new()
                    .viewer(&viewer)
                    .config(config)
                    .active(Tab::Teams)
                    .body(maud! {
                        div class="card empty-state" { "Team not found" }
                    })
                    .render(),
            ));
        }
    };

    let roster = Player::of_team(team.id, &mut *conn);
    let team_games = Game::involving_team(team.id, &mut *conn);
    let recap = team_recap(team.id, &team_games);

    success(
        Page::new()
            .viewer(&viewer)
            .config(config)
            .active(Tab::Teams)
            .body(maud! {
                div class="card team-line" {
                    TeamAvatar team=(Some(&team)) name=(&team.name) small=(false);
                    span class="team-name" {
                        (team.name)
                        @if let Some(motto) = &team.motto {
                            br;
                            span class="week-hint" { "“" (motto) "”" }
                        }
                    }
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
                div class="card" {
                    h2 { "Roster" }
                    @if roster.is_empty() {
                        div class="empty-state" { "No players yet." }
                    }
                    @for player in &roster {
                        div class="roster-row" {
                            span class="jersey" {
                                @if let Some(jersey) = player.jersey_number {
                                    "#" (jersey)
                                }
                            }
                            span class="team-name" {
                                (player.name)
                                @if player.is_captain { " ⭐" }
                            }
                            @if let Some(position) = &player.position {
                                span class="rsvp-count" {
                                    (position_label(position))
                                }
                            }
                        }
                    }
                }
                div class="card" {
                    h2 { "Games" }
                    @for game in team_games.iter().take(8) {
                        TeamGameRow team=(&team) game=(game);
                    }
                }
            })
            .render(),
    )
}

#[cfg(test)]
#[test]
fn test_light_color() {
    let team = |color: &str| Team {
        id: 1,
        name: "Test".to_string(),
        short_name: "TST".to_string(),
        color: color.to_string(),
        motto: None,
    };

    assert!(team("#ffffff").has_light_color());
    assert!(team("#fc0").has_light_color());
    assert!(!team("#1e3a5f").has_light_color());
    assert!(!team("#000000").has_light_color());
}
