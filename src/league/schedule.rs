use axum::{
    Extension,
    extract::{WebSocketUpgrade, ws},
    response::IntoResponse,
};
use axum_extra::extract::Query;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use futures::{SinkExt, StreamExt};
use hypertext::{Raw, prelude::*};
use serde::Deserialize;
use tokio::{
    sync::broadcast::{Receiver, Sender},
    task::spawn_blocking,
};

use crate::{
    auth::Viewer,
    league::{
        games::Game,
        players::Player,
        reactions::{Reaction, ReactionBar},
        rsvps::{Rsvp, RsvpBar},
        settings::LeagueConfig,
        teams::{Team, TeamAvatar},
    },
    msg::{self, Msg},
    schema::{game_reactions, games, rsvps},
    state::{Conn, DbPool},
    template::{Page, Tab},
    util_resp::{StandardResponse, success},
};

/// Everything one week's game list needs, fetched up front so the same
/// data renders the page and the live fragment.
pub struct WeekData {
    pub week: i64,
    pub config: LeagueConfig,
    pub games: Vec<Game>,
    pub teams: Vec<Team>,
    pub reactions: Vec<Reaction>,
    pub rsvps: Vec<Rsvp>,
    pub players: Vec<Player>,
}

impl WeekData {
    pub fn load(
        week: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> WeekData {
        let config = LeagueConfig::load(&mut *conn);
        let week_games = Game::for_week(week, &mut *conn);
        let game_ids =
            week_games.iter().map(|g| g.id).collect::<Vec<_>>();

        let reactions = game_reactions::table
            .filter(game_reactions::game_id.eq_any(&game_ids))
            .order(game_reactions::id.asc())
            .load::<Reaction>(&mut *conn)
            .unwrap();
        let game_rsvps = rsvps::table
            .filter(rsvps::game_id.eq_any(&game_ids))
            .order(rsvps::id.asc())
            .load::<Rsvp>(&mut *conn)
            .unwrap();

        WeekData {
            week,
            config,
            games: week_games,
            teams: Team::all(&mut *conn),
            reactions,
            rsvps: game_rsvps,
            players: Player::all(&mut *conn),
        }
    }

    fn team(&self, team_id: i64) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    /// Home roster then away roster, for the RSVP select.
    fn roster_of(&self, game: &Game) -> Vec<Player> {
        let mut roster = self
            .players
            .iter()
            .filter(|p| p.team_id == Some(game.home_team_id))
            .cloned()
            .collect::<Vec<_>>();
        roster.extend(
            self.players
                .iter()
                .filter(|p| p.team_id == Some(game.away_team_id))
                .cloned(),
        );
        crate::league::players::sort_roster(&mut roster);
        roster
    }

    fn completed(&self) -> usize {
        self.games.iter().filter(|g| g.is_complete).count()
    }
}

/// The selected week when none is asked for: the week of the first
/// unplayed game, or the final week once everything is in the books.
pub fn default_week(all_games: &[Game], config: &LeagueConfig) -> i64 {
    all_games
        .iter()
        .find(|g| !g.is_complete)
        .map(|g| g.week)
        .unwrap_or(config.total_weeks)
}

fn share_text(game: &Game, config: &LeagueConfig) -> String {
    match (game.home_score, game.away_score) {
        (Some(home), Some(away)) if game.is_complete => format!(
            "{} {} - {} {} 🏀 #{}",
            game.home_team, home, away, game.away_team, config.abbrv
        ),
        _ => format!(
            "{} vs {} • {} 🏀 #{}",
            game.home_team, game.away_team, game.game_time, config.abbrv
        ),
    }
}

struct GameCard<'a> {
    game: &'a Game,
    data: &'a WeekData,
    viewer_id: &'a str,
}

impl Renderable for GameCard<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let game = self.game;
        let home = self.data.team(game.home_team_id);
        let away = self.data.team(game.away_team_id);
        let home_won = game.is_complete && game.home_won();
        let away_won = game.is_complete && !game.home_won();

        let reactions = self
            .data
            .reactions
            .iter()
            .filter(|r| r.game_id == game.id)
            .cloned()
            .collect::<Vec<_>>();
        let game_rsvps = self
            .data
            .rsvps
            .iter()
            .filter(|r| r.game_id == game.id)
            .cloned()
            .collect::<Vec<_>>();
        let roster = self.data.roster_of(game);

        maud! {
            div class="card game-card" id=(format!("game-{}", game.id)) {
                div class="game-meta" {
                    @if let Some(badge) = game.badge() {
                        span class="badge" { (badge) }
                    }
                    @if let Some(date) = game.game_date {
                        span { "📅 " (date.format("%a %b %-d").to_string()) }
                    }
                    span { "🕐 " (game.game_time) }
                    span { "📍 Court " (game.court) }
                    @if game.is_complete {
                        span class="final-tag" { "Final" }
                    }
                }
                div class=(if home_won { "team-line winner" } else { "team-line" }) {
                    TeamAvatar team=(home) name=(&game.home_team) small=(false);
                    span class="team-name" { (game.home_team) }
                    @if let Some(score) = game.home_score {
                        span class="score" { (score) }
                    }
                }
                @if !game.is_complete {
                    div class="vs" { "vs" }
                }
                div class=(if away_won { "team-line winner" } else { "team-line" }) {
                    TeamAvatar team=(away) name=(&game.away_team) small=(false);
                    span class="team-name" { (game.away_team) }
                    @if let Some(score) = game.away_score {
                        span class="score" { (score) }
                    }
                }
                @if game.is_complete {
                    ReactionBar
                        game_id=(game.id)
                        reactions=(&reactions)
                        viewer_id=(self.viewer_id);
                } @else {
                    RsvpBar
                        game_id=(game.id)
                        rsvps=(&game_rsvps)
                        roster=(&roster)
                        viewer_id=(self.viewer_id);
                }
                div class="game-actions" {
                    button class="share-button"
                           data-share=(share_text(game, &self.data.config)) {
                        "↗ Share"
                    }
                }
            }
        }
        .render_to(buffer)
    }
}

/// The morphdom-refreshed portion of the schedule page: week header,
/// completion counter, playoff hint, and the game cards.
pub struct WeekView<'a> {
    pub data: &'a WeekData,
    pub viewer_id: &'a str,
}

impl Renderable for WeekView<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let data = self.data;
        let config = &data.config;
        let week = data.week;

        maud! {
            div id="schedule-week" hx-swap-oob="morphdom" {
                div class="week-header" { (config.week_header(week)) }
                div class="week-hint" {
                    (data.completed()) " of " (data.games.len())
                    " games completed"
                    @if config.is_playoff_week(week) {
                        " (extended session)"
                    }
                }
                @if config.is_playoff_week(week) {
                    div class="card" {
                        b { "Playoff format" }
                        p {
                            "Top two seeds rest on a bye. Play-in: 3 vs 6 "
                            "and 4 vs 5. Winners join the top seeds in the "
                            "semifinals; semifinal winners meet in the "
                            "championship."
                        }
                    }
                }
                @if data.games.is_empty() {
                    div class="empty-state" { "No games scheduled this week." }
                }
                @for game in &data.games {
                    GameCard
                        game=(game)
                        data=(data)
                        viewer_id=(self.viewer_id);
                }
            }
        }
        .render_to(buffer)
    }
}

pub const SHARE_SCRIPT: &str = r#"
document.addEventListener('click', function (ev) {
    var button = ev.target.closest('.share-button');
    if (!button) return;
    var text = button.getAttribute('data-share');
    if (navigator.share) {
        navigator.share({ text: text }).catch(function () {});
    } else if (navigator.clipboard) {
        navigator.clipboard.writeText(text).then(function () {
            var old = button.textContent;
            button.textContent = 'Copied!';
            setTimeout(function () { button.textContent = old; }, 1500);
        });
    }
});
"#;

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub week: Option<i64>,
}

#[tracing::instrument(skip(viewer, conn))]
pub async fn schedule_page(
    viewer: Viewer,
    Query(query): Query<WeekQuery>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);
    let week = match query.week {
        Some(week) => config.clamp_week(week),
        None => default_week(&Game::all(&mut *conn), &config),
    };

    let data = WeekData::load(week, &mut *conn);

    success(
        Page::new_full()
            .viewer(&viewer)
            .config(config.clone())
            .active(Tab::Games)
            .extra_head(maud! {
                script {
                    (Raw::dangerously_create(SHARE_SCRIPT))
                }
            })
            .body(maud! {
                div class="week-pills" {
                    @for pill_week in 1..=config.total_weeks {
                        @let class = format!(
                            "week-pill{}{}",
                            if pill_week == week { " active" } else { "" },
                            if config.is_playoff_week(pill_week) {
                                " playoff"
                            } else {
                                ""
                            },
                        );
                        a class=(class) href=(format!("/?week={pill_week}")) {
                            (config.week_label(pill_week))
                        }
                    }
                }
                div hx-ext="ws"
                    "ws-connect"=(format!("/schedule/ws?week={week}")) {
                    WeekView data=(&data) viewer_id=(&viewer.id);
                }
            })
            .render(),
    )
}

/// Pushes the selected week's re-rendered game list whenever a change
/// lands that this week can see.
#[tracing::instrument(skip(ws, viewer, pool, tx))]
pub async fn schedule_updates(
    ws: WebSocketUpgrade,
    Query(query): Query<WeekQuery>,
    viewer: Viewer,
    Extension(pool): Extension<DbPool>,
    Extension(tx): Extension<Sender<Msg>>,
) -> impl IntoResponse {
    let requested = query.week.unwrap_or(1);
    let pool1 = pool.clone();
    let week = spawn_blocking(move || {
        let mut conn = pool1.get().unwrap();
        let config = LeagueConfig::load(&mut conn);
        config.clamp_week(requested)
    })
    .await
    .unwrap();

    let rx = tx.subscribe();
    let viewer_id = viewer.id;

    ws.on_upgrade(move |socket| {
        handle_socket(socket, rx, pool, week, viewer_id)
    })
}

async fn handle_socket(
    socket: ws::WebSocket,
    mut rx: Receiver<Msg>,
    pool: DbPool,
    week: i64,
    viewer_id: String,
) {
    tracing::debug!(week, "schedule feed opened");
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(refresh) = msg::next_refresh(&mut rx, |msg| {
            !matches!(
                msg,
                Msg::VotesChanged { .. } | Msg::WinnerAnnounced { .. }
            )
        })
        .await
        {
            // Schedule edits can move a game between weeks, so those
            // refresh unconditionally (as does a resync after lagging);
            // the rest only matter when the touched game sits in this
            // week.
            let scope_game = match refresh {
                msg::Refresh::Resync => None,
                msg::Refresh::Message(msg) => match msg {
                    Msg::ScheduleChanged { .. } | Msg::TeamsChanged => None,
                    Msg::ResultsChanged { game_id }
                    | Msg::RsvpChanged { game_id }
                    | Msg::ReactionsChanged { game_id } => Some(game_id),
                    Msg::VotesChanged { .. }
                    | Msg::WinnerAnnounced { .. } => continue,
                },
            };

            let pool1 = pool.clone();
            let viewer_id = viewer_id.clone();
            let rendered = spawn_blocking(move || {
                let mut conn = pool1.get().unwrap();

                if let Some(game_id) = scope_game {
                    let game_week = games::table
                        .filter(games::id.eq(game_id))
                        .select(games::week)
                        .first::<i64>(&mut conn)
                        .optional()
                        .unwrap();
                    if game_week != Some(week) {
                        return None;
                    }
                }

                let data = WeekData::load(week, &mut conn);
                Some(
                    WeekView {
                        data: &data,
                        viewer_id: &viewer_id,
                    }
                    .render()
                    .into_inner(),
                )
            })
            .await
            .unwrap();

            if let Some(rendered) = rendered {
                if sender
                    .send(ws::Message::Text(rendered.into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {
            // keep alive
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
    tracing::debug!(week, "schedule feed closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::stats::fixtures::{game, team};

    #[test]
    fn test_default_week_first_unplayed() {
        let config = LeagueConfig::default();
        let games = vec![
            game(1, 1, &team(1, "A"), &team(2, "B"), Some((40, 30))),
            game(2, 2, &team(1, "A"), &team(2, "B"), None),
            game(3, 3, &team(1, "A"), &team(2, "B"), None),
        ];

        assert_eq!(default_week(&games, &config), 2);
    }

    #[test]
    fn test_default_week_season_over() {
        let config = LeagueConfig::default();
        let games = vec![
            game(1, 1, &team(1, "A"), &team(2, "B"), Some((40, 30))),
            game(2, 2, &team(1, "A"), &team(2, "B"), Some((55, 60))),
        ];

        assert_eq!(default_week(&games, &config), config.total_weeks);
    }

    #[test]
    fn test_share_text() {
        let config = LeagueConfig::default();
        let upcoming = game(1, 1, &team(1, "Hawks"), &team(2, "Wolves"), None);

        assert_eq!(
            share_text(&upcoming, &config),
            format!("Hawks vs Wolves • 6:00 PM 🏀 #{}", config.abbrv)
        );

        let done =
            game(2, 1, &team(1, "Hawks"), &team(2, "Wolves"), Some((52, 48)));
        assert_eq!(
            share_text(&done, &config),
            format!("Hawks 52 - 48 Wolves 🏀 #{}", config.abbrv)
        );
    }
}
