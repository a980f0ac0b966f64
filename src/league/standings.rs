use axum::{
    Extension,
    extract::{WebSocketUpgrade, ws},
    response::IntoResponse,
};
use axum_extra::extract::Query;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use futures::{SinkExt, StreamExt};
use hypertext::prelude::*;
use itertools::Itertools;
use serde::Deserialize;
use tokio::{
    sync::broadcast::{Receiver, Sender},
    task::spawn_blocking,
};

use crate::{
    auth::Viewer,
    league::{
        games::Game,
        settings::LeagueConfig,
        stats::{
            Outcome,
            h2h::{HeadToHead, head_to_head},
            standings::{TeamStanding, standings},
        },
        teams::{Team, TeamAvatar},
    },
    msg::{self, Msg},
    state::{Conn, DbPool},
    template::{Page, Tab},
    util_resp::{StandardResponse, success},
};

/// The `?compare=a,b` selection: at most two team ids, in tap order.
pub fn parse_compare(compare: Option<&str>) -> Vec<i64> {
    compare
        .unwrap_or("")
        .split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .take(2)
        .collect()
}

/// The selection after tapping `team_id`: taps toggle membership, and a
/// third pick evicts the older of the two.
pub fn toggle_compare(current: &[i64], team_id: i64) -> Vec<i64> {
    let mut next = current.to_vec();
    if let Some(pos) = next.iter().position(|&id| id == team_id) {
        next.remove(pos);
    } else {
        next.push(team_id);
        if next.len() > 2 {
            next.remove(0);
        }
    }
    next
}

fn compare_href(selection: &[i64]) -> String {
    if selection.is_empty() {
        "/standings".to_string()
    } else {
        format!("/standings?compare={}", selection.iter().join(","))
    }
}

pub struct StandingsData {
    pub config: LeagueConfig,
    pub teams: Vec<Team>,
    pub games: Vec<Game>,
    pub compare: Vec<i64>,
}

impl StandingsData {
    pub fn load(
        compare: Vec<i64>,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> StandingsData {
        StandingsData {
            config: LeagueConfig::load(&mut *conn),
            teams: Team::all(&mut *conn),
            games: Game::all(&mut *conn),
            compare,
        }
    }

    fn team(&self, team_id: i64) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }
}

fn seed_class(rank: usize) -> &'static str {
    match rank {
        1 | 2 => "seed seed-top",
        3 | 4 => "seed seed-playin",
        _ => "seed",
    }
}

struct CompareCard<'a> {
    data: &'a StandingsData,
}

impl Renderable for CompareCard<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let [first_id, second_id] = self.data.compare[..] else {
            maud! {
                div class="week-hint" {
                    "Tap two teams to compare head-to-head."
                }
            }
            .render_to(buffer);
            return;
        };

        let first = self.data.team(first_id);
        let second = self.data.team(second_id);
        let first_name = first.map(|t| t.name.as_str()).unwrap_or("?");
        let second_name = second.map(|t| t.name.as_str()).unwrap_or("?");
        let record = head_to_head(first_id, second_id, &self.data.games);

        maud! {
            div class="card" {
                h2 { "Head-to-head" }
                div class="compare-selects" {
                    TeamAvatar team=(first) name=(first_name) small=(true);
                    span class="team-name" { (first_name) }
                    span class="vs" { "vs" }
                    span class="team-name" { (second_name) }
                    TeamAvatar team=(second) name=(second_name) small=(true);
                }
                @match record {
                    HeadToHead::NoMeetings => {
                        div class="compare-result" {
                            "These teams have not met yet."
                        }
                    }
                    HeadToHead::Record {
                        games,
                        first_wins,
                        second_wins,
                        first_points,
                        second_points,
                    } => {
                        div class="compare-result" {
                            b { (first_wins) } " – " b { (second_wins) }
                            " in " (games)
                            @if games == 1 { " meeting" } @else { " meetings" }
                        }
                        div class="compare-result" {
                            "Points: " (first_points) " – " (second_points)
                        }
                    }
                }
            }
        }
        .render_to(buffer)
    }
}

/// The morphdom-refreshed portion of the standings page: ranked table,
/// seed legend, and the head-to-head card.
pub struct StandingsView<'a> {
    pub data: &'a StandingsData,
}

impl Renderable for StandingsView<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let data = self.data;
        let table = standings(&data.teams, &data.games);

        maud! {
            div id="standings-view" hx-swap-oob="morphdom" {
                div class="card" {
                    table class="standings-table" {
                        thead {
                            tr {
                                th { "#" }
                                th { "Team" }
                                th class="num" { "W" }
                                th class="num" { "L" }
                                th class="num" { "+/-" }
                                th class="num" { "Strk" }
                            }
                        }
                        tbody {
                            @for (i, row) in table.iter().enumerate() {
                                (StandingsRow {
                                    rank: i + 1,
                                    row,
                                    data,
                                })
                            }
                        }
                    }
                    div class="legend" {
                        span class="legend-item" {
                            span class="dot" style="background:#16a34a" {}
                            "Bye to semifinals"
                        }
                        span class="legend-item" {
                            span class="dot" style="background:#d4a017" {}
                            "Play-in, home side"
                        }
                        span class="legend-item" {
                            span class="dot" style="background:#64748b" {}
                            "Play-in, road side"
                        }
                    }
                }
                CompareCard data=(data);
            }
        }
        .render_to(buffer)
    }
}

struct StandingsRow<'a> {
    rank: usize,
    row: &'a TeamStanding,
    data: &'a StandingsData,
}

impl Renderable for StandingsRow<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let row = self.row;
        let selected = self.data.compare.contains(&row.team.id);
        let href = compare_href(&toggle_compare(
            &self.data.compare,
            row.team.id,
        ));

        maud! {
            tr class=(if selected { "winner" } else { "" }) {
                td { span class=(seed_class(self.rank)) { (self.rank) } }
                td {
                    a href=(href) {
                        (row.team.name)
                        @if self.rank == 1 { " 👑" }
                    }
                }
                td class="num" { (row.wins) }
                td class="num" { (row.losses) }
                td class="num" { (format!("{:+}", row.diff)) }
                td class="num" {
                    @match &row.streak {
                        Some(streak) if streak.outcome == Outcome::Win => {
                            span class="streak-win" { (streak.label()) }
                        }
                        Some(streak) => {
                            span class="streak-loss" { (streak.label()) }
                        }
                        None => { "–" }
                    }
                }
            }
        }
        .render_to(buffer)
    }
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub compare: Option<String>,
}

#[tracing::instrument(skip(viewer, conn))]
pub async fn standings_page(
    viewer: Viewer,
    Query(query): Query<CompareQuery>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let compare = parse_compare(query.compare.as_deref());
    let data = StandingsData::load(compare, &mut *conn);
    let ws_url = match query.compare.as_deref() {
        Some(compare) => format!("/standings/ws?compare={compare}"),
        None => "/standings/ws".to_string(),
    };

    success(
        Page::new()
            .viewer(&viewer)
            .config(data.config.clone())
            .active(Tab::Standings)
            .body(maud! {
                h1 { "Standings" }
                div hx-ext="ws" "ws-connect"=(ws_url) {
                    StandingsView data=(&data);
                }
            })
            .render(),
    )
}

/// Re-renders the table and compare card whenever results or team
/// details change.
#[tracing::instrument(skip(ws, pool, tx))]
pub async fn standings_updates(
    ws: WebSocketUpgrade,
    Query(query): Query<CompareQuery>,
    Extension(pool): Extension<DbPool>,
    Extension(tx): Extension<Sender<Msg>>,
) -> impl IntoResponse {
    let compare = parse_compare(query.compare.as_deref());
    let rx = tx.subscribe();

    ws.on_upgrade(move |socket| handle_socket(socket, rx, pool, compare))
}

async fn handle_socket(
    socket: ws::WebSocket,
    mut rx: Receiver<Msg>,
    pool: DbPool,
    compare: Vec<i64>,
) {
    tracing::debug!("standings feed opened");
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        // A lagged receiver re-renders unconditionally, so the filter
        // outcome is all that matters here.
        while msg::next_refresh(&mut rx, |msg| {
            matches!(msg, Msg::ResultsChanged { .. } | Msg::TeamsChanged)
        })
        .await
        .is_some()
        {
            let pool1 = pool.clone();
            let compare = compare.clone();
            let rendered = spawn_blocking(move || {
                let mut conn = pool1.get().unwrap();
                let data = StandingsData::load(compare, &mut conn);
                StandingsView { data: &data }.render().into_inner()
            })
            .await
            .unwrap();

            if sender
                .send(ws::Message::Text(rendered.into()))
                .await
                .is_err()
            {
                break;
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
    tracing::debug!("standings feed closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compare() {
        assert_eq!(parse_compare(None), Vec::<i64>::new());
        assert_eq!(parse_compare(Some("3,5")), vec![3, 5]);
        assert_eq!(parse_compare(Some("3")), vec![3]);
        assert_eq!(parse_compare(Some("3,5,9")), vec![3, 5]);
        assert_eq!(parse_compare(Some("junk,5")), vec![5]);
    }

    #[test]
    fn test_toggle_compare() {
        assert_eq!(toggle_compare(&[], 3), vec![3]);
        assert_eq!(toggle_compare(&[3], 5), vec![3, 5]);
        // a third pick evicts the older selection
        assert_eq!(toggle_compare(&[3, 5], 9), vec![5, 9]);
        // re-tapping deselects
        assert_eq!(toggle_compare(&[3, 5], 3), vec![5]);
    }

    #[test]
    fn test_compare_href() {
        assert_eq!(compare_href(&[]), "/standings");
        assert_eq!(compare_href(&[3, 5]), "/standings?compare=3,5");
    }
}
