use std::collections::BTreeSet;

use axum::{
    Extension,
    extract::{WebSocketUpgrade, ws},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::{Form, Query};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use futures::{SinkExt, StreamExt};
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::broadcast::{Receiver, Sender},
    task::spawn_blocking,
};

use crate::{
    auth::Viewer,
    league::{
        games::Game,
        players::{Player, sort_roster},
        settings::{self, LeagueConfig},
        teams::Team,
    },
    msg::{self, Msg, MsgQueue},
    schema::{players, potw_votes, potw_winners},
    state::{Conn, DbPool},
    template::{Page, Tab},
    util_resp::{StandardResponse, bad_request, see_other_ok, success},
    widgets::alert::ErrorAlert,
};

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct PotwVote {
    pub id: i64,
    pub week: i64,
    pub player_id: i64,
    pub voter_id: String,
}

impl PotwVote {
    pub fn for_week(
        week: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Vec<PotwVote> {
        potw_votes::table
            .filter(potw_votes::week.eq(week))
            .order(potw_votes::id.asc())
            .load::<PotwVote>(&mut *conn)
            .unwrap()
    }

    /// First write wins: the insert is ignored when this voter already
    /// has a vote down for the week. Returns whether the vote counted.
    pub fn record(
        week: i64,
        player_id: i64,
        voter_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> bool {
        let n = diesel::insert_into(potw_votes::table)
            .values((
                potw_votes::week.eq(week),
                potw_votes::player_id.eq(player_id),
                potw_votes::voter_id.eq(voter_id),
            ))
            .on_conflict((potw_votes::week, potw_votes::voter_id))
            .do_nothing()
            .execute(&mut *conn)
            .unwrap();
        n == 1
    }
}

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct PotwWinner {
    pub id: i64,
    pub week: i64,
    pub player_id: i64,
    pub announcement: Option<String>,
}

impl PotwWinner {
    pub fn for_week(
        week: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Option<(PotwWinner, Player)> {
        potw_winners::table
            .filter(potw_winners::week.eq(week))
            .inner_join(players::table)
            .select((potw_winners::all_columns, players::all_columns))
            .first::<(PotwWinner, Player)>(&mut *conn)
            .optional()
            .unwrap()
    }

    /// All announced winners, week ascending, for the recap page.
    pub fn all(
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Vec<(PotwWinner, Player)> {
        potw_winners::table
            .inner_join(players::table)
            .select((potw_winners::all_columns, players::all_columns))
            .order(potw_winners::week.asc())
            .load::<(PotwWinner, Player)>(&mut *conn)
            .unwrap()
    }

    /// One winner per week; announcing again replaces the earlier pick.
    pub fn announce(
        week: i64,
        player_id: i64,
        announcement: Option<&str>,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) {
        let n = diesel::insert_into(potw_winners::table)
            .values((
                potw_winners::week.eq(week),
                potw_winners::player_id.eq(player_id),
                potw_winners::announcement.eq(announcement),
            ))
            .on_conflict(potw_winners::week)
            .do_update()
            .set((
                potw_winners::player_id.eq(player_id),
                potw_winners::announcement.eq(announcement),
            ))
            .execute(&mut *conn)
            .unwrap();
        assert_eq!(n, 1);
    }
}

/// Votes per player, most first; ties rank the lower player id first so
/// the order is stable across refreshes.
pub fn tally(votes: &[PotwVote]) -> Vec<(i64, usize)> {
    let mut counts: Vec<(i64, usize)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(id, _)| *id == vote.player_id) {
            Some((_, count)) => *count += 1,
            None => counts.push((vote.player_id, 1)),
        }
    }
    counts.sort_by_key(|&(id, count)| (std::cmp::Reverse(count), id));
    counts
}

/// The default week to show: the latest week with a final score, capped
/// at the regular season.
pub fn default_vote_week(config: &LeagueConfig, all_games: &[Game]) -> i64 {
    all_games
        .iter()
        .filter(|g| g.is_complete)
        .map(|g| g.week)
        .max()
        .unwrap_or(1)
        .min(config.regular_weeks)
}

pub struct VoteData {
    pub week: i64,
    pub config: LeagueConfig,
    pub voting_enabled: bool,
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
    pub votes: Vec<PotwVote>,
    pub winner: Option<(PotwWinner, Player)>,
}

impl VoteData {
    pub fn load(
        week: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> VoteData {
        VoteData {
            week,
            config: LeagueConfig::load(&mut *conn),
            voting_enabled: settings::voting_enabled(&mut *conn),
            teams: Team::all(&mut *conn),
            players: Player::all(&mut *conn),
            votes: PotwVote::for_week(week, &mut *conn),
            winner: PotwWinner::for_week(week, &mut *conn),
        }
    }

    fn player(&self, player_id: i64) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    fn my_vote(&self, viewer_id: &str) -> Option<&PotwVote> {
        self.votes.iter().find(|v| v.voter_id == viewer_id)
    }

    /// Rosters in team order, captains first, free agents left out.
    fn ballot(&self) -> Vec<(&Team, Vec<Player>)> {
        self.teams
            .iter()
            .filter_map(|team| {
                let mut roster = self
                    .players
                    .iter()
                    .filter(|p| p.team_id == Some(team.id))
                    .cloned()
                    .collect::<Vec<_>>();
                if roster.is_empty() {
                    return None;
                }
                sort_roster(&mut roster);
                Some((team, roster))
            })
            .collect()
    }
}

/// The morphdom-refreshed portion of the vote page: winner banner,
/// grouped ballot, and the tally.
pub struct VoteView<'a> {
    pub data: &'a VoteData,
    pub viewer_id: &'a str,
}

impl Renderable for VoteView<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let data = self.data;
        let week = data.week;
        let my_vote = data.my_vote(self.viewer_id);
        let voted_for = my_vote.map(|v| v.player_id);
        let show_tally = my_vote.is_some() || data.winner.is_some();
        let counts = tally(&data.votes);
        let top_count = counts.first().map(|&(_, count)| count).unwrap_or(0);
        let ballot = data.ballot();

        maud! {
            div id="vote-view" hx-swap-oob="morphdom" {
                @if let Some((winner, player)) = &data.winner {
                    div class="winner-banner" {
                        b { "Week " (week) " Winner" }
                        div { "⭐ " (player.name) }
                        @if let Some(announcement) = &winner.announcement {
                            div class="week-hint" { (announcement) }
                        }
                    }
                }
                @if ballot.is_empty() {
                    div class="empty-state" { "No players registered yet." }
                }
                @for (team, roster) in &ballot {
                    h2 {
                        span class="dot"
                             style=(format!("background:{}", team.color)) {}
                        " " (team.name)
                    }
                    @for player in roster {
                        form method="post" action="/vote"
                             class="inline-form" {
                            input type="text" hidden value=(week)
                                  name="week";
                            input type="text" hidden value=(player.id)
                                  name="player_id";
                            @if voted_for == Some(player.id) {
                                button type="submit" disabled
                                       class="player-option selected" {
                                    @if let Some(jersey) = player.jersey_number {
                                        span class="jersey" { "#" (jersey) }
                                    }
                                    (player.name) " ✓"
                                }
                            } @else if my_vote.is_some() {
                                button type="submit" disabled
                                       class="player-option" {
                                    @if let Some(jersey) = player.jersey_number {
                                        span class="jersey" { "#" (jersey) }
                                    }
                                    (player.name)
                                }
                            } @else {
                                button type="submit"
                                       class="player-option" {
                                    @if let Some(jersey) = player.jersey_number {
                                        span class="jersey" { "#" (jersey) }
                                    }
                                    (player.name)
                                }
                            }
                        }
                    }
                }
                @if show_tally && !counts.is_empty() {
                    div class="card" {
                        h2 { "Current Standings" }
                        @for (i, (player_id, count)) in
                            counts.iter().take(5).enumerate()
                        {
                            @let name = data
                                .player(*player_id)
                                .map(|p| p.name.clone())
                                .unwrap_or_else(|| "Unknown".to_string());
                            @let percent = 100 * count / top_count.max(1);
                            div class="tally-row" {
                                span {
                                    @if i == 0 { "👑 " }
                                    (name)
                                    @if voted_for == Some(*player_id) {
                                        " (your pick)"
                                    }
                                }
                                div class="tally-bar" {
                                    div class="tally-fill"
                                        style=(format!("width:{percent}%")) {}
                                }
                                span { (count) }
                            }
                        }
                    }
                }
            }
        }
        .render_to(buffer)
    }
}

/// Week pills: every regular-season week plus any later week that
/// already has an announced winner.
fn selectable_weeks(
    config: &LeagueConfig,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Vec<i64> {
    let mut weeks: BTreeSet<i64> = (1..=config.regular_weeks).collect();
    weeks.extend(
        potw_winners::table
            .select(potw_winners::week)
            .load::<i64>(&mut *conn)
            .unwrap(),
    );
    weeks.into_iter().collect()
}

#[derive(Debug, Deserialize)]
pub struct VoteWeekQuery {
    pub week: Option<i64>,
}

#[tracing::instrument(skip(viewer, conn))]
pub async fn vote_page(
    viewer: Viewer,
    Query(query): Query<VoteWeekQuery>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);

    if !settings::voting_enabled(&mut *conn) {
        return success(
            Page::new()
                .viewer(&viewer)
                .config(config)
                .active(Tab::Vote)
                .body(maud! {
                    div class="card empty-state" {
                        b { "Voting is Currently Disabled" }
                        p {
                            "Check back later when voting opens for the "
                            "next week!"
                        }
                    }
                })
                .render(),
        );
    }

    let weeks = selectable_weeks(&config, &mut *conn);
    let week = config.clamp_week(query.week.unwrap_or_else(|| {
        default_vote_week(&config, &Game::all(&mut *conn))
    }));
    let data = VoteData::load(week, &mut *conn);

    success(
        Page::new()
            .viewer(&viewer)
            .config(config)
            .active(Tab::Vote)
            .body(maud! {
                h1 { "Player of the Week" }
                div class="week-pills" {
                    @for pill_week in &weeks {
                        @let class = if *pill_week == week {
                            "week-pill active"
                        } else {
                            "week-pill"
                        };
                        a class=(class)
                          href=(format!("/vote?week={pill_week}")) {
                            "Wk " (pill_week)
                        }
                    }
                }
                div hx-ext="ws"
                    "ws-connect"=(format!("/vote/ws?week={week}")) {
                    VoteView data=(&data) viewer_id=(&viewer.id);
                }
            })
            .render(),
    )
}

#[derive(Deserialize)]
pub struct VoteForm {
    week: i64,
    player_id: i64,
}

#[tracing::instrument(skip(viewer, conn, queue, form))]
pub async fn submit_vote(
    viewer: Viewer,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
    Form(form): Form<VoteForm>,
) -> StandardResponse {
    if !settings::voting_enabled(&mut *conn) {
        tracing::warn!("refused vote while voting is disabled");
        return bad_request(
            maud! {
                ErrorAlert msg="Voting is currently disabled.";
            }
            .render(),
        );
    }

    let config = LeagueConfig::load(&mut *conn);
    if !(1..=config.total_weeks).contains(&form.week) {
        tracing::warn!(week = form.week, "refused vote for unknown week");
        return bad_request(
            maud! {
                ErrorAlert msg="That week is not part of the season.";
            }
            .render(),
        );
    }

    let player = Player::fetch(form.player_id, &mut *conn)?;

    if PotwVote::record(form.week, player.id, &viewer.id, &mut *conn) {
        queue.push(Msg::VotesChanged { week: form.week });
    }

    see_other_ok(Redirect::to(&format!("/vote?week={}", form.week)))
}

/// Pushes the week's tallies and winner banner as votes land and the
/// winner is announced.
#[tracing::instrument(skip(ws, viewer, pool, tx))]
pub async fn vote_updates(
    ws: WebSocketUpgrade,
    Query(query): Query<VoteWeekQuery>,
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
    tracing::debug!(week, "vote feed opened");
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while msg::next_refresh(&mut rx, |msg| {
            matches!(
                msg,
                Msg::VotesChanged { week: changed }
                | Msg::WinnerAnnounced { week: changed } if *changed == week
            )
        })
        .await
        .is_some()
        {
            let pool1 = pool.clone();
            let viewer_id = viewer_id.clone();
            let rendered = spawn_blocking(move || {
                let mut conn = pool1.get().unwrap();
                let data = VoteData::load(week, &mut conn);
                VoteView {
                    data: &data,
                    viewer_id: &viewer_id,
                }
                .render()
                .into_inner()
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
    tracing::debug!(week, "vote feed closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::stats::fixtures::{game, team};

    fn vote(id: i64, player_id: i64, voter: &str) -> PotwVote {
        PotwVote {
            id,
            week: 1,
            player_id,
            voter_id: voter.to_string(),
        }
    }

    #[test]
    fn test_tally_ranks_by_count_then_id() {
        let votes = vec![
            vote(1, 9, "a"),
            vote(2, 3, "b"),
            vote(3, 9, "c"),
            vote(4, 5, "d"),
        ];

        assert_eq!(tally(&votes), vec![(9, 2), (3, 1), (5, 1)]);
    }

    #[test]
    fn test_default_vote_week() {
        let config = LeagueConfig::default();
        let a = team(1, "A");
        let b = team(2, "B");

        assert_eq!(default_vote_week(&config, &[]), 1);

        let games = vec![
            game(1, 1, &a, &b, Some((40, 30))),
            game(2, 3, &a, &b, Some((40, 45))),
            game(3, 4, &a, &b, None),
        ];
        assert_eq!(default_vote_week(&config, &games), 3);

        // playoff results never push the ballot past the regular season
        let late = vec![game(
            4,
            config.total_weeks,
            &a,
            &b,
            Some((50, 40)),
        )];
        assert_eq!(
            default_vote_week(&config, &late),
            config.regular_weeks
        );
    }
}
