use axum::{Extension, extract::Path};
use axum_extra::extract::{Form, Query};
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;
use url::Url;

use crate::{
    admin::{AdminShell, AdminTab, Feedback, redirect_err, redirect_msg},
    auth::{Admin, Viewer},
    league::{
        players::{POSITIONS, Player, sort_roster},
        settings::LeagueConfig,
        teams::Team,
    },
    msg::{Msg, MsgQueue},
    schema::{players, potw_votes, potw_winners, rsvps},
    state::Conn,
    template::{Page, Tab},
    util_resp::{StandardResponse, success},
};

#[tracing::instrument(skip(viewer, conn))]
pub async fn players_tab(
    _admin: Admin,
    viewer: Viewer,
    Query(feedback): Query<Feedback>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let config = LeagueConfig::load(&mut *conn);
    let teams = Team::all(&mut *conn);
    let all = Player::all(&mut *conn);

    let mut sections = teams
        .iter()
        .filter_map(|team| {
            let mut roster = all
                .iter()
                .filter(|p| p.team_id == Some(team.id))
                .cloned()
                .collect::<Vec<_>>();
            if roster.is_empty() {
                return None;
            }
            sort_roster(&mut roster);
            Some((Some(team), roster))
        })
        .collect::<Vec<_>>();
    let unassigned = all
        .iter()
        .filter(|p| p.team_id.is_none())
        .cloned()
        .collect::<Vec<_>>();
    if !unassigned.is_empty() {
        sections.push((None, unassigned));
    }
    let teams = &teams;

    success(
        Page::new()
            .viewer(&viewer)
            .config(config)
            .active(Tab::Admin)
            .body(maud! {
                h1 { "Manage Players" }
                AdminShell
                    active=(AdminTab::Players)
                    feedback=(&feedback) {
                    details class="card" {
                        summary { "➕ Add Player" }
                        form method="post" action="/admin/players" {
                            PlayerFields player=(None) teams=(&teams);
                            button type="submit" class="button" {
                                "Add player"
                            }
                        }
                    }
                    @for (team, roster) in &sections {
                        h2 {
                            @match team {
                                Some(team) => {
                                    span class="dot"
                                         style=(format!(
                                             "background:{}", team.color
                                         )) {}
                                    " " (team.name)
                                }
                                None => { "Unassigned" }
                            }
                        }
                        @for player in roster {
                            details class="card" {
                                summary {
                                    @if let Some(jersey) =
                                        player.jersey_number
                                    {
                                        span class="jersey" {
                                            "#" (jersey)
                                        }
                                        " "
                                    }
                                    (player.name)
                                    @if player.is_captain { " ⭐" }
                                }
                                form method="post"
                                     action=(format!(
                                         "/admin/players/{}", player.id
                                     )) {
                                    PlayerFields
                                        player=(Some(player))
                                        teams=(&teams);
                                    button type="submit" class="button" {
                                        "Save"
                                    }
                                }
                                form method="post"
                                     action=(format!(
                                         "/admin/players/{}/delete",
                                         player.id
                                     ))
                                     onsubmit="return confirm('Delete this player? Their votes and RSVPs go too.');" {
                                    button type="submit"
                                           class="button-danger" {
                                        "Delete"
                                    }
                                }
                            }
                        }
                    }
                }
            })
            .render(),
    )
}

/// The add and edit forms share one set of inputs; `player` prefills
/// them when editing.
struct PlayerFields<'a> {
    player: Option<&'a Player>,
    teams: &'a [Team],
}

impl Renderable for PlayerFields<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let player = self.player;
        let name = player.map(|p| p.name.as_str()).unwrap_or("");
        let team_id = player.and_then(|p| p.team_id);
        let jersey = player
            .and_then(|p| p.jersey_number)
            .map(|j| j.to_string())
            .unwrap_or_default();
        let position = player.and_then(|p| p.position.as_deref());
        let captain = player.is_some_and(|p| p.is_captain);
        let photo = player
            .and_then(|p| p.photo_url.as_deref())
            .unwrap_or("");

        maud! {
            label {
                "Name"
                input type="text" name="name" class="input" required
                      value=(name);
            }
            label {
                "Team"
                select name="team_id" class="select" {
                    @if team_id.is_none() {
                        option value="" selected { "No team" }
                    } @else {
                        option value="" { "No team" }
                    }
                    @for team in self.teams {
                        @if team_id == Some(team.id) {
                            option value=(team.id) selected {
                                (team.name)
                            }
                        } @else {
                            option value=(team.id) { (team.name) }
                        }
                    }
                }
            }
            label {
                "Jersey number"
                input type="number" name="jersey_number" class="input"
                      min="0" max="99" value=(jersey);
            }
            label {
                "Position"
                select name="position" class="select" {
                    @if position.is_none() {
                        option value="" selected { "—" }
                    } @else {
                        option value="" { "—" }
                    }
                    @for (value, label) in POSITIONS {
                        @if position == Some(*value) {
                            option value=(*value) selected {
                                (*label)
                            }
                        } @else {
                            option value=(*value) { (*label) }
                        }
                    }
                }
            }
            label class="field-row" {
                @if captain {
                    input type="checkbox" name="is_captain" value="true"
                          checked;
                } @else {
                    input type="checkbox" name="is_captain" value="true";
                }
                "Captain"
            }
            label {
                "Photo URL"
                input type="text" name="photo_url" class="input"
                      value=(photo);
            }
        }
        .render_to(buffer)
    }
}

#[derive(Deserialize, Debug)]
pub struct PlayerForm {
    name: String,
    #[serde(default)]
    team_id: String,
    #[serde(default)]
    jersey_number: String,
    #[serde(default)]
    position: String,
    #[serde(default)]
    is_captain: Option<String>,
    #[serde(default)]
    photo_url: String,
}

struct ParsedPlayer {
    name: String,
    team_id: Option<i64>,
    jersey_number: Option<i64>,
    position: Option<String>,
    is_captain: bool,
    photo_url: Option<String>,
}

fn parse_player_form(form: &PlayerForm) -> Result<ParsedPlayer, String> {
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Err("Player name is required".to_string());
    }

    let team_id = match form.team_id.trim() {
        "" => None,
        raw => Some(
            raw.parse::<i64>()
                .map_err(|_| "Pick a valid team".to_string())?,
        ),
    };

    let jersey_number = match form.jersey_number.trim() {
        "" => None,
        raw => match raw.parse::<i64>() {
            Ok(jersey) if (0..=99).contains(&jersey) => Some(jersey),
            _ => return Err("Jersey number must be 0-99".to_string()),
        },
    };

    let position = match form.position.trim() {
        "" => None,
        raw => {
            if !POSITIONS.iter().any(|(value, _)| *value == raw) {
                return Err("Unknown position".to_string());
            }
            Some(raw.to_string())
        }
    };

    let photo_url = match form.photo_url.trim() {
        "" => None,
        raw => {
            Url::parse(raw)
                .map_err(|_| "Photo URL is not a valid URL".to_string())?;
            Some(raw.to_string())
        }
    };

    Ok(ParsedPlayer {
        name,
        team_id,
        jersey_number,
        position,
        is_captain: form.is_captain.is_some(),
        photo_url,
    })
}

#[tracing::instrument(skip(conn, queue, form))]
pub async fn create_player(
    _admin: Admin,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
    Form(form): Form<PlayerForm>,
) -> StandardResponse {
    let parsed = match parse_player_form(&form) {
        Ok(parsed) => parsed,
        Err(why) => {
            tracing::warn!(?form, "refused player create");
            return redirect_err("/admin/players", &why);
        }
    };

    if let Some(team_id) = parsed.team_id {
        Team::fetch(team_id, &mut *conn)?;
    }

    let n = diesel::insert_into(players::table)
        .values((
            players::name.eq(&parsed.name),
            players::team_id.eq(parsed.team_id),
            players::jersey_number.eq(parsed.jersey_number),
            players::position.eq(&parsed.position),
            players::is_captain.eq(parsed.is_captain),
            players::photo_url.eq(&parsed.photo_url),
        ))
        .execute(&mut *conn)
        .unwrap();
    assert_eq!(n, 1);

    tracing::info!(name = parsed.name, "player added");
    queue.push(Msg::TeamsChanged);

    redirect_msg("/admin/players", "Player added!")
}

#[tracing::instrument(skip(conn, queue, form))]
pub async fn save_player(
    _admin: Admin,
    Path(player_id): Path<i64>,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
    Form(form): Form<PlayerForm>,
) -> StandardResponse {
    let player = Player::fetch(player_id, &mut *conn)?;

    let parsed = match parse_player_form(&form) {
        Ok(parsed) => parsed,
        Err(why) => {
            tracing::warn!(player_id, ?form, "refused player edit");
            return redirect_err("/admin/players", &why);
        }
    };

    if let Some(team_id) = parsed.team_id {
        Team::fetch(team_id, &mut *conn)?;
    }

    let n = diesel::update(players::table.filter(players::id.eq(player.id)))
        .set((
            players::name.eq(&parsed.name),
            players::team_id.eq(parsed.team_id),
            players::jersey_number.eq(parsed.jersey_number),
            players::position.eq(&parsed.position),
            players::is_captain.eq(parsed.is_captain),
            players::photo_url.eq(&parsed.photo_url),
        ))
        .execute(&mut *conn)
        .unwrap();
    assert_eq!(n, 1);

    tracing::info!(player_id, name = parsed.name, "player updated");
    queue.push(Msg::TeamsChanged);

    redirect_msg("/admin/players", "Player updated!")
}

/// Deleting a player also removes their votes and winner entries and
/// unlinks their RSVPs, so no tally or banner points at a missing row.
#[tracing::instrument(skip(conn, queue))]
pub async fn delete_player(
    _admin: Admin,
    Path(player_id): Path<i64>,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let player = Player::fetch(player_id, &mut *conn)?;

    diesel::delete(
        potw_votes::table.filter(potw_votes::player_id.eq(player.id)),
    )
    .execute(&mut *conn)
    .unwrap();
    diesel::delete(
        potw_winners::table.filter(potw_winners::player_id.eq(player.id)),
    )
    .execute(&mut *conn)
    .unwrap();
    diesel::update(rsvps::table.filter(rsvps::player_id.eq(player.id)))
        .set(rsvps::player_id.eq(None::<i64>))
        .execute(&mut *conn)
        .unwrap();

    let n =
        diesel::delete(players::table.filter(players::id.eq(player.id)))
            .execute(&mut *conn)
            .unwrap();
    assert_eq!(n, 1);

    tracing::info!(player_id, name = player.name, "player deleted");
    queue.push(Msg::TeamsChanged);

    redirect_msg("/admin/players", "Player deleted!")
}
