use axum::{Extension, extract::Path};
use axum_extra::extract::Form;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::Viewer,
    league::{games::Game, players::Player},
    msg::{Msg, MsgQueue},
    schema::rsvps,
    state::Conn,
    util_resp::{StandardResponse, bad_request, success},
    widgets::alert::ErrorAlert,
};

pub const RSVP_YES: &str = "yes";
pub const RSVP_MAYBE: &str = "maybe";

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct Rsvp {
    pub id: i64,
    pub game_id: i64,
    pub user_id: String,
    pub player_id: Option<i64>,
    pub status: String,
}

impl Rsvp {
    pub fn of_game(
        game_id: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Vec<Rsvp> {
        rsvps::table
            .filter(rsvps::game_id.eq(game_id))
            .order(rsvps::id.asc())
            .load::<Rsvp>(&mut *conn)
            .unwrap()
    }

    /// One RSVP per (game, visitor); a repeat submission overwrites both
    /// the status and the claimed roster spot.
    pub fn upsert(
        game_id: i64,
        user_id: &str,
        player_id: Option<i64>,
        status: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) {
        let n = diesel::insert_into(rsvps::table)
            .values((
                rsvps::game_id.eq(game_id),
                rsvps::user_id.eq(user_id),
                rsvps::player_id.eq(player_id),
                rsvps::status.eq(status),
            ))
            .on_conflict((rsvps::game_id, rsvps::user_id))
            .do_update()
            .set((rsvps::player_id.eq(player_id), rsvps::status.eq(status)))
            .execute(&mut *conn)
            .unwrap();
        assert_eq!(n, 1);
    }
}

/// RSVP strip under an upcoming game card: yes/maybe counts, attendee
/// chips, and the submission form.
pub struct RsvpBar<'a> {
    pub game_id: i64,
    pub rsvps: &'a [Rsvp],
    pub roster: &'a [Player],
    pub viewer_id: &'a str,
}

impl RsvpBar<'_> {
    fn mine(&self) -> Option<&Rsvp> {
        self.rsvps.iter().find(|r| r.user_id == self.viewer_id)
    }

    fn count(&self, status: &str) -> usize {
        self.rsvps.iter().filter(|r| r.status == status).count()
    }

    fn chip_label(&self, rsvp: &Rsvp) -> String {
        rsvp.player_id
            .and_then(|id| self.roster.iter().find(|p| p.id == id))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Fan".to_string())
    }
}

impl Renderable for RsvpBar<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let mine = self.mine();
        let my_status = mine.map(|r| r.status.as_str());
        let my_player = mine.and_then(|r| r.player_id);

        maud! {
            div class="rsvp game-actions" id=(format!("rsvp-{}", self.game_id)) {
                span class="rsvp-count" {
                    "✓ " (self.count(RSVP_YES))
                    " · ? " (self.count(RSVP_MAYBE))
                }
                @if self.rsvps.is_empty() {
                    span class="rsvp-count" { "No RSVPs yet" }
                } @else {
                    @for rsvp in self.rsvps {
                        span class="rsvp-count" {
                            @if rsvp.status == RSVP_YES { "✓ " } @else { "? " }
                            (self.chip_label(rsvp))
                        }
                    }
                }
                form hx-post=(format!("/games/{}/rsvp", self.game_id))
                     hx-target=(format!("#rsvp-{}", self.game_id))
                     hx-swap="outerHTML"
                     class="inline-form" {
                    select name="player_id" {
                        option value="" { "Fan (not on a roster)" }
                        @for player in self.roster {
                            @if Some(player.id) == my_player {
                                option value=(player.id) selected {
                                    (player.name)
                                }
                            } @else {
                                option value=(player.id) { (player.name) }
                            }
                        }
                    }
                    @if my_status == Some(RSVP_YES) {
                        button type="submit" name="status" value="yes"
                               class="rsvp-button selected" { "Yes ✓" }
                    } @else {
                        button type="submit" name="status" value="yes"
                               class="rsvp-button" { "Yes ✓" }
                    }
                    @if my_status == Some(RSVP_MAYBE) {
                        button type="submit" name="status" value="maybe"
                               class="rsvp-button selected" { "Maybe ?" }
                    } @else {
                        button type="submit" name="status" value="maybe"
                               class="rsvp-button" { "Maybe ?" }
                    }
                }
            }
        }
        .render_to(buffer)
    }
}

#[derive(Deserialize)]
pub struct RsvpForm {
    status: String,
    #[serde(default)]
    player_id: String,
}

#[tracing::instrument(skip(viewer, conn, queue, form))]
pub async fn submit_rsvp(
    Path(game_id): Path<i64>,
    viewer: Viewer,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
    Form(form): Form<RsvpForm>,
) -> StandardResponse {
    let game = Game::fetch(game_id, &mut *conn)?;

    if form.status != RSVP_YES && form.status != RSVP_MAYBE {
        tracing::warn!("refused RSVP with unknown status");
        return bad_request(
            maud! {
                ErrorAlert msg="RSVP must be yes or maybe.";
            }
            .render(),
        );
    }

    let player_id = match form.player_id.parse::<i64>() {
        Ok(id) => Some(Player::fetch(id, &mut *conn)?.id),
        Err(_) => None,
    };

    Rsvp::upsert(game.id, &viewer.id, player_id, &form.status, &mut *conn);

    queue.push(Msg::RsvpChanged { game_id: game.id });

    let rsvps = Rsvp::of_game(game.id, &mut *conn);
    let roster = Player::of_game_teams(&game, &mut *conn);
    success(
        RsvpBar {
            game_id: game.id,
            rsvps: &rsvps,
            roster: &roster,
            viewer_id: &viewer.id,
        }
        .render(),
    )
}
