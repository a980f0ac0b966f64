use axum::{Extension, extract::Path};
use axum_extra::extract::Form;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::Viewer,
    league::games::Game,
    msg::{Msg, MsgQueue},
    schema::game_reactions,
    state::Conn,
    util_resp::{StandardResponse, bad_request, success},
    widgets::alert::ErrorAlert,
};

/// The fixed emoji palette fans can react with.
pub const REACTION_EMOJI: &[&str] = &["🔥", "💪", "👏", "😮", "😭", "❤️"];

#[derive(Serialize, Deserialize, Queryable, Clone, Debug)]
pub struct Reaction {
    pub id: i64,
    pub game_id: i64,
    pub user_id: String,
    pub reaction: String,
}

impl Reaction {
    pub fn of_game(
        game_id: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Vec<Reaction> {
        game_reactions::table
            .filter(game_reactions::game_id.eq(game_id))
            .order(game_reactions::id.asc())
            .load::<Reaction>(&mut *conn)
            .unwrap()
    }

    /// One reaction per (game, visitor); a repeat tap overwrites.
    pub fn upsert(
        game_id: i64,
        user_id: &str,
        reaction: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) {
        let n = diesel::insert_into(game_reactions::table)
            .values((
                game_reactions::game_id.eq(game_id),
                game_reactions::user_id.eq(user_id),
                game_reactions::reaction.eq(reaction),
            ))
            .on_conflict((game_reactions::game_id, game_reactions::user_id))
            .do_update()
            .set(game_reactions::reaction.eq(reaction))
            .execute(&mut *conn)
            .unwrap();
        assert_eq!(n, 1);
    }
}

/// Reaction strip under a completed game card: the most-chosen emoji with
/// counts, then the full palette as submit buttons.
pub struct ReactionBar<'a> {
    pub game_id: i64,
    pub reactions: &'a [Reaction],
    pub viewer_id: &'a str,
}

impl ReactionBar<'_> {
    fn mine(&self) -> Option<&str> {
        self.reactions
            .iter()
            .find(|r| r.user_id == self.viewer_id)
            .map(|r| r.reaction.as_str())
    }

    /// The (up to four) most-chosen emoji with their counts, ordered by
    /// count descending with palette order breaking ties.
    fn top_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts = REACTION_EMOJI
            .iter()
            .map(|emoji| {
                (
                    *emoji,
                    self.reactions
                        .iter()
                        .filter(|r| r.reaction == *emoji)
                        .count(),
                )
            })
            .filter(|(_, count)| *count > 0)
            .collect::<Vec<_>>();
        counts.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
        counts.truncate(4);
        counts
    }
}

impl Renderable for ReactionBar<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let mine = self.mine();
        let top = self.top_counts();

        maud! {
            div class="reactions game-actions" id=(format!("reactions-{}", self.game_id)) {
                @for (emoji, count) in &top {
                    span class="rsvp-count" { (emoji) " " (count) }
                }
                @for emoji in REACTION_EMOJI {
                    form hx-post=(format!("/games/{}/react", self.game_id))
                         hx-target=(format!("#reactions-{}", self.game_id))
                         hx-swap="outerHTML"
                         class="inline-form" {
                        input type="text" hidden value=(emoji) name="reaction";
                        @if mine == Some(emoji) {
                            button type="submit"
                                   class="reaction-button selected" {
                                (emoji)
                            }
                        } @else {
                            button type="submit" class="reaction-button" {
                                (emoji)
                            }
                        }
                    }
                }
            }
        }
        .render_to(buffer)
    }
}

#[derive(Deserialize)]
pub struct ReactForm {
    reaction: String,
}

#[tracing::instrument(skip(viewer, conn, queue, form))]
pub async fn submit_reaction(
    Path(game_id): Path<i64>,
    viewer: Viewer,
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
    Form(form): Form<ReactForm>,
) -> StandardResponse {
    let game = Game::fetch(game_id, &mut *conn)?;

    if !REACTION_EMOJI.contains(&form.reaction.as_str()) {
        tracing::warn!("refused reaction outside the palette");
        return bad_request(
            maud! {
                ErrorAlert msg="That reaction is not in the palette.";
            }
            .render(),
        );
    }

    Reaction::upsert(game.id, &viewer.id, &form.reaction, &mut *conn);

    queue.push(Msg::ReactionsChanged { game_id: game.id });

    let reactions = Reaction::of_game(game.id, &mut *conn);
    success(
        ReactionBar {
            game_id: game.id,
            reactions: &reactions,
            viewer_id: &viewer.id,
        }
        .render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction(user: &str, emoji: &str) -> Reaction {
        Reaction {
            id: 0,
            game_id: 1,
            user_id: user.to_string(),
            reaction: emoji.to_string(),
        }
    }

    #[test]
    fn test_top_counts_order() {
        let reactions = vec![
            reaction("a", "👏"),
            reaction("b", "👏"),
            reaction("c", "🔥"),
            reaction("d", "❤️"),
        ];
        let bar = ReactionBar {
            game_id: 1,
            reactions: &reactions,
            viewer_id: "a",
        };

        assert_eq!(bar.top_counts(), vec![("👏", 2), ("🔥", 1), ("❤️", 1)]);
        assert_eq!(bar.mine(), Some("👏"));
    }

    #[test]
    fn test_top_counts_caps_at_four() {
        let reactions = vec![
            reaction("a", "🔥"),
            reaction("b", "💪"),
            reaction("c", "👏"),
            reaction("d", "😮"),
            reaction("e", "😭"),
        ];
        let bar = ReactionBar {
            game_id: 1,
            reactions: &reactions,
            viewer_id: "nobody",
        };

        assert_eq!(bar.top_counts().len(), 4);
        assert_eq!(bar.mine(), None);
    }
}
