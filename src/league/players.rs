use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{schema::players, util_resp::FailureResponse};

#[derive(Serialize, Deserialize, Queryable, Clone, Debug, PartialEq)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub team_id: Option<i64>,
    pub jersey_number: Option<i64>,
    pub position: Option<String>,
    pub is_captain: bool,
    pub photo_url: Option<String>,
}

impl Player {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        player_id: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Player, FailureResponse> {
        players::table
            .filter(players::id.eq(player_id))
            .first::<Player>(&mut *conn)
            .optional()
            .unwrap()
            .ok_or(FailureResponse::NotFound(()))
    }

    pub fn all(
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Vec<Player> {
        players::table
            .order(players::name.asc())
            .load::<Player>(&mut *conn)
            .unwrap()
    }

    pub fn of_team(
        team_id: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Vec<Player> {
        let mut roster = players::table
            .filter(players::team_id.eq(team_id))
            .load::<Player>(&mut *conn)
            .unwrap();
        sort_roster(&mut roster);
        roster
    }

    /// Both rosters of a game, home team first, for the RSVP roster
    /// select.
    pub fn of_game_teams(
        game: &crate::league::games::Game,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Vec<Player> {
        let mut roster = Player::of_team(game.home_team_id, &mut *conn);
        roster.extend(Player::of_team(game.away_team_id, &mut *conn));
        roster
    }

    pub fn first_name(&self) -> &str {
        self.name.split(' ').next().unwrap_or(&self.name)
    }
}

/// Captains first, then by jersey number with unnumbered players last.
pub fn sort_roster(roster: &mut [Player]) {
    roster.sort_by_key(|p| (!p.is_captain, p.jersey_number.unwrap_or(99)));
}

pub const POSITIONS: &[(&str, &str)] =
    &[("guard", "Guard"), ("forward", "Forward"), ("center", "Center")];

pub fn position_label(position: &str) -> &str {
    POSITIONS
        .iter()
        .find(|(value, _)| *value == position)
        .map(|(_, label)| *label)
        .unwrap_or(position)
}

#[cfg(test)]
#[test]
fn test_sort_roster() {
    let player = |id: i64, jersey: Option<i64>, captain: bool| Player {
        id,
        name: format!("Player {id}"),
        team_id: Some(1),
        jersey_number: jersey,
        position: None,
        is_captain: captain,
        photo_url: None,
    };

    let mut roster = vec![
        player(1, Some(23), false),
        player(2, None, false),
        player(3, Some(4), false),
        player(4, Some(50), true),
    ];
    sort_roster(&mut roster);

    assert_eq!(
        roster.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![4, 3, 1, 2]
    );
}
