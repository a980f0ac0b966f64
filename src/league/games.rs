use chrono::NaiveDate;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{schema::games, util_resp::FailureResponse};

pub const GAME_TYPE_REGULAR: &str = "regular";

/// The game-type tags an admin can assign, with their display badges.
/// Only `regular` games count toward standings and recap totals.
pub const GAME_TYPES: &[(&str, &str)] = &[
    ("regular", ""),
    ("playin", "Play-in"),
    ("semifinal", "Semifinal"),
    ("final", "🏆 Championship"),
    ("third_place", "3rd Place"),
];

#[derive(Serialize, Deserialize, Queryable, Clone, Debug, PartialEq)]
pub struct Game {
    pub id: i64,
    pub week: i64,
    pub game_date: Option<NaiveDate>,
    pub game_time: String,
    pub court: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub is_complete: bool,
    pub game_type: String,
}

impl Game {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        game_id: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Game, FailureResponse> {
        games::table
            .filter(games::id.eq(game_id))
            .first::<Game>(&mut *conn)
            .optional()
            .unwrap()
            .ok_or(FailureResponse::NotFound(()))
    }

    /// Every game, in chronological `(week, id)` order.
    pub fn all(conn: &mut impl LoadConnection<Backend = Sqlite>) -> Vec<Game> {
        games::table
            .order((games::week.asc(), games::id.asc()))
            .load::<Game>(&mut *conn)
            .unwrap()
    }

    pub fn for_week(
        week: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Vec<Game> {
        let mut week_games = games::table
            .filter(games::week.eq(week))
            .order(games::id.asc())
            .load::<Game>(&mut *conn)
            .unwrap();
        sort_for_display(&mut week_games);
        week_games
    }

    pub fn involving_team(
        team_id: i64,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Vec<Game> {
        games::table
            .filter(
                games::home_team_id
                    .eq(team_id)
                    .or(games::away_team_id.eq(team_id)),
            )
            .order((games::week.asc(), games::id.asc()))
            .load::<Game>(&mut *conn)
            .unwrap()
    }

    pub fn badge(&self) -> Option<&'static str> {
        GAME_TYPES
            .iter()
            .find(|(value, _)| *value == self.game_type)
            .map(|(_, badge)| *badge)
            .filter(|badge| !badge.is_empty())
    }

    pub fn is_regular(&self) -> bool {
        self.game_type == GAME_TYPE_REGULAR
    }

    /// Winner's side for a completed game: true for home. Equal scores
    /// credit the away side (the comparison is strict); league games
    /// cannot end tied.
    pub fn home_won(&self) -> bool {
        self.home_score > self.away_score
    }
}

/// Within a week, games display ordered by date (undated last), then
/// time of day, then court.
pub fn sort_for_display(week_games: &mut [Game]) {
    week_games.sort_by_key(|g| {
        (
            g.game_date.unwrap_or(NaiveDate::MAX),
            time_sort_key(&g.game_time),
            g.court,
        )
    });
}

/// Sort key for display times like "6:00 PM". Unparsable strings sort
/// first, which matches how the schedule has always behaved.
pub fn time_sort_key(time: &str) -> i64 {
    let Some((clock, meridiem)) = time.split_once(' ') else {
        return 0;
    };
    let Some((hours, minutes)) = clock.split_once(':') else {
        return 0;
    };
    let (Ok(mut hours), Ok(minutes)) =
        (hours.parse::<i64>(), minutes.parse::<i64>())
    else {
        return 0;
    };

    match meridiem {
        "PM" if hours != 12 => hours += 12,
        "AM" if hours == 12 => hours = 0,
        "AM" | "PM" => {}
        _ => return 0,
    }

    hours * 100 + minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_sort_key() {
        assert_eq!(time_sort_key("6:00 PM"), 1800);
        assert_eq!(time_sort_key("12:15 PM"), 1215);
        assert_eq!(time_sort_key("12:05 AM"), 5);
        assert_eq!(time_sort_key("9:30 AM"), 930);
        assert_eq!(time_sort_key("whenever"), 0);
    }

    #[test]
    fn test_evening_order() {
        assert!(time_sort_key("6:00 PM") < time_sort_key("7:15 PM"));
        assert!(time_sort_key("11:00 AM") < time_sort_key("1:00 PM"));
    }
}
