//! Pure aggregation over the season's game list. Nothing in here
//! touches the database; callers load the games and teams once and hand
//! them in as slices.

use serde::{Deserialize, Serialize};

use crate::league::Game;

pub mod h2h;
pub mod recap;
pub mod standings;

pub use h2h::{HeadToHead, head_to_head};
pub use recap::{LeagueRecords, TeamRecap, league_records, team_recap};
pub use standings::{TeamStanding, standings};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Streak {
    pub outcome: Outcome,
    pub length: i64,
}

impl Streak {
    /// "W3" / "L2" as shown in the standings table.
    pub fn label(&self) -> String {
        match self.outcome {
            Outcome::Win => format!("W{}", self.length),
            Outcome::Loss => format!("L{}", self.length),
        }
    }
}

/// Games in chronological order. Week is the chronological unit; the id
/// tiebreak pins an order within a week, so every aggregate is
/// independent of how the input slice happened to be arranged.
pub(crate) fn chronological(games: &[Game]) -> Vec<&Game> {
    let mut ordered: Vec<&Game> = games.iter().collect();
    ordered.sort_by_key(|g| (g.week, g.id));
    ordered
}

/// The current streak: scan backward from the latest outcome until the
/// letter changes. No games means no streak.
pub(crate) fn trailing_streak(outcomes: &[Outcome]) -> Option<Streak> {
    let last = *outcomes.last()?;
    let length = outcomes
        .iter()
        .rev()
        .take_while(|outcome| **outcome == last)
        .count() as i64;

    Some(Streak {
        outcome: last,
        length,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::league::{Game, Team};

    pub fn team(id: i64, name: &str) -> Team {
        Team {
            id,
            name: name.to_string(),
            short_name: name.chars().take(3).collect::<String>().to_uppercase(),
            color: "#1e3a5f".to_string(),
            motto: None,
        }
    }

    pub fn game(
        id: i64,
        week: i64,
        home: &Team,
        away: &Team,
        score: Option<(i64, i64)>,
    ) -> Game {
        Game {
            id,
            week,
            game_date: None,
            game_time: "6:00 PM".to_string(),
            court: 1,
            home_team_id: home.id,
            away_team_id: away.id,
            home_team: home.name.clone(),
            away_team: away.name.clone(),
            home_score: score.map(|(h, _)| h),
            away_score: score.map(|(_, a)| a),
            is_complete: score.is_some(),
            game_type: "regular".to_string(),
        }
    }

    pub fn playoff(
        id: i64,
        week: i64,
        home: &Team,
        away: &Team,
        score: Option<(i64, i64)>,
        game_type: &str,
    ) -> Game {
        Game {
            game_type: game_type.to_string(),
            ..game(id, week, home, away, score)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_streak() {
        use Outcome::*;

        assert_eq!(trailing_streak(&[]), None);
        assert_eq!(
            trailing_streak(&[Win, Loss, Win, Win]),
            Some(Streak {
                outcome: Win,
                length: 2
            })
        );
        assert_eq!(
            trailing_streak(&[Loss, Loss]),
            Some(Streak {
                outcome: Loss,
                length: 2
            })
        );
        assert_eq!(trailing_streak(&[Win, Loss, Win]).unwrap().label(), "W1");
    }
}
