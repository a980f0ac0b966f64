use serde::{Deserialize, Serialize};

use crate::league::Game;

/// Record between exactly two teams, over every completed meeting
/// (playoffs included). `first`/`second` follow the argument order of
/// [`head_to_head`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HeadToHead {
    NoMeetings,
    Record {
        games: i64,
        first_wins: i64,
        second_wins: i64,
        first_points: i64,
        second_points: i64,
    },
}

pub fn head_to_head(first: i64, second: i64, games: &[Game]) -> HeadToHead {
    let mut meetings = 0;
    let (mut first_wins, mut second_wins) = (0, 0);
    let (mut first_points, mut second_points) = (0, 0);

    for game in games {
        if !game.is_complete {
            continue;
        }
        let pair = (game.home_team_id, game.away_team_id);
        if pair != (first, second) && pair != (second, first) {
            continue;
        }
        let (Some(home_score), Some(away_score)) =
            (game.home_score, game.away_score)
        else {
            continue;
        };

        meetings += 1;
        let (first_score, second_score) = if game.home_team_id == first {
            (home_score, away_score)
        } else {
            (away_score, home_score)
        };
        first_points += first_score;
        second_points += second_score;

        let home_is_first = game.home_team_id == first;
        if game.home_won() == home_is_first {
            first_wins += 1;
        } else {
            second_wins += 1;
        }
    }

    if meetings == 0 {
        HeadToHead::NoMeetings
    } else {
        HeadToHead::Record {
            games: meetings,
            first_wins,
            second_wins,
            first_points,
            second_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::stats::fixtures::{game, playoff, team};

    #[test]
    fn test_no_meetings() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let c = team(3, "Gamma");
        let games = vec![game(1, 1, &a, &c, Some((50, 40)))];

        assert_eq!(head_to_head(a.id, b.id, &games), HeadToHead::NoMeetings);
    }

    #[test]
    fn test_counts_both_hostings() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let c = team(3, "Gamma");
        let games = vec![
            game(1, 1, &a, &b, Some((52, 48))),
            game(2, 2, &b, &a, Some((60, 55))),
            // Upcoming and third-party games are invisible to the pair.
            game(3, 3, &a, &b, None),
            game(4, 3, &a, &c, Some((99, 1))),
        ];

        assert_eq!(
            head_to_head(a.id, b.id, &games),
            HeadToHead::Record {
                games: 2,
                first_wins: 1,
                second_wins: 1,
                first_points: 52 + 55,
                second_points: 48 + 60,
            }
        );
    }

    #[test]
    fn test_playoff_meetings_count() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let games =
            vec![playoff(1, 9, &a, &b, Some((70, 65)), "final")];

        assert_eq!(
            head_to_head(b.id, a.id, &games),
            HeadToHead::Record {
                games: 1,
                first_wins: 0,
                second_wins: 1,
                first_points: 65,
                second_points: 70,
            }
        );
    }
}
