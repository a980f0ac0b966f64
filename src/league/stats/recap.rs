use serde::{Deserialize, Serialize};

use crate::league::{Game, stats::chronological};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TeamRecap {
    pub games_played: i64,
    pub wins: i64,
    pub losses: i64,
    pub points_for: i64,
    pub points_against: i64,
    pub diff: i64,
    /// Rounded to one decimal; zero when the team has not played.
    pub ppg: f64,
    /// Longest run of consecutive wins anywhere in the season.
    pub best_streak: i64,
    pub biggest_win: Option<BiggestWin>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BiggestWin {
    pub margin: i64,
    pub team_score: i64,
    pub opponent_score: i64,
    pub opponent: String,
}

/// Season summary for one team over its completed regular-season games.
pub fn team_recap(team_id: i64, games: &[Game]) -> TeamRecap {
    let mut recap = TeamRecap {
        games_played: 0,
        wins: 0,
        losses: 0,
        points_for: 0,
        points_against: 0,
        diff: 0,
        ppg: 0.0,
        best_streak: 0,
        biggest_win: None,
    };
    let mut run = 0;

    for game in chronological(games) {
        if !game.is_complete || !game.is_regular() {
            continue;
        }
        let is_home = game.home_team_id == team_id;
        if !is_home && game.away_team_id != team_id {
            continue;
        }
        let (Some(home_score), Some(away_score)) =
            (game.home_score, game.away_score)
        else {
            continue;
        };

        let (team_score, opponent_score, opponent) = if is_home {
            (home_score, away_score, &game.away_team)
        } else {
            (away_score, home_score, &game.home_team)
        };

        recap.games_played += 1;
        recap.points_for += team_score;
        recap.points_against += opponent_score;

        if game.home_won() == is_home {
            recap.wins += 1;
            run += 1;
            recap.best_streak = recap.best_streak.max(run);

            let margin = team_score - opponent_score;
            let beats = recap
                .biggest_win
                .as_ref()
                .is_none_or(|best| margin > best.margin);
            if beats {
                recap.biggest_win = Some(BiggestWin {
                    margin,
                    team_score,
                    opponent_score,
                    opponent: opponent.clone(),
                });
            }
        } else {
            recap.losses += 1;
            run = 0;
        }
    }

    recap.diff = recap.points_for - recap.points_against;
    if recap.games_played > 0 {
        recap.ppg = (recap.points_for as f64 * 10.0
            / recap.games_played as f64)
            .round()
            / 10.0;
    }

    recap
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeagueRecords {
    /// Highest single-team score in any completed game.
    pub highest_score: i64,
    pub highest_scorer: String,
    /// Largest winning margin and who posted it.
    pub blowout_margin: i64,
    pub blowout_winner: String,
    /// Smallest margin, kept with the scoreline it happened at.
    pub closest_margin: i64,
    pub closest_home_score: i64,
    pub closest_away_score: i64,
}

/// League-wide records over every completed game, playoffs included.
/// `None` when nothing has been played. Comparisons are strict, so the
/// chronologically first game to set a record keeps it on ties.
pub fn league_records(games: &[Game]) -> Option<LeagueRecords> {
    let mut records: Option<LeagueRecords> = None;

    for game in chronological(games) {
        if !game.is_complete {
            continue;
        }
        let (Some(home_score), Some(away_score)) =
            (game.home_score, game.away_score)
        else {
            continue;
        };

        let margin = (home_score - away_score).abs();
        let winner = if game.home_won() {
            game.home_team.clone()
        } else {
            game.away_team.clone()
        };

        let records = records.get_or_insert_with(|| LeagueRecords {
            highest_score: home_score,
            highest_scorer: game.home_team.clone(),
            blowout_margin: margin,
            blowout_winner: winner.clone(),
            closest_margin: margin,
            closest_home_score: home_score,
            closest_away_score: away_score,
        });

        // Home is considered before away, so on an equal pair the home
        // side holds the record.
        if home_score > records.highest_score {
            records.highest_score = home_score;
            records.highest_scorer = game.home_team.clone();
        }
        if away_score > records.highest_score {
            records.highest_score = away_score;
            records.highest_scorer = game.away_team.clone();
        }

        if margin > records.blowout_margin {
            records.blowout_margin = margin;
            records.blowout_winner = winner;
        }

        if margin < records.closest_margin {
            records.closest_margin = margin;
            records.closest_home_score = home_score;
            records.closest_away_score = away_score;
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::{
        stats::fixtures::{game, playoff, team},
        stats::standings,
    };

    #[test]
    fn test_empty_season() {
        let recap = team_recap(1, &[]);
        assert_eq!(recap.games_played, 0);
        assert_eq!(recap.ppg, 0.0);
        assert_eq!(recap.best_streak, 0);
        assert_eq!(recap.biggest_win, None);

        assert_eq!(league_records(&[]), None);
    }

    #[test]
    fn test_no_records_until_a_game_completes() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let games = vec![game(1, 1, &a, &b, None)];
        assert_eq!(league_records(&games), None);
    }

    #[test]
    fn test_team_recap_counts() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let games = vec![
            game(1, 1, &a, &b, Some((52, 48))),
            game(2, 2, &b, &a, Some((40, 61))),
            game(3, 3, &a, &b, Some((45, 50))),
        ];

        let recap = team_recap(a.id, &games);
        assert_eq!(recap.games_played, 3);
        assert_eq!(recap.wins, 2);
        assert_eq!(recap.losses, 1);
        assert_eq!(recap.points_for, 52 + 61 + 45);
        assert_eq!(recap.points_against, 48 + 40 + 50);
        assert_eq!(format!("{:.1}", recap.ppg), "52.7");

        let best = recap.biggest_win.unwrap();
        assert_eq!(best.margin, 21);
        assert_eq!(best.team_score, 61);
        assert_eq!(best.opponent_score, 40);
        assert_eq!(best.opponent, "Beta");
    }

    #[test]
    fn test_biggest_win_absent_without_a_win() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let games = vec![
            game(1, 1, &a, &b, Some((40, 50))),
            game(2, 2, &b, &a, Some((50, 40))),
        ];

        let recap = team_recap(a.id, &games);
        assert_eq!(recap.wins, 0);
        assert_eq!(recap.biggest_win, None);
        assert_eq!(recap.best_streak, 0);
    }

    #[test]
    fn test_best_streak_is_not_merely_trailing() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        // W W W L W: best run is 3, the trailing run only 1.
        let games = vec![
            game(1, 1, &a, &b, Some((50, 40))),
            game(2, 2, &a, &b, Some((50, 40))),
            game(3, 3, &a, &b, Some((50, 40))),
            game(4, 4, &a, &b, Some((40, 50))),
            game(5, 5, &a, &b, Some((50, 40))),
        ];

        let recap = team_recap(a.id, &games);
        assert_eq!(recap.best_streak, 3);

        let table = standings(&[a.clone(), b.clone()], &games);
        let a_row = table.iter().find(|s| s.team.id == a.id).unwrap();
        assert_eq!(a_row.streak.unwrap().label(), "W1");
        assert!(recap.best_streak >= a_row.streak.unwrap().length);
    }

    #[test]
    fn test_best_streak_equals_trailing_when_season_ends_on_best_run() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        // L W W: best run is the trailing run.
        let games = vec![
            game(1, 1, &a, &b, Some((40, 50))),
            game(2, 2, &a, &b, Some((50, 40))),
            game(3, 3, &a, &b, Some((50, 40))),
        ];

        let recap = team_recap(a.id, &games);
        let table = standings(&[a.clone(), b.clone()], &games);
        let a_row = table.iter().find(|s| s.team.id == a.id).unwrap();

        assert_eq!(recap.best_streak, 2);
        assert_eq!(a_row.streak.unwrap().label(), "W2");
        assert_eq!(recap.best_streak, a_row.streak.unwrap().length);
    }

    #[test]
    fn test_playoffs_excluded_from_team_recap() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let games = vec![
            game(1, 1, &a, &b, Some((50, 40))),
            playoff(2, 9, &a, &b, Some((99, 0)), "final"),
        ];

        let recap = team_recap(a.id, &games);
        assert_eq!(recap.games_played, 1);
        assert_eq!(recap.biggest_win.unwrap().margin, 10);
    }

    #[test]
    fn test_league_records() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let c = team(3, "Gamma");
        let games = vec![
            game(1, 1, &a, &b, Some((72, 45))),
            game(2, 2, &b, &c, Some((50, 48))),
            playoff(3, 9, &c, &a, Some((55, 54)), "final"),
        ];

        let records = league_records(&games).unwrap();
        assert_eq!(records.highest_score, 72);
        assert_eq!(records.highest_scorer, "Alpha");
        assert_eq!(records.blowout_margin, 27);
        assert_eq!(records.blowout_winner, "Alpha");
        // The playoff final's margin of 1 beats the week 2 margin of 2.
        assert_eq!(records.closest_margin, 1);
        assert_eq!((records.closest_home_score, records.closest_away_score), (55, 54));
    }

    #[test]
    fn test_closest_game_keeps_the_smaller_margin() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let games = vec![
            game(1, 1, &a, &b, Some((50, 49))),
            game(2, 2, &a, &b, Some((50, 48))),
        ];

        let records = league_records(&games).unwrap();
        assert_eq!(records.closest_margin, 1);
        assert_eq!(
            (records.closest_home_score, records.closest_away_score),
            (50, 49)
        );
    }

    #[test]
    fn test_record_ties_keep_the_first_holder() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let c = team(3, "Gamma");
        let games = vec![
            game(1, 1, &a, &b, Some((60, 50))),
            game(2, 2, &c, &b, Some((60, 50))),
        ];

        let records = league_records(&games).unwrap();
        assert_eq!(records.highest_scorer, "Alpha");
        assert_eq!(records.blowout_winner, "Alpha");
    }
}
