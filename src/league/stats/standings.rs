use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::league::{
    Game, Team,
    stats::{Outcome, Streak, chronological, trailing_streak},
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TeamStanding {
    pub team: Team,
    pub wins: i64,
    pub losses: i64,
    pub points_for: i64,
    pub points_against: i64,
    pub diff: i64,
    pub streak: Option<Streak>,
}

/// Folds the season into one ranked record per team. Only completed
/// regular-season games count; games referencing unknown teams are
/// skipped. Rank order is wins desc, then differential desc, then
/// points-for desc, with remaining ties left in team-list order (the
/// sort is stable).
pub fn standings(teams: &[Team], games: &[Game]) -> Vec<TeamStanding> {
    let mut records: Vec<TeamStanding> = teams
        .iter()
        .map(|team| TeamStanding {
            team: team.clone(),
            wins: 0,
            losses: 0,
            points_for: 0,
            points_against: 0,
            diff: 0,
            streak: None,
        })
        .collect();
    let index: HashMap<i64, usize> = teams
        .iter()
        .enumerate()
        .map(|(i, team)| (team.id, i))
        .collect();
    let mut histories: Vec<Vec<Outcome>> = vec![Vec::new(); teams.len()];

    for game in chronological(games) {
        if !game.is_complete || !game.is_regular() {
            continue;
        }
        let (Some(&home), Some(&away)) = (
            index.get(&game.home_team_id),
            index.get(&game.away_team_id),
        ) else {
            continue;
        };
        let (Some(home_score), Some(away_score)) =
            (game.home_score, game.away_score)
        else {
            continue;
        };

        let (winner, loser) = if game.home_won() {
            (home, away)
        } else {
            (away, home)
        };
        records[winner].wins += 1;
        records[loser].losses += 1;
        histories[winner].push(Outcome::Win);
        histories[loser].push(Outcome::Loss);

        records[home].points_for += home_score;
        records[home].points_against += away_score;
        records[away].points_for += away_score;
        records[away].points_against += home_score;
    }

    for (record, history) in records.iter_mut().zip(&histories) {
        record.diff = record.points_for - record.points_against;
        record.streak = trailing_streak(history);
    }

    records.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then(b.diff.cmp(&a.diff))
            .then(b.points_for.cmp(&a.points_for))
    });

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::stats::fixtures::{game, playoff, team};

    #[test]
    fn test_zero_games_is_zero_record() {
        let teams = vec![team(1, "Hawks"), team(2, "Owls")];
        let table = standings(&teams, &[]);

        assert_eq!(table.len(), 2);
        for standing in &table {
            assert_eq!(standing.wins, 0);
            assert_eq!(standing.losses, 0);
            assert_eq!(standing.points_for, 0);
            assert_eq!(standing.points_against, 0);
            assert_eq!(standing.diff, 0);
            assert_eq!(standing.streak, None);
        }
        // Ties all the way down leave the team-list order untouched.
        assert_eq!(table[0].team.id, 1);
        assert_eq!(table[1].team.id, 2);
    }

    #[test]
    fn test_win_loss_and_points() {
        let hawks = team(1, "Hawks");
        let owls = team(2, "Owls");
        let games = vec![
            game(1, 1, &hawks, &owls, Some((52, 48))),
            game(2, 2, &owls, &hawks, Some((60, 55))),
            game(3, 3, &hawks, &owls, Some((41, 40))),
        ];

        let table = standings(&[hawks.clone(), owls.clone()], &games);

        let hawks_row =
            table.iter().find(|s| s.team.id == hawks.id).unwrap();
        assert_eq!(hawks_row.wins, 2);
        assert_eq!(hawks_row.losses, 1);
        assert_eq!(hawks_row.points_for, 52 + 55 + 41);
        assert_eq!(hawks_row.points_against, 48 + 60 + 40);
        assert_eq!(
            hawks_row.diff,
            hawks_row.points_for - hawks_row.points_against
        );

        let owls_row = table.iter().find(|s| s.team.id == owls.id).unwrap();
        assert_eq!(owls_row.wins, 1);
        assert_eq!(owls_row.losses, 2);
    }

    #[test]
    fn test_differential_breaks_win_ties() {
        // Two wins each; B's +15 beats A's +10, so B ranks first.
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let c = team(3, "Gamma");
        let d = team(4, "Delta");
        let games = vec![
            game(1, 1, &a, &c, Some((50, 40))),
            game(2, 1, &b, &d, Some((50, 40))),
            game(3, 2, &a, &d, Some((50, 40))),
            game(4, 2, &b, &c, Some((50, 40))),
            game(5, 3, &c, &a, Some((60, 50))),
            game(6, 3, &d, &b, Some((50, 45))),
        ];

        let table =
            standings(&[a.clone(), b.clone(), c.clone(), d.clone()], &games);

        let a_row = table.iter().find(|s| s.team.id == a.id).unwrap();
        let b_row = table.iter().find(|s| s.team.id == b.id).unwrap();
        assert_eq!((a_row.wins, a_row.points_for, a_row.points_against), (2, 150, 140));
        assert_eq!((b_row.wins, b_row.points_for, b_row.points_against), (2, 145, 130));

        let a_pos = table.iter().position(|s| s.team.id == a.id).unwrap();
        let b_pos = table.iter().position(|s| s.team.id == b.id).unwrap();
        assert!(b_pos < a_pos, "B (+15) should rank above A (+10)");
    }

    #[test]
    fn test_points_for_breaks_differential_ties() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let c = team(3, "Gamma");
        let d = team(4, "Delta");
        // A and B each one win by 10, but B scored more along the way.
        let games = vec![
            game(1, 1, &a, &c, Some((50, 40))),
            game(2, 1, &b, &d, Some((70, 60))),
        ];

        let table =
            standings(&[a.clone(), b.clone(), c.clone(), d.clone()], &games);

        let a_pos = table.iter().position(|s| s.team.id == a.id).unwrap();
        let b_pos = table.iter().position(|s| s.team.id == b.id).unwrap();
        assert!(b_pos < a_pos);
    }

    #[test]
    fn test_permuting_input_changes_nothing() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let c = team(3, "Gamma");
        let teams = vec![a.clone(), b.clone(), c.clone()];
        // Week 2 holds two games so a same-week swap is exercised too.
        let games = vec![
            game(1, 1, &a, &b, Some((50, 40))),
            game(2, 2, &b, &c, Some((55, 50))),
            game(3, 2, &a, &c, Some((48, 52))),
            game(4, 3, &c, &a, Some((40, 45))),
        ];

        let reference = standings(&teams, &games);

        let mut swapped_same_week = games.clone();
        swapped_same_week.swap(1, 2);
        assert_eq!(standings(&teams, &swapped_same_week), reference);

        let mut reversed = games.clone();
        reversed.reverse();
        assert_eq!(standings(&teams, &reversed), reference);
    }

    #[test]
    fn test_streaks_follow_week_order() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let games = vec![
            game(1, 1, &a, &b, Some((40, 50))),
            game(2, 2, &a, &b, Some((50, 40))),
            game(3, 3, &b, &a, Some((40, 50))),
        ];

        // Input deliberately out of chronological order.
        let shuffled = vec![games[2].clone(), games[0].clone(), games[1].clone()];
        let table = standings(&[a.clone(), b.clone()], &shuffled);

        let a_row = table.iter().find(|s| s.team.id == a.id).unwrap();
        assert_eq!(a_row.streak.unwrap().label(), "W2");
        let b_row = table.iter().find(|s| s.team.id == b.id).unwrap();
        assert_eq!(b_row.streak.unwrap().label(), "L2");
    }

    #[test]
    fn test_playoff_games_do_not_count() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let games = vec![
            game(1, 1, &a, &b, Some((50, 40))),
            playoff(2, 9, &b, &a, Some((60, 40)), "final"),
        ];

        let table = standings(&[a.clone(), b.clone()], &games);

        let b_row = table.iter().find(|s| s.team.id == b.id).unwrap();
        assert_eq!(b_row.wins, 0);
        assert_eq!(b_row.points_for, 40);
    }

    #[test]
    fn test_unknown_team_reference_is_skipped() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let ghost = team(99, "Ghost");
        let games = vec![
            game(1, 1, &a, &b, Some((50, 40))),
            game(2, 2, &a, &ghost, Some((99, 0))),
        ];

        let table = standings(&[a.clone(), b.clone()], &games);

        let a_row = table.iter().find(|s| s.team.id == a.id).unwrap();
        assert_eq!(a_row.wins, 1);
        assert_eq!(a_row.points_for, 50);
    }

    #[test]
    fn test_equal_scores_credit_away() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let games = vec![game(1, 1, &a, &b, Some((50, 50)))];

        let table = standings(&[a.clone(), b.clone()], &games);

        let b_row = table.iter().find(|s| s.team.id == b.id).unwrap();
        assert_eq!(b_row.wins, 1);
    }

    #[test]
    fn test_incomplete_games_do_not_count() {
        let a = team(1, "Alpha");
        let b = team(2, "Beta");
        let games = vec![game(1, 1, &a, &b, None)];

        let table = standings(&[a.clone(), b.clone()], &games);
        assert!(table.iter().all(|s| s.wins == 0 && s.losses == 0));
    }
}
