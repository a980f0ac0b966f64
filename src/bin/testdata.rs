//! Seeds a database with a demo league: six teams with rosters, a full
//! season schedule, scores for the weeks already played, and a
//! scattering of votes, reactions and RSVPs so the pages look lived-in.

use chrono::{Days, NaiveDate};
use clap::Parser;
use courtside::{
    MIGRATIONS,
    league::{Game, settings, stats::standings::standings, teams::Team},
    schema::{
        game_reactions, games, players, potw_votes, potw_winners, rsvps,
        teams,
    },
};
use diesel::{Connection, prelude::*};
use diesel_migrations::MigrationHarness;
use rand::{Rng, SeedableRng, rngs::StdRng};
use uuid::Uuid;

#[derive(Parser)]
pub struct Seed {
    database_url: Option<String>,
    /// How many weeks of the season already have final scores.
    #[clap(long, default_value_t = 5)]
    weeks_played: i64,
    /// Date of the first game night (a Wednesday, by tradition).
    #[clap(long, default_value = "2026-01-07")]
    start_date: NaiveDate,
    /// Delete any existing league data before seeding.
    #[clap(long, action)]
    wipe: bool,
}

const TEAM_SEEDS: &[(&str, &str, &str, &str)] = &[
    ("Thunder Hawks", "THK", "#d97706", "Bring the storm"),
    ("Court Kings", "CK", "#7c3aed", "All hail"),
    ("Net Rippers", "NR", "#dc2626", "Nothing but net"),
    ("Fast Breakers", "FB", "#059669", "Run and gun"),
    ("Alley Oops", "AO", "#2563eb", "Above the rim"),
    ("Buzzer Beaters", "BB", "#db2777", "Every second counts"),
];

const FIRST_NAMES: &[&str] = &[
    "Alex", "Jordan", "Sam", "Casey", "Riley", "Morgan", "Devon", "Quinn",
    "Jamie", "Taylor", "Reese", "Drew", "Marcus", "Elena", "Priya", "Theo",
];

const LAST_NAMES: &[&str] = &[
    "Nguyen", "Okafor", "Silva", "Park", "Marsh", "Delgado", "Kim",
    "Ferraro", "Boateng", "Hughes", "Ivanov", "Castillo",
];

const SLOT_TIMES: &[&str] = &["6:00 PM", "7:00 PM", "8:00 PM"];

const REACTION_POOL: &[&str] = &["🔥", "💪", "👏", "😮", "❤️", "😭"];

fn main() {
    let args = Seed::parse();
    let db_url = if let Some(url) = args.database_url {
        url
    } else {
        std::env::var("DATABASE_URL").expect(
            "please either set `DATABASE_URL` or pass the database url \
             as the first argument",
        )
    };

    let mut conn = diesel::SqliteConnection::establish(&db_url).unwrap();
    conn.run_pending_migrations(MIGRATIONS).unwrap();
    settings::ensure_defaults(&mut conn);

    if args.wipe {
        diesel::delete(game_reactions::table)
            .execute(&mut conn)
            .unwrap();
        diesel::delete(rsvps::table).execute(&mut conn).unwrap();
        diesel::delete(potw_votes::table).execute(&mut conn).unwrap();
        diesel::delete(potw_winners::table)
            .execute(&mut conn)
            .unwrap();
        diesel::delete(games::table).execute(&mut conn).unwrap();
        diesel::delete(players::table).execute(&mut conn).unwrap();
        diesel::delete(teams::table).execute(&mut conn).unwrap();
    }

    let existing = teams::table
        .count()
        .get_result::<i64>(&mut conn)
        .unwrap();
    if existing > 0 {
        eprintln!(
            "database already has {existing} teams; pass --wipe to reseed"
        );
        std::process::exit(1);
    }

    let config = settings::LeagueConfig::load(&mut conn);
    let weeks_played = args.weeks_played.clamp(0, config.total_weeks);

    // Deterministic, so repeated seeds of fresh databases agree.
    let mut rng = StdRng::seed_from_u64(24);

    let team_ids = create_teams(&mut conn);
    create_rosters(&team_ids, &mut rng, &mut conn);
    create_regular_season(
        &team_ids,
        &config,
        args.start_date,
        weeks_played,
        &mut rng,
        &mut conn,
    );
    create_playoffs(&config, args.start_date, weeks_played, &mut rng, &mut conn);
    create_fan_activity(weeks_played, &mut rng, &mut conn);

    let n_games = games::table.count().get_result::<i64>(&mut conn).unwrap();
    println!(
        "seeded {} teams, {n_games} games, {weeks_played} weeks played",
        team_ids.len()
    );
}

fn create_teams(conn: &mut SqliteConnection) -> Vec<i64> {
    TEAM_SEEDS
        .iter()
        .enumerate()
        .map(|(i, (name, short_name, color, motto))| {
            let id = i as i64 + 1;
            diesel::insert_into(teams::table)
                .values((
                    teams::id.eq(id),
                    teams::name.eq(name),
                    teams::short_name.eq(short_name),
                    teams::color.eq(color),
                    teams::motto.eq(motto),
                ))
                .execute(conn)
                .unwrap();
            id
        })
        .collect()
}

fn create_rosters(
    team_ids: &[i64],
    rng: &mut StdRng,
    conn: &mut SqliteConnection,
) {
    let positions = ["guard", "guard", "forward", "forward", "center"];

    for &team_id in team_ids {
        let mut jerseys: Vec<i64> =
            (0..8).map(|_| rng.random_range(0..100)).collect();
        jerseys.dedup();

        for (i, jersey) in jerseys.iter().enumerate() {
            let name = format!(
                "{} {}",
                FIRST_NAMES[rng.random_range(0..FIRST_NAMES.len())],
                LAST_NAMES[rng.random_range(0..LAST_NAMES.len())],
            );

            diesel::insert_into(players::table)
                .values((
                    players::name.eq(&name),
                    players::team_id.eq(team_id),
                    players::jersey_number.eq(jersey),
                    players::position.eq(positions[i % positions.len()]),
                    players::is_captain.eq(i == 0),
                ))
                .execute(conn)
                .unwrap();
        }
    }
}

/// Circle-method round robin: team 1 stays put, the rest rotate. Six
/// teams give five distinct rounds, which repeat to fill the season.
fn round_robin_week(team_ids: &[i64], week: i64) -> Vec<(i64, i64)> {
    let n = team_ids.len();
    let mut rotated: Vec<i64> = team_ids[1..].to_vec();
    rotated.rotate_right((week - 1) as usize % (n - 1));

    let mut pairs = vec![(team_ids[0], rotated[0])];
    for i in 1..n / 2 {
        pairs.push((rotated[i], rotated[n - 1 - i]));
    }
    pairs
}

#[allow(clippy::too_many_arguments)]
fn insert_game(
    week: i64,
    game_date: NaiveDate,
    slot: usize,
    home: &Team,
    away: &Team,
    score: Option<(i64, i64)>,
    game_type: &str,
    conn: &mut SqliteConnection,
) {
    diesel::insert_into(games::table)
        .values((
            games::week.eq(week),
            games::game_date.eq(game_date),
            games::game_time.eq(SLOT_TIMES[slot % SLOT_TIMES.len()]),
            games::court.eq(slot as i64 % SLOT_TIMES.len() as i64 + 1),
            games::home_team_id.eq(home.id),
            games::away_team_id.eq(away.id),
            games::home_team.eq(&home.name),
            games::away_team.eq(&away.name),
            games::home_score.eq(score.map(|(h, _)| h)),
            games::away_score.eq(score.map(|(_, a)| a)),
            games::is_complete.eq(score.is_some()),
            games::game_type.eq(game_type),
        ))
        .execute(conn)
        .unwrap();
}

fn random_score(rng: &mut StdRng) -> (i64, i64) {
    loop {
        let home = rng.random_range(35..=78);
        let away = rng.random_range(35..=78);
        if home != away {
            return (home, away);
        }
    }
}

fn create_regular_season(
    team_ids: &[i64],
    config: &settings::LeagueConfig,
    start_date: NaiveDate,
    weeks_played: i64,
    rng: &mut StdRng,
    conn: &mut SqliteConnection,
) {
    let all_teams = Team::all(conn);
    let team = |id: i64| all_teams.iter().find(|t| t.id == id).unwrap();

    for week in 1..=config.regular_weeks {
        let game_date = start_date
            .checked_add_days(Days::new(7 * (week as u64 - 1)))
            .unwrap();

        for (slot, (home, away)) in
            round_robin_week(team_ids, week).into_iter().enumerate()
        {
            let score = (week <= weeks_played).then(|| random_score(rng));
            insert_game(
                week,
                game_date,
                slot,
                team(home),
                team(away),
                score,
                "regular",
                conn,
            );
        }
    }
}

/// Playoff bracket from the current table: the top two seeds host three
/// and four in the semifinals while the bottom two meet in the play-in.
/// Championship week pairs the top seeds and the middle seeds, which
/// stands in for the semifinal winners until real results exist.
fn create_playoffs(
    config: &settings::LeagueConfig,
    start_date: NaiveDate,
    weeks_played: i64,
    rng: &mut StdRng,
    conn: &mut SqliteConnection,
) {
    if config.total_weeks <= config.regular_weeks {
        return;
    }

    let all_teams = Team::all(conn);
    let all_games = Game::all(conn);
    let table = standings(&all_teams, &all_games);
    let seed: Vec<&Team> = table.iter().map(|s| &s.team).collect();

    let semis_week = config.regular_weeks + 1;
    let semis_date = start_date
        .checked_add_days(Days::new(7 * (semis_week as u64 - 1)))
        .unwrap();

    let score = (weeks_played >= semis_week).then(|| random_score(rng));
    insert_game(semis_week, semis_date, 0, seed[0], seed[3], score, "semifinal", conn);
    let score = (weeks_played >= semis_week).then(|| random_score(rng));
    insert_game(semis_week, semis_date, 1, seed[1], seed[2], score, "semifinal", conn);
    let score = (weeks_played >= semis_week).then(|| random_score(rng));
    insert_game(semis_week, semis_date, 2, seed[4], seed[5], score, "playin", conn);

    let final_week = config.total_weeks;
    let final_date = start_date
        .checked_add_days(Days::new(7 * (final_week as u64 - 1)))
        .unwrap();

    let score = (weeks_played >= final_week).then(|| random_score(rng));
    insert_game(final_week, final_date, 0, seed[2], seed[3], score, "third_place", conn);
    let score = (weeks_played >= final_week).then(|| random_score(rng));
    insert_game(final_week, final_date, 1, seed[0], seed[1], score, "final", conn);
}

fn create_fan_activity(
    weeks_played: i64,
    rng: &mut StdRng,
    conn: &mut SqliteConnection,
) {
    let player_ids = players::table
        .select(players::id)
        .load::<i64>(conn)
        .unwrap();
    let completed: Vec<i64> = games::table
        .filter(games::is_complete.eq(true))
        .select(games::id)
        .load::<i64>(conn)
        .unwrap();

    // A small crowd of regulars who vote and react most weeks.
    let fans: Vec<String> =
        (0..12).map(|_| Uuid::new_v4().to_string()).collect();

    for week in 1..=weeks_played {
        for fan in fans.iter().take(rng.random_range(5..=fans.len())) {
            let player = player_ids[rng.random_range(0..player_ids.len())];
            diesel::insert_into(potw_votes::table)
                .values((
                    potw_votes::week.eq(week),
                    potw_votes::player_id.eq(player),
                    potw_votes::voter_id.eq(fan),
                ))
                .on_conflict_do_nothing()
                .execute(conn)
                .unwrap();
        }

        // The winner lags a week behind: this week's vote is still open.
        if week < weeks_played {
            let player = player_ids[rng.random_range(0..player_ids.len())];
            diesel::insert_into(potw_winners::table)
                .values((
                    potw_winners::week.eq(week),
                    potw_winners::player_id.eq(player),
                    potw_winners::announcement
                        .eq("Dominant on both ends all night."),
                ))
                .execute(conn)
                .unwrap();
        }
    }

    for game_id in &completed {
        for fan in fans.iter().take(rng.random_range(0..=6)) {
            let emoji = REACTION_POOL[rng.random_range(0..REACTION_POOL.len())];
            diesel::insert_into(game_reactions::table)
                .values((
                    game_reactions::game_id.eq(game_id),
                    game_reactions::user_id.eq(fan),
                    game_reactions::reaction.eq(emoji),
                ))
                .on_conflict_do_nothing()
                .execute(conn)
                .unwrap();
        }
    }

    // RSVPs land on the first upcoming week.
    let upcoming: Vec<i64> = games::table
        .filter(games::is_complete.eq(false))
        .filter(games::week.eq(weeks_played + 1))
        .select(games::id)
        .load::<i64>(conn)
        .unwrap();
    for game_id in upcoming {
        for fan in fans.iter().take(rng.random_range(2..=8)) {
            let status = if rng.random_bool(0.7) { "yes" } else { "maybe" };
            diesel::insert_into(rsvps::table)
                .values((
                    rsvps::game_id.eq(game_id),
                    rsvps::user_id.eq(fan),
                    rsvps::status.eq(status),
                ))
                .on_conflict_do_nothing()
                .execute(conn)
                .unwrap();
        }
    }
}
