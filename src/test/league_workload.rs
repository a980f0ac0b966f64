//! Season workload run over the real router: seeds a four-team league,
//! walks the admin flows over HTTP, and checks what the public pages
//! and the database report afterwards.

use axum::{extract::Request, http::header::COOKIE};
use diesel::{
    SqliteConnection,
    prelude::*,
    r2d2::{ConnectionManager, Pool},
};
use tower::{Service, ServiceExt};

use crate::{
    config::create_app,
    schema::{game_reactions, games, players, potw_votes, potw_winners, rsvps},
    state::DbPool,
};

// This is a macro rather than a function because the `assert!` panic
// then directly notes the span of the call site (rather than requiring
// a look at the stack trace to find it).
macro_rules! assert_res_ok {
    ($response:expr) => {
        assert!(
            $response.status().is_success()
                || $response.status().is_redirection(),
            "response status = {:?}, str = {}",
            $response.status(),
            {
                let body_bytes =
                    axum::body::to_bytes($response.into_body(), usize::MAX)
                        .await
                        .unwrap();
                let body_str = String::from_utf8_lossy(&body_bytes).to_string();
                body_str
            }
        );
    };
}

const DEFAULT_PIN: &str = "1234";

async fn get(
    app: &mut (impl Service<
        Request,
        Response = axum::response::Response,
        Error = std::convert::Infallible,
    >),
    path: &str,
    cookies: &str,
) -> axum::response::Response {
    let request = Request::builder()
        .method("GET")
        .uri(path)
        .header(COOKIE, cookies)
        .body(axum::body::Body::empty())
        .unwrap();

    app.ready().await.unwrap().call(request).await.unwrap()
}

async fn post(
    app: &mut (impl Service<
        Request,
        Response = axum::response::Response,
        Error = std::convert::Infallible,
    >),
    path: &str,
    cookies: &str,
    form: &[(&str, &str)],
) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(COOKIE, cookies)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(axum::body::Body::from(
            serde_urlencoded::to_string(form).unwrap(),
        ))
        .unwrap();

    app.ready().await.unwrap().call(request).await.unwrap()
}

/// The `name=value` part of a set-cookie header, ready to send back.
fn returned_cookie(
    response: &axum::response::Response,
    name: &str,
) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(name))
        .map(|value| value.split(';').next().unwrap().to_string())
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}

/// Four teams and a three-week double-header round robin, entered
/// straight into the database the way the seed tool would.
fn seed_league(conn: &mut SqliteConnection) {
    let team_rows = [
        (1, "Hawks", "HWK", "#d97706"),
        (2, "Bulls", "BUL", "#dc2626"),
        (3, "Kings", "KNG", "#7c3aed"),
        (4, "Nets", "NET", "#2563eb"),
    ];
    for (id, name, code, color) in team_rows {
        diesel::insert_into(crate::schema::teams::table)
            .values((
                crate::schema::teams::id.eq(id),
                crate::schema::teams::name.eq(name),
                crate::schema::teams::short_name.eq(code),
                crate::schema::teams::color.eq(color),
            ))
            .execute(conn)
            .unwrap();
    }

    let game_rows = [
        (1, 1, 1, 2, "Hawks", "Bulls"),
        (2, 1, 3, 4, "Kings", "Nets"),
        (3, 2, 1, 3, "Hawks", "Kings"),
        (4, 2, 2, 4, "Bulls", "Nets"),
        (5, 3, 1, 4, "Hawks", "Nets"),
        (6, 3, 2, 3, "Bulls", "Kings"),
    ];
    for (id, week, home_id, away_id, home, away) in game_rows {
        diesel::insert_into(games::table)
            .values((
                games::id.eq(id),
                games::week.eq(week),
                games::game_time.eq("6:00 PM"),
                games::court.eq(1),
                games::home_team_id.eq(home_id),
                games::away_team_id.eq(away_id),
                games::home_team.eq(home),
                games::away_team.eq(away),
                games::game_type.eq("regular"),
            ))
            .execute(conn)
            .unwrap();
    }

    for (id, name, team_id) in [(1, "Ada Larkin", 1), (2, "Bo Tran", 2)] {
        diesel::insert_into(players::table)
            .values((
                players::id.eq(id),
                players::name.eq(name),
                players::team_id.eq(team_id),
                players::jersey_number.eq(id * 10),
                players::is_captain.eq(true),
            ))
            .execute(conn)
            .unwrap();
    }
}

#[tokio::test]
async fn full_season_workload() {
    let pool: DbPool = Pool::builder()
        .max_size(1)
        .build(ConnectionManager::<SqliteConnection>::new(":memory:"))
        .unwrap();

    let app = create_app(pool.clone());
    let mut app = app.into_service();
    let app = app.ready().await.unwrap();

    {
        let mut conn = pool.get().unwrap();
        seed_league(&mut conn);
    }
    assert_eq!(pool.state().idle_connections, 1);

    // An anonymous visit mints a visitor cookie.
    let response = get(&mut app.clone(), "/", "").await;
    let visitor = returned_cookie(&response, "courtside_visitor")
        .expect("first visit sets a visitor cookie");
    let body = body_text(response).await;
    assert!(body.contains("Hawks"));
    assert!(body.contains("vs"));

    // The admin panel bounces anonymous visitors to the login page.
    let response = get(&mut app.clone(), "/admin/scores", &visitor).await;
    assert!(response.status().is_redirection());
    assert!(
        response
            .headers()
            .get("location")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("/admin/login")
    );

    // Wrong PIN is a 400 with the form re-rendered; the right one sets
    // the admin session cookie.
    let response = post(
        &mut app.clone(),
        "/admin/login",
        &visitor,
        &[("pin", "0000")],
    )
    .await;
    assert_eq!(response.status(), 400);

    let response = post(
        &mut app.clone(),
        "/admin/login",
        &visitor,
        &[("pin", DEFAULT_PIN)],
    )
    .await;
    assert!(response.status().is_redirection());
    let admin = returned_cookie(&response, "nothing_but_net")
        .expect("login sets the admin cookie");
    let as_admin = format!("{visitor}; {admin}");

    let response = get(&mut app.clone(), "/admin/scores", &as_admin).await;
    assert_res_ok!(response);

    // RSVP to an upcoming game, then change the answer. One row per
    // visitor, holding the latest status.
    let response = post(
        &mut app.clone(),
        "/games/5/rsvp",
        &visitor,
        &[("status", "yes"), ("player_id", "")],
    )
    .await;
    assert_res_ok!(response);
    let response = post(
        &mut app.clone(),
        "/games/5/rsvp",
        &visitor,
        &[("status", "maybe"), ("player_id", "1")],
    )
    .await;
    assert_res_ok!(response);
    {
        let mut conn = pool.get().unwrap();
        let rows = rsvps::table
            .filter(rsvps::game_id.eq(5))
            .select((rsvps::status, rsvps::player_id))
            .load::<(String, Option<i64>)>(&mut conn)
            .unwrap();
        assert_eq!(rows, vec![("maybe".to_string(), Some(1))]);
    }

    // Enter the season's results. Hawks and Bulls both finish 2-1;
    // the Bulls' differential (+9) beats the Hawks' (-18).
    let results: &[(i64, &str, &str)] = &[
        (1, "50", "48"),
        (2, "60", "40"),
        (3, "55", "50"),
        (4, "70", "60"),
        (5, "40", "65"),
        (6, "61", "60"),
    ];
    for (game_id, home, away) in results {
        let response = post(
            &mut app.clone(),
            &format!("/admin/games/{game_id}/score"),
            &as_admin,
            &[("home_score", home), ("away_score", away)],
        )
        .await;
        assert_res_ok!(response);
    }
    {
        let mut conn = pool.get().unwrap();
        let complete = games::table
            .filter(games::is_complete.eq(true))
            .count()
            .get_result::<i64>(&mut conn)
            .unwrap();
        assert_eq!(complete, 6);
    }

    // Standings rank by wins, then differential; streak labels come
    // from the trailing run.
    let response = get(&mut app.clone(), "/standings", &visitor).await;
    assert!(response.status().is_success());
    let body = body_text(response).await;
    let rank = |needle: &str| body.find(needle).unwrap();
    assert!(rank("Bulls") < rank("Hawks"));
    assert!(rank("Hawks") < rank("Kings"));
    assert!(rank("Kings") < rank("Nets"));
    assert!(body.contains("W2"));
    assert!(body.contains("L1"));

    // Head-to-head compare card for the two teams that met in week 1.
    let response =
        get(&mut app.clone(), "/standings?compare=1,2", &visitor).await;
    assert!(response.status().is_success());
    let body = body_text(response).await;
    assert!(body.contains("Head-to-head"));

    let response = get(&mut app.clone(), "/recap", &visitor).await;
    assert!(response.status().is_success());
    let body = body_text(response).await;
    assert!(body.contains("Season Recap"));
    assert!(body.contains("League Records"));

    let response = get(&mut app.clone(), "/teams/1", &visitor).await;
    assert_res_ok!(response);

    // A cleared score reopens the game.
    let response =
        post(&mut app.clone(), "/admin/games/6/clear", &as_admin, &[]).await;
    assert_res_ok!(response);
    {
        let mut conn = pool.get().unwrap();
        let (complete, home_score) = games::table
            .filter(games::id.eq(6))
            .select((games::is_complete, games::home_score))
            .first::<(bool, Option<i64>)>(&mut conn)
            .unwrap();
        assert!(!complete);
        assert_eq!(home_score, None);
    }
    let response = post(
        &mut app.clone(),
        "/admin/games/6/score",
        &as_admin,
        &[("home_score", "61"), ("away_score", "60")],
    )
    .await;
    assert_res_ok!(response);

    // Reactions overwrite per (game, visitor): one row, latest emoji.
    let response = post(
        &mut app.clone(),
        "/games/1/react",
        &visitor,
        &[("reaction", "🔥")],
    )
    .await;
    assert_res_ok!(response);
    let response = post(
        &mut app.clone(),
        "/games/1/react",
        &visitor,
        &[("reaction", "👏")],
    )
    .await;
    assert_res_ok!(response);
    {
        let mut conn = pool.get().unwrap();
        let rows = game_reactions::table
            .filter(game_reactions::game_id.eq(1))
            .select(game_reactions::reaction)
            .load::<String>(&mut conn)
            .unwrap();
        assert_eq!(rows, vec!["👏".to_string()]);
    }

    // Votes are first-write-wins per (week, visitor). A second ballot
    // from the same visitor changes nothing; a different visitor's
    // ballot counts.
    let response = get(&mut app.clone(), "/vote?week=1", &visitor).await;
    assert_res_ok!(response);
    let response = post(
        &mut app.clone(),
        "/vote",
        &visitor,
        &[("week", "1"), ("player_id", "1")],
    )
    .await;
    assert_res_ok!(response);
    let response = post(
        &mut app.clone(),
        "/vote",
        &visitor,
        &[("week", "1"), ("player_id", "2")],
    )
    .await;
    assert_res_ok!(response);
    let response = post(
        &mut app.clone(),
        "/vote",
        "",
        &[("week", "1"), ("player_id", "2")],
    )
    .await;
    assert_res_ok!(response);
    {
        let mut conn = pool.get().unwrap();
        let rows = potw_votes::table
            .filter(potw_votes::week.eq(1))
            .order(potw_votes::id.asc())
            .select(potw_votes::player_id)
            .load::<i64>(&mut conn)
            .unwrap();
        assert_eq!(rows, vec![1, 2]);
    }

    // Announcing a winner twice keeps one row per week, the later pick.
    let response = post(
        &mut app.clone(),
        "/admin/potw/winner",
        &as_admin,
        &[("week", "1"), ("player_id", "1")],
    )
    .await;
    assert_res_ok!(response);
    let response = post(
        &mut app.clone(),
        "/admin/potw/winner",
        &as_admin,
        &[("week", "1"), ("player_id", "2"), ("announcement", "Huge night")],
    )
    .await;
    assert_res_ok!(response);
    {
        let mut conn = pool.get().unwrap();
        let rows = potw_winners::table
            .filter(potw_winners::week.eq(1))
            .select(potw_winners::player_id)
            .load::<i64>(&mut conn)
            .unwrap();
        assert_eq!(rows, vec![2]);
    }
    let response = get(&mut app.clone(), "/vote?week=1", &visitor).await;
    assert!(response.status().is_success());
    let body = body_text(response).await;
    assert!(body.contains("Bo Tran"));

    // Disabling voting blocks ballots until it is switched back on.
    let response =
        post(&mut app.clone(), "/admin/settings/voting", &as_admin, &[])
            .await;
    assert_res_ok!(response);
    let response = post(
        &mut app.clone(),
        "/vote",
        "",
        &[("week", "2"), ("player_id", "1")],
    )
    .await;
    assert_eq!(response.status(), 400);
    let response =
        post(&mut app.clone(), "/admin/settings/voting", &as_admin, &[])
            .await;
    assert_res_ok!(response);

    // Renaming a team rewrites the denormalized names on its games.
    let response = post(
        &mut app.clone(),
        "/admin/teams/1",
        &as_admin,
        &[
            ("name", "Harbor Hawks"),
            ("short_name", "hhk"),
            ("color", "#d97706"),
            ("motto", "Fly together"),
        ],
    )
    .await;
    assert_res_ok!(response);
    {
        let mut conn = pool.get().unwrap();
        let names = games::table
            .filter(games::home_team_id.eq(1))
            .select(games::home_team)
            .load::<String>(&mut conn)
            .unwrap();
        assert!(names.iter().all(|name| name == "Harbor Hawks"));
        let code = crate::schema::teams::table
            .filter(crate::schema::teams::id.eq(1))
            .select(crate::schema::teams::short_name)
            .first::<String>(&mut conn)
            .unwrap();
        assert_eq!(code, "HHK");
    }

    // Roster management: create, then delete, a player over HTTP.
    let response = post(
        &mut app.clone(),
        "/admin/players",
        &as_admin,
        &[
            ("name", "Nia Whitfield"),
            ("team_id", "3"),
            ("jersey_number", "7"),
            ("position", "center"),
        ],
    )
    .await;
    assert_res_ok!(response);
    let new_id = {
        let mut conn = pool.get().unwrap();
        players::table
            .filter(players::name.eq("Nia Whitfield"))
            .select(players::id)
            .first::<i64>(&mut conn)
            .unwrap()
    };
    let response = post(
        &mut app.clone(),
        &format!("/admin/players/{new_id}/delete"),
        &as_admin,
        &[],
    )
    .await;
    assert_res_ok!(response);
    {
        let mut conn = pool.get().unwrap();
        let remaining = players::table
            .filter(players::id.eq(new_id))
            .count()
            .get_result::<i64>(&mut conn)
            .unwrap();
        assert_eq!(remaining, 0);
    }

    // A new PIN that is not at least four digits is refused and the
    // stored PIN stays put.
    let response = post(
        &mut app.clone(),
        "/admin/settings/pin",
        &as_admin,
        &[
            ("current_pin", DEFAULT_PIN),
            ("new_pin", "abcd"),
            ("confirm_pin", "abcd"),
        ],
    )
    .await;
    assert_res_ok!(response);
    {
        let mut conn = pool.get().unwrap();
        assert!(crate::league::settings::verify_admin_pin(
            DEFAULT_PIN,
            &mut conn
        ));
    }

    // Changing the PIN invalidates the old one for future logins.
    let response = post(
        &mut app.clone(),
        "/admin/settings/pin",
        &as_admin,
        &[
            ("current_pin", DEFAULT_PIN),
            ("new_pin", "24680"),
            ("confirm_pin", "24680"),
        ],
    )
    .await;
    assert_res_ok!(response);

    let response = post(
        &mut app.clone(),
        "/admin/logout",
        &as_admin,
        &[],
    )
    .await;
    assert_res_ok!(response);

    let response = post(
        &mut app.clone(),
        "/admin/login",
        &visitor,
        &[("pin", DEFAULT_PIN)],
    )
    .await;
    assert_eq!(response.status(), 400);

    let response = post(
        &mut app.clone(),
        "/admin/login",
        &visitor,
        &[("pin", "24680")],
    )
    .await;
    assert_res_ok!(response);

    assert_eq!(pool.state().idle_connections, 1);
}
