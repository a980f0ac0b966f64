use axum::{
    Extension, Router, middleware,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use diesel_migrations::MigrationHarness;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    MIGRATIONS,
    admin::{
        admin_index,
        players::{create_player, delete_player, players_tab, save_player},
        potw::{announce_winner, potw_tab},
        schedule::{save_schedule, schedule_tab},
        scores::{clear_score, save_score, scores_page},
        settings::{
            change_pin, save_league_config, settings_tab, toggle_voting,
        },
        teams::{save_team, teams_tab},
    },
    auth::{
        dismiss_install_banner, ensure_visitor,
        login::{do_admin_login, do_admin_logout, login_page},
        toggle_theme,
    },
    league::{
        potw::{submit_vote, vote_page, vote_updates},
        reactions::submit_reaction,
        recap::recap_page,
        rsvps::submit_rsvp,
        schedule::{schedule_page, schedule_updates},
        settings::{self, LeagueConfig},
        standings::{standings_page, standings_updates},
        teams::{team_detail_page, teams_page},
    },
    msg::Msg,
    state::{AppState, Conn, DbPool, tx_commit},
};

/// Web-app manifest, so "add to home screen" installs a standalone app.
async fn manifest(mut conn: Conn<true>) -> axum::Json<serde_json::Value> {
    let config = LeagueConfig::load(&mut *conn);

    axum::Json(json!({
        "name": config.name,
        "short_name": config.abbrv,
        "start_url": "/",
        "display": "standalone",
        "background_color": "#f1f5f9",
        "theme_color": "#1e3a5f",
        "icons": [],
    }))
}

/// Builds the application router. Runs pending migrations and seeds the
/// default settings first, so both `main` and the tests get a working
/// app from a bare pool.
pub fn create_app(pool: DbPool) -> Router {
    {
        let mut conn = pool.get().unwrap();
        conn.run_pending_migrations(MIGRATIONS).unwrap();
        settings::ensure_defaults(&mut conn);
    }

    let key = match std::env::var("SECRET_KEY") {
        Ok(secret) => Key::from(secret.as_bytes()),
        Err(_) => Key::generate(),
    };

    let state = AppState {
        pool: pool.clone(),
        key,
    };

    let (tx, _rx) = tokio::sync::broadcast::channel::<Msg>(1000);

    Router::new()
        .route("/", get(schedule_page))
        .route("/schedule/ws", get(schedule_updates))
        .route("/standings", get(standings_page))
        .route("/standings/ws", get(standings_updates))
        .route("/teams", get(teams_page))
        .route("/teams/:team_id", get(team_detail_page))
        .route("/vote", get(vote_page).post(submit_vote))
        .route("/vote/ws", get(vote_updates))
        .route("/recap", get(recap_page))
        .route("/games/:game_id/react", post(submit_reaction))
        .route("/games/:game_id/rsvp", post(submit_rsvp))
        .route("/theme", post(toggle_theme))
        .route("/install/dismiss", post(dismiss_install_banner))
        .route("/manifest.json", get(manifest))
        .route("/admin", get(admin_index))
        .route("/admin/login", get(login_page).post(do_admin_login))
        .route("/admin/logout", post(do_admin_logout))
        .route("/admin/scores", get(scores_page))
        .route("/admin/games/:game_id/score", post(save_score))
        .route("/admin/games/:game_id/clear", post(clear_score))
        .route("/admin/schedule", get(schedule_tab))
        .route("/admin/games/:game_id/schedule", post(save_schedule))
        .route("/admin/teams", get(teams_tab))
        .route("/admin/teams/:team_id", post(save_team))
        .route("/admin/players", get(players_tab).post(create_player))
        .route("/admin/players/:player_id", post(save_player))
        .route("/admin/players/:player_id/delete", post(delete_player))
        .route("/admin/potw", get(potw_tab))
        .route("/admin/potw/winner", post(announce_winner))
        .route("/admin/settings", get(settings_tab))
        .route("/admin/settings/pin", post(change_pin))
        .route("/admin/settings/voting", post(toggle_voting))
        .route("/admin/settings/league", post(save_league_config))
        .layer(middleware::from_fn(tx_commit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ensure_visitor,
        ))
        .layer(Extension(pool))
        .layer(Extension(tx))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
