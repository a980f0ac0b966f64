//! Write handlers queue broadcast messages instead of sending them;
//! the transaction middleware flushes the queue only after a
//! successful commit. These tests pin that ordering down: a feed that
//! wakes on a message must find the write already committed, and a
//! refused write must not wake feeds at all.

use axum::{
    Extension, Router, body::Body, extract::Request, middleware,
    routing::post,
};
use axum_extra::extract::cookie::Key;
use diesel::{
    SqliteConnection,
    prelude::*,
    r2d2::{ConnectionManager, Pool},
};
use diesel_migrations::MigrationHarness;
use hypertext::prelude::*;
use tokio::sync::broadcast::{self, Sender, error::TryRecvError};
use tower::{Service, ServiceExt};

use crate::{
    MIGRATIONS,
    msg::{Msg, MsgQueue},
    schema::teams,
    state::{AppState, Conn, DbPool, tx_commit},
    util_resp::{StandardResponse, bad_request, success},
};

async fn save_row(
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
) -> StandardResponse {
    diesel::insert_into(teams::table)
        .values((
            teams::name.eq("Hawks"),
            teams::short_name.eq("HWK"),
            teams::color.eq("#1e3a5f"),
        ))
        .execute(&mut *conn)
        .unwrap();
    queue.push(Msg::TeamsChanged);

    success(maud! { p { "saved" } }.render())
}

async fn save_row_then_refuse(
    Extension(queue): Extension<MsgQueue>,
    mut conn: Conn<true>,
) -> StandardResponse {
    diesel::insert_into(teams::table)
        .values((
            teams::name.eq("Bulls"),
            teams::short_name.eq("BUL"),
            teams::color.eq("#dc2626"),
        ))
        .execute(&mut *conn)
        .unwrap();
    queue.push(Msg::TeamsChanged);

    bad_request(maud! { p { "refused" } }.render())
}

fn test_app(pool: DbPool, tx: Sender<Msg>) -> Router {
    let state = AppState {
        pool: pool.clone(),
        key: Key::generate(),
    };

    Router::new()
        .route("/save", post(save_row))
        .route("/refuse", post(save_row_then_refuse))
        .layer(middleware::from_fn(tx_commit))
        .layer(Extension(pool))
        .layer(Extension(tx))
        .with_state(state)
}

async fn run(
    app: &mut (impl Service<
        Request,
        Response = axum::response::Response,
        Error = std::convert::Infallible,
    >),
    path: &str,
) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .body(Body::empty())
        .unwrap();

    app.ready().await.unwrap().call(request).await.unwrap()
}

#[tokio::test]
async fn test_broadcasts_follow_the_commit() {
    let pool: DbPool = Pool::builder()
        .max_size(1)
        .build(ConnectionManager::<SqliteConnection>::new(":memory:"))
        .unwrap();
    {
        let mut conn = pool.get().unwrap();
        conn.run_pending_migrations(MIGRATIONS).unwrap();
    }

    let (tx, mut rx) = broadcast::channel::<Msg>(16);
    let mut app = test_app(pool.clone(), tx).into_service();

    // A successful write commits, and only then does the queued
    // message go out. The single-connection pool guarantees the
    // handler's transaction is finished by the time we observe it.
    let response = run(&mut app, "/save").await;
    assert!(response.status().is_success());
    assert!(matches!(rx.try_recv(), Ok(Msg::TeamsChanged)));
    {
        let mut conn = pool.get().unwrap();
        let count: i64 =
            teams::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 1);
    }

    // A refused write rolls back; its queued message is discarded, so
    // open pages are not told to re-render state that never landed.
    let response = run(&mut app, "/refuse").await;
    assert_eq!(response.status(), 400);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    {
        let mut conn = pool.get().unwrap();
        let count: i64 =
            teams::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 1);
    }
}
