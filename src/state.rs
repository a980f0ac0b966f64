use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use axum::{
    Extension, async_trait,
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::Key;
use diesel::{
    SqliteConnection,
    connection::{AnsiTransactionManager, TransactionManager},
    r2d2::{ConnectionManager, Pool, PooledConnection},
};
use tokio::sync::broadcast::Sender;

use crate::msg::{Msg, MsgQueue};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Shared application state. The key signs and encrypts the private
/// cookies which carry visitor ids and admin sessions.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub key: Key,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

/// Middleware which finishes the per-request transaction after the
/// handler has run. The slot is planted empty; the first `Conn<true>`
/// extractor fills it with a connection and an open transaction.
///
/// Handlers queue feed messages rather than sending them, and the
/// queue is flushed here once the transaction has committed. A feed
/// task that wakes on a message therefore always reads committed rows.
pub async fn tx_commit(
    Extension(tx): Extension<Sender<Msg>>,
    mut req: Request,
    next: Next,
) -> Response {
    let slot: ThreadSafeConn<true> = ThreadSafeConn {
        inner: Arc::new(tokio::sync::Mutex::new(None)),
    };
    req.extensions_mut().insert(slot.clone());

    let queue = MsgQueue::default();
    req.extensions_mut().insert(queue.clone());

    let res = next.run(req).await;

    let committed = res.status().is_success()
        || res.status().is_redirection()
        || res.status().is_informational();

    let mut guard = slot.inner.lock().await;
    if let Some(mut conn) = guard.take() {
        if committed {
            AnsiTransactionManager::commit_transaction(&mut *conn).unwrap();
        } else {
            AnsiTransactionManager::rollback_transaction(&mut *conn).unwrap();
        }
    }
    drop(guard);

    if committed {
        for msg in queue.drain() {
            let _ = tx.send(msg);
        }
    }

    res
}

pub struct Conn<const TX: bool> {
    inner: tokio::sync::OwnedMutexGuard<
        Option<PooledConnection<ConnectionManager<SqliteConnection>>>,
    >,
}

impl<const TX: bool> Deref for Conn<TX> {
    type Target = PooledConnection<ConnectionManager<SqliteConnection>>;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref().unwrap()
    }
}

impl<const TX: bool> DerefMut for Conn<TX> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut().unwrap()
    }
}

#[async_trait]
impl<const TX: bool, S> FromRequestParts<S> for Conn<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let wrapper = ThreadSafeConn::<TX>::from_request_parts(parts, state)
            .await
            .unwrap();

        Ok(Conn {
            inner: wrapper.inner.clone().try_lock_owned().unwrap(),
        })
    }
}

/// A handle to the request's pooled connection which can be shared with
/// other extractors. Cached in the request extensions so that every
/// extractor in one request sees the same connection (and therefore the
/// same transaction).
#[derive(Clone)]
pub struct ThreadSafeConn<const TX: bool> {
    pub inner: Arc<
        tokio::sync::Mutex<
            Option<PooledConnection<ConnectionManager<SqliteConnection>>>,
        >,
    >,
}

#[async_trait]
impl<const TX: bool, S> FromRequestParts<S> for ThreadSafeConn<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let slot = match parts.extensions.get::<ThreadSafeConn<TX>>() {
            Some(slot) => slot.clone(),
            None => {
                let slot: ThreadSafeConn<TX> = ThreadSafeConn {
                    inner: Arc::new(tokio::sync::Mutex::new(None)),
                };
                parts.extensions.insert(slot.clone());
                slot
            }
        };

        let mut guard = slot.inner.lock().await;
        if guard.is_none() {
            let pool = DbPool::from_ref(state);
            let mut conn =
                tokio::task::spawn_blocking(move || pool.get().unwrap())
                    .await
                    .unwrap();

            if TX {
                AnsiTransactionManager::begin_transaction(&mut *conn)
                    .unwrap();
            }

            *guard = Some(conn);
        }
        drop(guard);

        Ok(slot)
    }
}
