// TODO: at some point it may make sense to separate these out. For the mean
// time, however, we send all data through a single channel.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{Receiver, error::RecvError};

/// A message which is sent after a write that changes what open pages
/// display. Feed endpoints filter these and push re-rendered fragments
/// to their sockets.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum Msg {
    /// A game's date, time or court changed.
    ScheduleChanged { game_id: i64 },
    /// A score was entered or cleared for the game.
    ResultsChanged { game_id: i64 },
    RsvpChanged { game_id: i64 },
    ReactionsChanged { game_id: i64 },
    VotesChanged { week: i64 },
    WinnerAnnounced { week: i64 },
    /// A team was renamed or recolored (games carry denormalized names).
    TeamsChanged,
}

/// Messages queued by a write handler. The transaction middleware
/// drains the queue once the request's transaction has committed, so a
/// feed task never re-renders against state the writer has not
/// committed yet. A rolled-back request's messages are discarded.
#[derive(Clone, Default)]
pub struct MsgQueue(Arc<Mutex<Vec<Msg>>>);

impl MsgQueue {
    pub fn push(&self, msg: Msg) {
        self.0.lock().unwrap().push(msg);
    }

    pub fn drain(&self) -> Vec<Msg> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// What woke a feed's send task up.
pub enum Refresh {
    /// A message the feed's filter accepted.
    Message(Msg),
    /// The receiver fell behind the channel and missed messages it
    /// cannot recover. The feed re-renders once unconditionally.
    Resync,
}

/// Waits for the next message for which `wanted` returns true. Returns
/// `None` once the channel is closed.
pub async fn next_refresh(
    rx: &mut Receiver<Msg>,
    mut wanted: impl FnMut(&Msg) -> bool,
) -> Option<Refresh> {
    loop {
        match rx.recv().await {
            Ok(msg) if wanted(&msg) => return Some(Refresh::Message(msg)),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "feed lagged, resynchronizing");
                return Some(Refresh::Resync);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use super::*;

    #[test]
    fn test_queue_drains_once() {
        let queue = MsgQueue::default();
        queue.push(Msg::TeamsChanged);
        queue.push(Msg::ResultsChanged { game_id: 3 });

        assert_eq!(queue.drain().len(), 2);
        assert!(queue.drain().is_empty());
    }

    #[tokio::test]
    async fn test_skips_messages_the_filter_rejects() {
        let (tx, mut rx) = broadcast::channel(16);
        tx.send(Msg::ReactionsChanged { game_id: 1 }).unwrap();
        tx.send(Msg::ResultsChanged { game_id: 2 }).unwrap();

        let refresh =
            next_refresh(&mut rx, |msg| {
                matches!(msg, Msg::ResultsChanged { .. })
            })
            .await;
        assert!(matches!(
            refresh,
            Some(Refresh::Message(Msg::ResultsChanged { game_id: 2 }))
        ));
    }

    #[tokio::test]
    async fn test_lagged_receiver_resynchronizes() {
        // Capacity two, five sends: the receiver is now lagged and the
        // oldest messages are gone. The feed must keep running with one
        // unconditional re-render rather than closing.
        let (tx, mut rx) = broadcast::channel(2);
        for game_id in 0..5 {
            tx.send(Msg::ResultsChanged { game_id }).unwrap();
        }

        let refresh = next_refresh(&mut rx, |_| true).await;
        assert!(matches!(refresh, Some(Refresh::Resync)));

        // The messages still buffered arrive normally afterwards.
        let refresh = next_refresh(&mut rx, |_| true).await;
        assert!(matches!(
            refresh,
            Some(Refresh::Message(Msg::ResultsChanged { game_id: 3 }))
        ));
    }

    #[tokio::test]
    async fn test_closed_channel_ends_the_feed() {
        let (tx, mut rx) = broadcast::channel(16);
        drop(tx);

        assert!(next_refresh(&mut rx, |_| true).await.is_none());
    }
}
