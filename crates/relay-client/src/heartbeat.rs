//! Heartbeat liveness monitoring.
//!
//! While a session is promoted, a presence frame is sent on every interval
//! tick and the send instant is published as the health evidence — the
//! server's acknowledgment is not awaited. The loop runs only for the
//! lifetime of one session: it is started on promotion and cancelled
//! synchronously on teardown, so no tick can fire after disconnect.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use relay_wire::ClientFrame;

use crate::events::ClientEvent;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The session was torn down and the loop cancelled.
    Cancelled,
    /// The outbound queue closed underneath the loop.
    ChannelClosed,
}

/// Run the presence heartbeat for one session.
///
/// The first tick fires one full `interval` after promotion, then once per
/// interval. Missed ticks are skipped rather than burst, so a stalled
/// runtime never floods the server with catch-up frames.
pub async fn run_heartbeat(
    interval: Duration,
    out_tx: mpsc::Sender<ClientFrame>,
    events_tx: broadcast::Sender<ClientEvent>,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Skip the immediate first tick
    let _ = ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
            _ = ticker.tick() => {
                if out_tx.send(ClientFrame::Presence).await.is_err() {
                    return HeartbeatResult::ChannelClosed;
                }
                // Send is the health evidence; acknowledgment is not awaited.
                let _ = events_tx.send(ClientEvent::Heartbeat(Utc::now()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> (
        mpsc::Sender<ClientFrame>,
        mpsc::Receiver<ClientFrame>,
        broadcast::Sender<ClientEvent>,
    ) {
        let (out_tx, out_rx) = mpsc::channel(64);
        let (events_tx, _) = broadcast::channel(64);
        (out_tx, out_rx, events_tx)
    }

    #[tokio::test]
    async fn cancelled_immediately() {
        let (out_tx, _out_rx, events_tx) = channels();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result =
            run_heartbeat(Duration::from_secs(5), out_tx, events_tx, cancel).await;
        assert_eq!(result, HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn no_presence_before_first_interval() {
        let (out_tx, mut out_rx, events_tx) = channels();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let task = tokio::spawn(run_heartbeat(
            Duration::from_secs(5),
            out_tx,
            events_tx,
            cancel2,
        ));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(out_rx.try_recv().is_err());

        cancel.cancel();
        assert_eq!(task.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn sends_one_presence_per_interval() {
        let (out_tx, mut out_rx, events_tx) = channels();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let task = tokio::spawn(run_heartbeat(
            Duration::from_secs(5),
            out_tx,
            events_tx,
            cancel2,
        ));

        // 26 time units at a 5-unit interval → ticks at 5, 10, 15, 20, 25.
        tokio::time::sleep(Duration::from_secs(26)).await;
        cancel.cancel();
        let _ = task.await.unwrap();

        let mut count = 0;
        while let Ok(frame) = out_rx.try_recv() {
            assert_eq!(frame, ClientFrame::Presence);
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn strictly_zero_after_cancel() {
        let (out_tx, mut out_rx, events_tx) = channels();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let task = tokio::spawn(run_heartbeat(
            Duration::from_secs(5),
            out_tx,
            events_tx,
            cancel2,
        ));

        tokio::time::sleep(Duration::from_secs(11)).await;
        cancel.cancel();
        let _ = task.await.unwrap();

        // Drain what was sent before the cancel.
        while out_rx.try_recv().is_ok() {}

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(out_rx.try_recv().is_err(), "no tick may fire after teardown");
    }

    #[tokio::test(start_paused = true)]
    async fn closed_queue_ends_loop() {
        let (out_tx, out_rx, events_tx) = channels();
        drop(out_rx);
        let cancel = CancellationToken::new();

        let result =
            run_heartbeat(Duration::from_secs(5), out_tx, events_tx, cancel).await;
        assert_eq!(result, HeartbeatResult::ChannelClosed);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_event_carries_send_instant() {
        let (out_tx, _out_rx, events_tx) = channels();
        let mut events = events_tx.subscribe();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let task = tokio::spawn(run_heartbeat(
            Duration::from_secs(5),
            out_tx,
            events_tx,
            cancel2,
        ));

        tokio::time::sleep(Duration::from_secs(6)).await;
        cancel.cancel();
        let _ = task.await.unwrap();

        match events.recv().await.unwrap() {
            ClientEvent::Heartbeat(_) => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
