//! Network synchronization with the game authority.
//!
//! The sync loop polls the latest position on a fixed interval. When the
//! agent has reached a new cell it sends one action record, blocks until
//! the full world-state reply arrives, installs the reply as the current
//! snapshot, and runs the decision engine and heading tracker inline. The
//! resulting turn signal becomes pending for the motion controller.
//!
//! There are no retries: a send error, receive error or closed peer ends
//! the loop. Motion keeps running on the last pending signal.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gridbot_types::{ActionKind, ActionRecord, GridPosition, TurnSignal};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{Level, debug, info};

use crate::config::AgentConfig;
use crate::context::AgentContext;
use crate::decision::{Decision, DecisionEngine};
use crate::position::PositionSource;
use crate::wire::{WireCodec, WireError};

/// Errors that end the sync loop.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Writing the action record failed.
    #[error("failed to send action record: {source}")]
    Send {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Reading the world-state reply failed.
    #[error("failed to receive world state: {source}")]
    Receive {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The authority closed the connection.
    #[error("authority closed the connection")]
    PeerClosed,

    /// The reply could not be decoded.
    #[error("protocol error: {source}")]
    Wire {
        /// The underlying wire error.
        #[from]
        source: WireError,
    },
}

/// Change detector for position samples.
///
/// A sample is due for sending only if it differs from both the previously
/// seen sample and the last sample that completed a round trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Debouncer {
    previous: Option<GridPosition>,
    processed: Option<GridPosition>,
}

impl Debouncer {
    /// Create a debouncer that has seen nothing.
    pub const fn new() -> Self {
        Self {
            previous: None,
            processed: None,
        }
    }

    /// Feed the current sample. Returns it if it should be sent.
    pub fn observe(&mut self, sample: Option<GridPosition>) -> Option<GridPosition> {
        let sample = sample?;
        let due = self.previous != Some(sample) && self.processed != Some(sample);
        self.previous = Some(sample);
        due.then_some(sample)
    }

    /// Record that `sample` completed a round trip.
    pub const fn mark_processed(&mut self, sample: GridPosition) {
        self.processed = Some(sample);
    }
}

/// Everything one accepted sync cycle produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncCycle {
    /// The position sample that triggered the cycle.
    pub sample: GridPosition,
    /// The record sent to the authority.
    pub sent: ActionRecord,
    /// The decision taken on the reply.
    pub decision: Decision,
    /// The turn signal published for the motion controller.
    pub signal: TurnSignal,
    /// Store revision of the installed snapshot.
    pub revision: u64,
    /// When the cycle completed.
    pub completed_at: DateTime<Utc>,
}

/// Client side of the authority protocol over one persistent stream.
#[derive(Debug)]
pub struct SyncClient<S> {
    stream: S,
    codec: WireCodec,
    engine: DecisionEngine,
    context: Arc<AgentContext>,
    poll_interval: Duration,
    debouncer: Debouncer,
    next_kind: ActionKind,
}

impl<S> SyncClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a client over an already-connected stream.
    pub fn new(stream: S, config: &AgentConfig, context: Arc<AgentContext>) -> Self {
        Self {
            stream,
            codec: WireCodec::new(config.grid, config.wire),
            engine: DecisionEngine::new(config.policy, config.grid),
            context,
            poll_interval: config.authority.poll_interval(),
            debouncer: Debouncer::new(),
            next_kind: ActionKind::Move,
        }
    }

    /// Check the position once and run a round trip if it changed.
    ///
    /// Returns `None` when there was nothing to send.
    pub async fn poll_once(&mut self) -> Result<Option<SyncCycle>, SyncError> {
        let latest = self.context.position().latest_position();
        let Some(sample) = self.debouncer.observe(latest) else {
            return Ok(None);
        };
        self.round_trip(sample).await.map(Some)
    }

    /// Send the record for `sample`, apply the reply and decide.
    pub async fn round_trip(&mut self, sample: GridPosition) -> Result<SyncCycle, SyncError> {
        let sent = ActionRecord {
            position: sample,
            kind: self.next_kind,
        };
        let request = self.codec.encode_action(&sent)?;
        debug!(position = %sample, kind = %sent.kind, "sending action record");
        self.stream
            .write_all(&request)
            .await
            .map_err(|source| SyncError::Send { source })?;
        self.stream
            .flush()
            .await
            .map_err(|source| SyncError::Send { source })?;

        let mut reply = vec![0_u8; self.codec.reply_size()?];
        self.stream
            .read_exact(&mut reply)
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::UnexpectedEof => SyncError::PeerClosed,
                _ => SyncError::Receive { source },
            })?;
        let state = self.codec.decode_world_state(&reply)?;

        let revision = self.context.world().replace(state);
        let snapshot = self.context.world().current_snapshot();
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                revision,
                received_at = ?snapshot.received_at(),
                "world state\n{}",
                snapshot.render()
            );
        }

        let decision = self.engine.decide(&snapshot, sample);
        let signal = self.context.heading().commit(decision.direction);
        self.next_kind = decision.kind;
        self.debouncer.mark_processed(sample);

        let cycle = SyncCycle {
            sample,
            sent,
            decision,
            signal,
            revision,
            completed_at: Utc::now(),
        };
        info!(
            position = %cycle.sample,
            sent_kind = %cycle.sent.kind,
            direction = %cycle.decision.direction,
            next_kind = %cycle.decision.kind,
            rule = ?cycle.decision.rule,
            %signal,
            revision,
            "sync cycle complete"
        );
        self.context.record_cycle(cycle.clone());
        Ok(cycle)
    }

    /// Poll until `shutdown` fires or the connection fails.
    ///
    /// A shutdown interrupts an in-flight round trip. Returns the number of
    /// completed cycles.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<u64, SyncError> {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles: u64 = 0;

        info!(
            poll_interval_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "sync loop starting"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender also means shut down.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                step = async {
                    interval.tick().await;
                    self.poll_once().await
                } => {
                    if step?.is_some() {
                        cycles = cycles.saturating_add(1);
                    }
                }
            }
        }

        info!(cycles, "sync loop stopped");
        Ok(cycles)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use gridbot_types::{Cell, Direction, Player};
    use gridbot_world::{Grid, WorldState};
    use tokio::io::{DuplexStream, duplex};

    use super::*;
    use crate::wire::ACTION_RECORD_SIZE;

    fn setup() -> (SyncClient<DuplexStream>, DuplexStream, Arc<AgentContext>, WireCodec) {
        let config = AgentConfig::default();
        let ctx = Arc::new(AgentContext::new(&config).unwrap());
        let (client_end, authority_end) = duplex(4096);
        let client = SyncClient::new(client_end, &config, Arc::clone(&ctx));
        (client, authority_end, ctx, WireCodec::new(config.grid, config.wire))
    }

    fn world(me: (i32, i32), opponent: (i32, i32), cells: &[((i32, i32), Cell)]) -> WorldState {
        let mut grid = Grid::new(5, 5).unwrap();
        for &((row, col), cell) in cells {
            grid.set_cell(GridPosition::new(row, col), cell).unwrap();
        }
        let player = |(row, col): (i32, i32)| Player {
            position: GridPosition::new(row, col),
            score: 0,
            bomb_count: 2,
        };
        WorldState::new(grid, vec![player(me), player(opponent)]).unwrap()
    }

    /// Read one action record from the authority end and answer with `reply`.
    async fn serve_one(
        authority: &mut DuplexStream,
        codec: &WireCodec,
        reply: &WorldState,
    ) -> ActionRecord {
        let mut request = [0_u8; ACTION_RECORD_SIZE];
        authority.read_exact(&mut request).await.unwrap();
        let bytes = codec.encode_world_state(reply).unwrap();
        authority.write_all(&bytes).await.unwrap();
        codec.decode_action(&request).unwrap()
    }

    #[test]
    fn debouncer_needs_a_new_cell() {
        let a = GridPosition::new(0, 0);
        let b = GridPosition::new(0, 1);
        let mut debouncer = Debouncer::new();
        assert_eq!(debouncer.observe(None), None);
        assert_eq!(debouncer.observe(Some(a)), Some(a));
        debouncer.mark_processed(a);
        assert_eq!(debouncer.observe(Some(a)), None);
        assert_eq!(debouncer.observe(Some(b)), Some(b));
        // b was seen but never completed a round trip.
        assert_eq!(debouncer.observe(Some(a)), None);
        assert_eq!(debouncer.observe(Some(b)), Some(b));
        debouncer.mark_processed(b);
        assert_eq!(debouncer.observe(Some(a)), Some(a));
    }

    #[tokio::test]
    async fn nothing_is_sent_without_a_position() {
        let (mut client, _authority, ctx, _) = setup();
        assert!(client.poll_once().await.unwrap().is_none());
        assert_eq!(ctx.world().revision(), 0);
    }

    #[tokio::test]
    async fn round_trip_updates_world_and_heading() {
        let (mut client, mut authority, ctx, codec) = setup();
        ctx.position().publish(GridPosition::new(0, 0));

        let reply = world((0, 0), (4, 4), &[((0, 3), Cell::Reward { magnitude: 5 })]);
        let (cycle, request) = tokio::join!(
            client.poll_once(),
            serve_one(&mut authority, &codec, &reply)
        );
        let cycle = cycle.unwrap().unwrap();

        assert_eq!(request.position, GridPosition::new(0, 0));
        assert_eq!(request.kind, ActionKind::Move);
        assert_eq!(ctx.world().revision(), 1);
        assert_eq!(
            ctx.world().current_snapshot().cell(GridPosition::new(0, 3)),
            Some(Cell::Reward { magnitude: 5 })
        );
        // Start cell: decide Right; initial heading is Right.
        assert_eq!(cycle.decision.direction, Direction::Right);
        assert_eq!(cycle.signal, TurnSignal::NoTurn);
        assert_eq!(ctx.last_cycle().map(|c| c.revision), Some(1));
    }

    #[tokio::test]
    async fn same_cell_is_sent_once() {
        let (mut client, mut authority, ctx, codec) = setup();
        ctx.position().publish(GridPosition::new(2, 2));
        let reply = world((2, 2), (4, 0), &[]);
        let (first, _) = tokio::join!(
            client.poll_once(),
            serve_one(&mut authority, &codec, &reply)
        );
        assert!(first.unwrap().is_some());

        // Repeated samples of the same cell never reach the wire.
        for _ in 0..3 {
            assert!(client.poll_once().await.unwrap().is_none());
        }
        assert_eq!(ctx.world().revision(), 1);
    }

    #[tokio::test]
    async fn decided_kind_travels_with_next_record() {
        let (mut client, mut authority, ctx, codec) = setup();

        // At (2, 3) with the opponent on (3, 3): Up to (1, 3) places a hazard.
        ctx.position().publish(GridPosition::new(2, 3));
        let reply = world((2, 3), (3, 3), &[]);
        let (cycle, request) = tokio::join!(
            client.poll_once(),
            serve_one(&mut authority, &codec, &reply)
        );
        let cycle = cycle.unwrap().unwrap();
        assert_eq!(request.kind, ActionKind::Move);
        assert_eq!(cycle.decision.direction, Direction::Up);
        assert_eq!(cycle.decision.kind, ActionKind::PlaceHazard);
        assert_eq!(cycle.signal, TurnSignal::TurnLeft);

        ctx.position().publish(GridPosition::new(1, 3));
        let reply = world((1, 3), (4, 0), &[]);
        let (_, request) = tokio::join!(
            client.poll_once(),
            serve_one(&mut authority, &codec, &reply)
        );
        assert_eq!(request.position, GridPosition::new(1, 3));
        assert_eq!(request.kind, ActionKind::PlaceHazard);
    }

    #[tokio::test]
    async fn closed_peer_ends_the_loop() {
        let (mut client, authority, ctx, _) = setup();
        ctx.position().publish(GridPosition::new(1, 1));
        drop(authority);
        let result = client.poll_once().await;
        assert!(matches!(
            result,
            Err(SyncError::PeerClosed | SyncError::Send { .. })
        ));
        assert_eq!(ctx.world().revision(), 0);
    }

    #[tokio::test]
    async fn truncated_reply_is_peer_closed() {
        let (mut client, mut authority, ctx, _) = setup();
        ctx.position().publish(GridPosition::new(1, 1));
        let serve = async move {
            let mut request = [0_u8; ACTION_RECORD_SIZE];
            authority.read_exact(&mut request).await.unwrap();
            authority.write_all(&[0_u8; 10]).await.unwrap();
            drop(authority);
        };
        let (result, ()) = tokio::join!(client.poll_once(), serve);
        assert!(matches!(result, Err(SyncError::PeerClosed)));
    }

    #[tokio::test]
    async fn malformed_reply_is_a_protocol_error() {
        let (mut client, mut authority, ctx, codec) = setup();
        ctx.position().publish(GridPosition::new(1, 1));
        let serve = async {
            let mut request = [0_u8; ACTION_RECORD_SIZE];
            authority.read_exact(&mut request).await.unwrap();
            let mut bytes = codec
                .encode_world_state(&world((1, 1), (4, 4), &[]))
                .unwrap();
            // Unknown status code on the first cell.
            bytes[0..4].copy_from_slice(&9_i32.to_le_bytes());
            authority.write_all(&bytes).await.unwrap();
        };
        let (result, ()) = tokio::join!(client.poll_once(), serve);
        assert!(matches!(result, Err(SyncError::Wire { .. })));
        assert_eq!(ctx.world().revision(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_shutdown() {
        let (client, _authority, _ctx, _) = setup();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(client.run(rx));
        tokio::time::sleep(Duration::from_secs(2)).await;
        tx.send(true).unwrap();
        let cycles = handle.await.unwrap().unwrap();
        assert_eq!(cycles, 0);
    }
}
