//! Integration tests for the sync client against a loopback authority.
//!
//! A scripted authority listens on `127.0.0.1:0`, answers every action
//! record with a world state that places the agent on the reported cell,
//! and records what it received. The client runs its real poll loop over a
//! `TcpStream`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use gridbot_core::config::AgentConfig;
use gridbot_core::context::AgentContext;
use gridbot_core::sync::{SyncClient, SyncError};
use gridbot_core::wire::{ACTION_RECORD_SIZE, WireCodec};
use gridbot_types::{ActionKind, ActionRecord, Cell, Direction, GridPosition, Player, TurnSignal};
use gridbot_world::{Grid, WorldState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

fn test_config() -> AgentConfig {
    let mut config = AgentConfig::default();
    config.authority.poll_interval_ms = 10;
    config
}

/// World with a reward column on the right and the opponent parked at (4, 0).
fn reply_for(record: &ActionRecord) -> WorldState {
    let mut grid = Grid::new(5, 5).unwrap();
    for row in 0..5 {
        grid.set_cell(GridPosition::new(row, 4), Cell::Reward { magnitude: 3 })
            .unwrap();
    }
    let me = Player {
        position: record.position,
        score: 0,
        bomb_count: 2,
    };
    let opponent = Player {
        position: GridPosition::new(4, 0),
        score: 0,
        bomb_count: 2,
    };
    WorldState::new(grid, vec![me, opponent]).unwrap()
}

/// Serve up to `replies` round trips, then close the connection.
async fn spawn_authority(
    codec: WireCodec,
    replies: usize,
) -> (String, mpsc::UnboundedReceiver<ActionRecord>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        for _ in 0..replies {
            let mut request = [0_u8; ACTION_RECORD_SIZE];
            if socket.read_exact(&mut request).await.is_err() {
                return;
            }
            let record = codec.decode_action(&request).unwrap();
            let reply = codec.encode_world_state(&reply_for(&record)).unwrap();
            tx.send(record).unwrap();
            socket.write_all(&reply).await.unwrap();
        }
    });
    (addr, rx, handle)
}

async fn wait_for_revision(ctx: &AgentContext, revision: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while ctx.world().revision() < revision {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn agent_reports_each_new_cell_once() {
    let config = test_config();
    let codec = WireCodec::new(config.grid, config.wire);
    let (addr, mut received, authority) = spawn_authority(codec, 10).await;

    let ctx = Arc::new(AgentContext::new(&config).unwrap());
    let stream = TcpStream::connect(&addr).await.unwrap();
    let client = SyncClient::new(stream, &config, Arc::clone(&ctx));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync = tokio::spawn(client.run(shutdown_rx));

    // Start cell: the start rule sends the agent right, no turn needed.
    ctx.position().publish(GridPosition::new(0, 0));
    wait_for_revision(&ctx, 1).await;
    assert_eq!(ctx.heading().steering().heading, Direction::Right);
    assert_eq!(ctx.heading().take_pending(), TurnSignal::NoTurn);

    // Sitting on the same cell for a while sends nothing more.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ctx.world().revision(), 1);

    // (1, 1): the reward column pulls the agent right again.
    ctx.position().publish(GridPosition::new(1, 1));
    wait_for_revision(&ctx, 2).await;
    let cycle = ctx.last_cycle().unwrap();
    assert_eq!(cycle.sample, GridPosition::new(1, 1));
    assert_eq!(cycle.decision.direction, Direction::Right);
    assert_eq!(cycle.signal, TurnSignal::NoTurn);

    // Goal cell: turn up.
    ctx.position().publish(GridPosition::new(4, 4));
    wait_for_revision(&ctx, 3).await;
    assert_eq!(ctx.heading().steering().heading, Direction::Up);
    assert_eq!(ctx.heading().take_pending(), TurnSignal::TurnLeft);

    shutdown_tx.send(true).unwrap();
    let cycles = sync.await.unwrap().unwrap();
    assert_eq!(cycles, 3);

    let mut positions = Vec::new();
    while let Ok(record) = received.try_recv() {
        assert_eq!(record.kind, ActionKind::Move);
        positions.push(record.position);
    }
    assert_eq!(
        positions,
        vec![
            GridPosition::new(0, 0),
            GridPosition::new(1, 1),
            GridPosition::new(4, 4)
        ]
    );
    authority.abort();
}

#[tokio::test]
async fn closed_connection_ends_sync_but_keeps_state() {
    let config = test_config();
    let codec = WireCodec::new(config.grid, config.wire);
    let (addr, _received, authority) = spawn_authority(codec, 1).await;

    let ctx = Arc::new(AgentContext::new(&config).unwrap());
    let stream = TcpStream::connect(&addr).await.unwrap();
    let client = SyncClient::new(stream, &config, Arc::clone(&ctx));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync = tokio::spawn(client.run(shutdown_rx));

    ctx.position().publish(GridPosition::new(0, 0));
    wait_for_revision(&ctx, 1).await;
    authority.await.unwrap();

    // The authority has hung up; the next new cell ends the loop.
    ctx.position().publish(GridPosition::new(0, 1));
    let result = tokio::time::timeout(Duration::from_secs(5), sync)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        result,
        Err(SyncError::PeerClosed | SyncError::Send { .. } | SyncError::Receive { .. })
    ));

    // The last good snapshot and heading are still there for motion.
    assert_eq!(ctx.world().revision(), 1);
    assert_eq!(ctx.heading().steering().heading, Direction::Right);
}
