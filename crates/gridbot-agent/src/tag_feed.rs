//! Line-oriented position tag feed.
//!
//! Each input line is one floor-tag payload. Valid payloads overwrite the
//! latest position in the shared context; malformed ones are dropped by
//! [`PositionSlot::ingest_tag`](gridbot_core::position::PositionSlot::ingest_tag).
//!
//! Standard input is read on a plain OS thread that forwards lines over a
//! channel, so a read that never completes cannot hold up runtime shutdown.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use gridbot_core::context::AgentContext;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Lines buffered between the reader thread and the feed task.
const LINE_BUFFER: usize = 16;

/// Start a detached thread forwarding stdin lines into a channel.
///
/// The channel closes at end of input, on a read error, or once the
/// receiver is dropped.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    thread::spawn(move || forward_lines(std::io::stdin().lock(), &tx));
    rx
}

fn forward_lines<R: BufRead>(reader: R, tx: &mpsc::Sender<String>) {
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if tx.blocking_send(line).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "tag feed read failed");
                return;
            }
        }
    }
}

/// Feed tag payloads from `lines` until the channel closes or shutdown.
///
/// Returns the number of accepted tags.
pub async fn run(
    mut lines: mpsc::Receiver<String>,
    context: Arc<AgentContext>,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut accepted: u64 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            line = lines.recv() => {
                let Some(line) = line else {
                    info!("tag feed reached end of input");
                    break;
                };
                if context.position().ingest_tag(line.trim()).is_some() {
                    accepted = accepted.saturating_add(1);
                }
            }
        }
    }

    info!(accepted, "tag feed stopped");
    accepted
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use gridbot_core::config::AgentConfig;
    use gridbot_core::position::PositionSource;
    use gridbot_types::GridPosition;

    use super::*;

    fn context() -> Arc<AgentContext> {
        Arc::new(AgentContext::new(&AgentConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn feeds_valid_lines_until_input_ends() {
        let ctx = context();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (tx, rx) = mpsc::channel(LINE_BUFFER);

        let input: &[u8] = b"00\nnoise\n 12 \n3\n34\n";
        let reader = thread::spawn(move || forward_lines(input, &tx));

        let accepted = run(rx, Arc::clone(&ctx), shutdown_rx).await;
        reader.join().unwrap();
        assert_eq!(accepted, 3);
        assert_eq!(
            ctx.position().latest_position(),
            Some(GridPosition::new(3, 4))
        );
    }

    #[tokio::test]
    async fn stops_on_shutdown_while_waiting() {
        let ctx = context();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (tx, rx) = mpsc::channel(LINE_BUFFER);

        let feed = tokio::spawn(run(rx, Arc::clone(&ctx), shutdown_rx));
        tx.send("21".to_owned()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while ctx.position().latest_position().is_none() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        // The sender is still alive; only the shutdown ends the feed.
        shutdown_tx.send(true).unwrap();
        assert_eq!(feed.await.unwrap(), 1);
        assert_eq!(
            ctx.position().latest_position(),
            Some(GridPosition::new(2, 1))
        );
        drop(tx);
    }
}
