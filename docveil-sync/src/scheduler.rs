//! Timer loop driving a [`SyncEngine`].
//!
//! One tokio task per session:
//! - Local edits arm a debounce timer; the push runs once edits stop
//!   arriving for `push_debounce`.
//! - A poll interval pulls the remote blob, except while a push is pending
//!   so unsent local edits are not overwritten.
//! - A push that fails with a recoverable error is retried after
//!   `push_retry`.

use crate::config::SyncConfig;
use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

enum SyncCommand {
    Edit,
    SyncNow,
    Stop,
}

#[derive(Clone, Copy)]
struct Timing {
    debounce: Duration,
    poll: Duration,
    retry: Duration,
}

/// Starts scheduler tasks.
pub struct SyncScheduler;

impl SyncScheduler {
    /// Spawns the loop for `engine` on the current tokio runtime.
    pub fn start(engine: Arc<SyncEngine>, config: &SyncConfig) -> SyncHandle {
        let (command_tx, command_rx) = mpsc::channel(64);
        let timing = Timing {
            debounce: config.push_debounce(),
            poll: config.poll_interval(),
            retry: config.push_retry(),
        };
        let task = tokio::spawn(run(engine.clone(), command_rx, timing));
        SyncHandle {
            command_tx,
            engine,
            task,
        }
    }
}

/// Handle for a running scheduler.
pub struct SyncHandle {
    command_tx: mpsc::Sender<SyncCommand>,
    engine: Arc<SyncEngine>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Signals a local edit. Restarts the push debounce.
    pub fn notify_edit(&self) {
        // A full queue already holds an edit that will arm the timer.
        let _ = self.command_tx.try_send(SyncCommand::Edit);
    }

    /// Pushes pending edits and pulls immediately.
    pub async fn sync_now(&self) -> SyncResult<()> {
        self.command_tx
            .send(SyncCommand::SyncNow)
            .await
            .map_err(|_| SyncError::SessionClosed)
    }

    /// Tears the engine down and waits for the loop to exit.
    pub async fn stop(self) {
        self.engine.teardown();
        let _ = self.command_tx.send(SyncCommand::Stop).await;
        if let Err(e) = self.task.await {
            warn!("sync scheduler task ended abnormally: {e}");
        }
    }
}

async fn run(engine: Arc<SyncEngine>, mut commands: mpsc::Receiver<SyncCommand>, timing: Timing) {
    let doc_id = engine.session().doc_id().to_string();
    info!("sync scheduler started for {doc_id}");

    let mut poll = tokio::time::interval(timing.poll);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Skip first immediate tick
    poll.tick().await;

    let push_timer = tokio::time::sleep(timing.debounce);
    tokio::pin!(push_timer);
    let mut push_pending = false;

    loop {
        tokio::select! {
            _ = &mut push_timer, if push_pending => {
                push_pending = false;
                if let Some(retry_at) = push(&engine, timing).await {
                    push_pending = true;
                    push_timer.as_mut().reset(retry_at);
                }
            }
            _ = poll.tick() => {
                if push_pending {
                    debug!("local edits pending, skipping pull");
                } else {
                    pull(&engine).await;
                }
            }
            cmd = commands.recv() => {
                match cmd {
                    Some(SyncCommand::Edit) => {
                        push_pending = true;
                        push_timer.as_mut().reset(Instant::now() + timing.debounce);
                    }
                    Some(SyncCommand::SyncNow) => {
                        push_pending = false;
                        if let Some(retry_at) = push(&engine, timing).await {
                            debug!("push failed, skipping pull to keep unsent edits");
                            push_pending = true;
                            push_timer.as_mut().reset(retry_at);
                        } else {
                            pull(&engine).await;
                        }
                    }
                    Some(SyncCommand::Stop) => {
                        info!("sync scheduler stopping");
                        break;
                    }
                    None => {
                        info!("command channel closed, stopping sync scheduler");
                        break;
                    }
                }
            }
        }

        if engine.is_torn_down() {
            break;
        }
    }

    info!("sync scheduler stopped for {doc_id}");
}

/// Runs a push. Returns when to retry if it failed recoverably.
async fn push(engine: &SyncEngine, timing: Timing) -> Option<Instant> {
    match engine.push().await {
        Ok(outcome) => {
            debug!("push: {outcome:?}");
            None
        }
        Err(SyncError::SessionClosed) => None,
        Err(e) if e.is_recoverable() => {
            warn!("push failed, retrying in {:?}: {e}", timing.retry);
            Some(Instant::now() + timing.retry)
        }
        Err(e) => {
            error!("push failed: {e}");
            None
        }
    }
}

async fn pull(engine: &SyncEngine) {
    match engine.pull().await {
        Ok(outcome) => debug!("pull: {outcome:?}"),
        Err(SyncError::SessionClosed) => {}
        Err(e) if e.is_recoverable() => warn!("pull failed: {e}"),
        Err(e) => error!("pull failed: {e}"),
    }
}
