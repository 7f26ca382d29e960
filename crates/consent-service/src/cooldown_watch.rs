//! Periodic re-evaluation of a cooldown window while someone is looking.

use consent_core::cooldown::{CooldownStatus, CooldownWindow};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

/// Millisecond clock; injectable so tests can drive it with paused time.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(consent_core::now_ms)
}

/// Live view of a [`CooldownWindow`]. Ticks on a fixed cadence until the
/// window expires; dropping the observer cancels the timer at once.
pub struct CooldownObserver {
    status: watch::Receiver<CooldownStatus>,
    task: JoinHandle<()>,
}

impl CooldownObserver {
    /// A zero `tick` is raised to 1 ms.
    pub fn start(window: CooldownWindow, tick: Duration, clock: Clock) -> Self {
        let tick = tick.max(Duration::from_millis(1));
        let initial = window.evaluate(clock());
        let (tx, rx) = watch::channel(initial);
        let task = tokio::spawn(async move {
            if initial.expired {
                return;
            }
            let mut ticker = time::interval_at(time::Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let status = window.evaluate(clock());
                        tx.send_replace(status);
                        if status.expired {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
        });
        Self { status: rx, task }
    }

    pub fn current(&self) -> CooldownStatus {
        *self.status.borrow()
    }

    /// Resolves on the next published status.
    pub async fn changed(&mut self) -> Option<CooldownStatus> {
        self.status.changed().await.ok()?;
        Some(*self.status.borrow_and_update())
    }

    /// True once the ticking task has exited.
    pub fn is_idle(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CooldownObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}
