//! Cancellable visible countdown
//!
//! A [`Countdown`] shows its duration, decrements once per second, and on
//! reaching zero hides the display and runs its completion callback
//! exactly once. [`CountdownHandle`] cancels it; a cancelled countdown
//! hides the display and never runs the callback.
//!
//! [`CountdownScheduler`] keeps at most one countdown per slot: starting a
//! new one first cancels and joins the previous, so two countdowns never
//! drive the same display.

use crate::display::CountdownSink;
use posescore_common::SlotKind;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Interval between countdown steps
pub const TICK: Duration = Duration::from_secs(1);

/// Called with every value the display shows
pub type TickObserver = Arc<dyn Fn(u32) + Send + Sync>;

/// Countdown description; started with [`Countdown::start`]
#[derive(Clone)]
pub struct Countdown {
    duration_secs: u32,
    observer: Option<TickObserver>,
}

impl Countdown {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            observer: None,
        }
    }

    /// Attach an observer notified of each displayed value
    pub fn with_observer(mut self, observer: TickObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Spawn the countdown on the current runtime
    ///
    /// A zero duration hides the display and completes immediately.
    pub fn start<F>(self, sink: Arc<dyn CountdownSink>, on_complete: F) -> CountdownHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let notify = |value: u32| {
                if let Some(observer) = &self.observer {
                    observer(value);
                }
            };

            let mut remaining = self.duration_secs;
            if remaining == 0 {
                sink.hide();
                on_complete();
                return;
            }

            sink.set_text(remaining);
            sink.show();
            notify(remaining);

            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => {
                        sink.hide();
                        tracing::debug!(remaining, "Countdown cancelled");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                remaining -= 1;
                if remaining == 0 {
                    sink.hide();
                    on_complete();
                    return;
                }
                sink.set_text(remaining);
                notify(remaining);
            }
        });

        CountdownHandle { token, task }
    }
}

/// Running countdown
pub struct CountdownHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    /// Request cancellation without waiting
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait until the countdown task has exited
    pub async fn cancel_and_wait(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Countdown task ended abnormally");
        }
    }

    /// Wait for the countdown to finish on its own
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Countdown task ended abnormally");
        }
    }
}

/// One active countdown per slot
#[derive(Default)]
pub struct CountdownScheduler {
    active: Mutex<HashMap<SlotKind, CountdownHandle>>,
}

impl CountdownScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown for `slot`, superseding any countdown already
    /// running there
    pub async fn start<F>(
        &self,
        slot: SlotKind,
        countdown: Countdown,
        sink: Arc<dyn CountdownSink>,
        on_complete: F,
    ) where
        F: FnOnce() + Send + 'static,
    {
        let previous = self.active.lock().await.remove(&slot);
        if let Some(previous) = previous {
            if !previous.is_finished() {
                tracing::debug!(slot = %slot, "Superseding active countdown");
            }
            previous.cancel_and_wait().await;
        }

        let handle = countdown.start(sink, on_complete);
        if let Some(raced) = self.active.lock().await.insert(slot, handle) {
            raced.cancel();
        }
    }

    /// Cancel the countdown for `slot`, if any, and wait for it to stop
    pub async fn cancel(&self, slot: SlotKind) {
        let previous = self.active.lock().await.remove(&slot);
        if let Some(previous) = previous {
            previous.cancel_and_wait().await;
        }
    }

    /// True while a countdown for `slot` is still ticking
    pub async fn is_active(&self, slot: SlotKind) -> bool {
        self.active
            .lock()
            .await
            .get(&slot)
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Text(u32),
        Show,
        Hide,
    }

    #[derive(Default)]
    struct RecordingSink {
        ops: StdMutex<Vec<Op>>,
    }

    impl RecordingSink {
        fn ops(&self) -> Vec<Op> {
            self.ops.lock().unwrap().clone()
        }
    }

    impl CountdownSink for RecordingSink {
        fn set_text(&self, remaining: u32) {
            self.ops.lock().unwrap().push(Op::Text(remaining));
        }
        fn show(&self) {
            self.ops.lock().unwrap().push(Op::Show);
        }
        fn hide(&self) {
            self.ops.lock().unwrap().push(Op::Hide);
        }
    }

    #[tokio::test]
    async fn test_five_second_countdown_completes_once() {
        tokio::time::pause();
        let sink = Arc::new(RecordingSink::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = fired.clone();

        let start = Instant::now();
        let handle = Countdown::new(5).start(sink.clone(), move || {
            fired_cb.fetch_add(1, Ordering::SeqCst);
        });
        handle.wait().await;

        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(
            sink.ops(),
            vec![
                Op::Text(5),
                Op::Show,
                Op::Text(4),
                Op::Text(3),
                Op::Text(2),
                Op::Text(1),
                Op::Hide,
            ]
        );
    }

    #[tokio::test]
    async fn test_not_fired_before_last_tick() {
        tokio::time::pause();
        let sink = Arc::new(RecordingSink::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = fired.clone();

        let handle = Countdown::new(3).start(sink.clone(), move || {
            fired_cb.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        handle.wait().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_duration_completes_immediately() {
        tokio::time::pause();
        let sink = Arc::new(RecordingSink::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = fired.clone();

        Countdown::new(0)
            .start(sink.clone(), move || {
                fired_cb.fetch_add(1, Ordering::SeqCst);
            })
            .wait()
            .await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(sink.ops(), vec![Op::Hide]);
    }

    #[tokio::test]
    async fn test_cancel_hides_and_skips_callback() {
        tokio::time::pause();
        let sink = Arc::new(RecordingSink::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = fired.clone();

        let handle = Countdown::new(5).start(sink.clone(), move || {
            fired_cb.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        handle.cancel_and_wait().await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(sink.ops().last(), Some(&Op::Hide));
        assert!(!sink.ops().contains(&Op::Text(0)));
    }

    #[tokio::test]
    async fn test_observer_sees_every_displayed_value() {
        tokio::time::pause();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_cb = seen.clone();

        Countdown::new(3)
            .with_observer(Arc::new(move |v| seen_cb.lock().unwrap().push(v)))
            .start(Arc::new(RecordingSink::default()), || {})
            .wait()
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_scheduler_supersedes_same_slot() {
        tokio::time::pause();
        let scheduler = CountdownScheduler::new();
        let sink = Arc::new(RecordingSink::default());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let first_cb = first.clone();
        scheduler
            .start(SlotKind::Happy, Countdown::new(3), sink.clone(), move || {
                first_cb.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        let second_cb = second.clone();
        scheduler
            .start(SlotKind::Happy, Countdown::new(3), sink.clone(), move || {
                second_cb.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert!(scheduler.is_active(SlotKind::Happy).await);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_active(SlotKind::Happy).await);
    }

    #[tokio::test]
    async fn test_scheduler_slots_are_independent() {
        tokio::time::pause();
        let scheduler = CountdownScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for slot in [SlotKind::Happy, SlotKind::Body] {
            let fired_cb = fired.clone();
            scheduler
                .start(slot, Countdown::new(2), Arc::new(RecordingSink::default()), move || {
                    fired_cb.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }
        scheduler.cancel(SlotKind::Happy).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
