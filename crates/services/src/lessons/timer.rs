use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use learn_core::Clock;
use learn_core::model::{ProgressUpdate, SectionId};

/// Periodic time tracker for the active section.
///
/// Emits an absolute `time-update` (time already spent before activation plus
/// the time since activation) every `period`. The background task is aborted
/// when the timer is stopped or dropped, so a timer can never outlive the
/// section it was started for.
#[derive(Debug)]
pub struct SectionTimer {
    section_id: SectionId,
    handle: JoinHandle<()>,
}

impl SectionTimer {
    /// Spawn the tracker on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn start(
        section_id: SectionId,
        base_secs: u64,
        period: Duration,
        clock: Clock,
        updates: UnboundedSender<ProgressUpdate>,
    ) -> Self {
        let task_section = section_id.clone();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval_at(started + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let elapsed = base_secs + started.elapsed().as_secs();
                let update = ProgressUpdate::time_update(task_section.clone(), elapsed, clock.now());
                if updates.send(update).is_err() {
                    // receiver gone: the session ended
                    break;
                }
            }
        });
        debug!(%section_id, base_secs, ?period, "section timer started");
        Self { section_id, handle }
    }

    #[must_use]
    pub fn section_id(&self) -> &SectionId {
        &self.section_id
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the tracker and wait until its task has terminated.
    pub async fn stop(mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for SectionTimer {
    fn drop(&mut self) {
        self.handle.abort();
        debug!(section_id = %self.section_id, "section timer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learn_core::model::UpdateKind;
    use learn_core::time::fixed_clock;
    use tokio::sync::mpsc;

    fn secs(update: &ProgressUpdate) -> u64 {
        match update.kind {
            UpdateKind::TimeUpdate { time_spent_secs } => time_spent_secs,
            _ => panic!("expected a time update"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn emits_absolute_time_every_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = SectionTimer::start(
            SectionId::new("s1"),
            5,
            Duration::from_secs(10),
            fixed_clock(),
            tx,
        );

        tokio::time::sleep(Duration::from_secs(25)).await;
        timer.stop().await;

        let mut seen = Vec::new();
        while let Some(update) = rx.recv().await {
            assert_eq!(update.section_id, SectionId::new("s1"));
            seen.push(secs(&update));
        }
        assert_eq!(seen, vec![15, 25]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_cancels_it() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = SectionTimer::start(
            SectionId::new("s1"),
            0,
            Duration::from_secs(10),
            fixed_clock(),
            tx,
        );
        assert!(timer.is_running());
        drop(timer);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.recv().await.is_none());
    }
}
