//! Drives periodic update sweeps.
//!
//! Two cadences exist: `Immediate` sweeps on a short fixed interval,
//! `Digest` sweeps once a day at a configured hour. Switching modes
//! aborts the running loop before the replacement starts, so at most
//! one sweep loop exists at any time.

use chrono::{Local, NaiveTime, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};

use crate::detector::UpdateDetector;
use crate::transport::UpdateTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMode {
    Immediate,
    Digest,
}

pub struct NotificationScheduler {
    detector: Arc<UpdateDetector>,
    transport: Arc<UpdateTransport>,
    immediate_interval: Duration,
    digest_hour: u32,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationScheduler {
    pub fn new(
        detector: Arc<UpdateDetector>,
        transport: Arc<UpdateTransport>,
        immediate_interval: Duration,
        digest_hour: u32,
    ) -> Self {
        Self {
            detector,
            transport,
            immediate_interval,
            digest_hour,
            handle: Mutex::new(None),
        }
    }

    pub async fn set_mode(&self, mode: NotificationMode) {
        let mut guard = self.handle.lock().await;
        if let Some(old) = guard.take() {
            old.abort();
        }

        let detector = self.detector.clone();
        let transport = self.transport.clone();

        let new_handle = match mode {
            NotificationMode::Immediate => {
                let interval = self.immediate_interval;
                tokio::spawn(async move {
                    loop {
                        sleep(interval).await;
                        run_pipeline(&detector, &transport).await;
                    }
                })
            }
            NotificationMode::Digest => {
                let digest_hour = self.digest_hour;
                tokio::spawn(async move {
                    loop {
                        sleep(duration_until_hour(Local::now().time(), digest_hour)).await;
                        run_pipeline(&detector, &transport).await;
                    }
                })
            }
        };

        info!("Notification mode set to {:?}", mode);
        *guard = Some(new_handle);
    }

    pub async fn shutdown(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
    }
}

async fn run_pipeline(detector: &UpdateDetector, transport: &UpdateTransport) {
    match detector.detect_all().await {
        Ok(updates) => {
            if let Err(e) = transport.deliver(updates).await {
                error!("Failed to deliver updates: {}", e);
            }
        }
        Err(e) => error!("Update sweep failed: {}", e),
    }
}

/// Time left until the next wall-clock occurrence of `hour:00`.
/// At exactly `hour:00` the full day is returned, never zero.
fn duration_until_hour(now: NaiveTime, hour: u32) -> Duration {
    const DAY: u32 = 24 * 3600;
    let target_secs = hour * 3600;
    let now_secs = now.num_seconds_from_midnight();

    let delta = if now_secs < target_secs {
        target_secs - now_secs
    } else {
        DAY - now_secs + target_secs
    };
    Duration::from_secs(u64::from(delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::Repo;
    use crate::db::types::Tags;
    use crate::notifier::{MessageSender, Notifier};
    use crate::resolver::{ActivityResolver, LatestActivity};
    use async_trait::async_trait;
    use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_duration_until_hour_later_today() {
        assert_eq!(
            duration_until_hour(time(18, 30, 0), 20),
            Duration::from_secs(90 * 60)
        );
    }

    #[test]
    fn test_duration_until_hour_wraps_to_tomorrow() {
        assert_eq!(
            duration_until_hour(time(21, 0, 0), 20),
            Duration::from_secs(23 * 3600)
        );
    }

    #[test]
    fn test_duration_until_hour_at_the_hour_waits_a_day() {
        assert_eq!(
            duration_until_hour(time(20, 0, 0), 20),
            Duration::from_secs(24 * 3600)
        );
    }

    struct CountingResolver {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ActivityResolver for CountingResolver {
        async fn resolve(&self, _url: &str) -> Option<LatestActivity> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    struct NullSender;

    #[async_trait]
    impl MessageSender for NullSender {
        async fn send(&self, _chat_id: i64, _text: &str) -> crate::error::AppResult<()> {
            Ok(())
        }
    }

    async fn setup_scheduler(
        interval: Duration,
        digest_hour: u32,
    ) -> (NotificationScheduler, Arc<AtomicUsize>) {
        // Resume real time during DB setup: under a paused clock the blocking
        // sqlite work lets auto-advance skip past the pool acquire timeout.
        tokio::time::resume();
        let db = Database::connect("sqlite::memory:").await.unwrap();
        for ddl in [
            "CREATE TABLE chats (id INTEGER PRIMARY KEY NOT NULL, created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
            "CREATE TABLE links (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, url TEXT NOT NULL UNIQUE, created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
            "CREATE TABLE subscriptions (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, chat_id INTEGER NOT NULL, link_id INTEGER NOT NULL, tags TEXT NOT NULL DEFAULT '[]', filters TEXT NOT NULL DEFAULT '[]', created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, UNIQUE(chat_id, link_id))",
        ] {
            db.execute(Statement::from_string(DbBackend::Sqlite, ddl))
                .await
                .unwrap();
        }

        let repo = Arc::new(Repo::new(db));
        repo.add_chat(1).await.unwrap();
        repo.add_subscription(1, "https://github.com/a/b", Tags::default(), Tags::default())
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let detector = Arc::new(crate::detector::UpdateDetector::new(
            repo,
            Arc::new(CountingResolver {
                calls: calls.clone(),
            }),
        ));
        let transport = Arc::new(UpdateTransport::Direct(Notifier::new(Arc::new(NullSender))));

        tokio::time::pause();
        (
            NotificationScheduler::new(detector, transport, interval, digest_hour),
            calls,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_mode_sweeps_on_interval() {
        let (scheduler, calls) = setup_scheduler(Duration::from_secs(60), 20).await;

        scheduler.set_mode(NotificationMode::Immediate).await;
        tokio::time::sleep(Duration::from_secs(185)).await;
        scheduler.shutdown().await;

        // Three intervals elapsed, at least two sweeps must have run
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_switch_aborts_previous_loop() {
        // Park the digest at least ten hours away from now
        let far_hour = (Local::now().hour() + 12) % 24;
        let (scheduler, calls) = setup_scheduler(Duration::from_secs(60), far_hour).await;

        scheduler.set_mode(NotificationMode::Immediate).await;
        tokio::time::sleep(Duration::from_secs(65)).await;
        let after_first = calls.load(Ordering::SeqCst);
        assert!(after_first >= 1);

        // Digest mode waits for the daily hour, so the counter freezes
        scheduler.set_mode(NotificationMode::Digest).await;
        let frozen = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), frozen);

        scheduler.shutdown().await;
    }
}
