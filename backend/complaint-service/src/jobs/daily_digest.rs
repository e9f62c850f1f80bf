use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{error, info};

use crate::services::NotificationService;

/// Background job that emails each department a summary of the complaints
/// reported in the last 24 hours.
///
/// The first run happens one full interval after startup, not at boot, so a
/// crash-looping service does not re-send the digest on every restart.
#[derive(Clone)]
pub struct DailyDigestJob {
    notifier: Arc<NotificationService>,
    interval: Duration,
}

impl DailyDigestJob {
    pub fn new(notifier: Arc<NotificationService>, interval_hours: u64) -> Self {
        Self {
            notifier,
            interval: Duration::from_secs(interval_hours * 3600),
        }
    }

    /// Run the digest loop. Intended to be spawned on the Tokio runtime.
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        info!("Daily digest job started (interval: {:?})", self.interval);

        loop {
            ticker.tick().await;

            match self.notifier.send_daily_digest().await {
                Ok(outcome) => {
                    info!(
                        total_issues = outcome.total_issues,
                        categories = outcome.categories_processed,
                        sent = outcome.successful_notifications,
                        failed = outcome.failed_notifications,
                        "Daily digest run completed"
                    );
                }
                Err(err) => {
                    error!("Daily digest run failed: {}", err);
                }
            }
        }
    }

    /// Spawn the digest loop as a Tokio task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
