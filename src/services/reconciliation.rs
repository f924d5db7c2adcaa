//! Nightly overdue reconciliation
//!
//! [`OverdueReconciler`] performs one pass over the ledger; [`ReconciliationJob`]
//! runs it at every local midnight of the lending calendar on its own task.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use tokio::{sync::Notify, task::JoinSet};

use crate::{
    error::{AppError, AppResult},
    models::loan::calendar_date,
    repository::Repository,
};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Non-deleted loans examined
    pub scanned: usize,
    pub marked_overdue: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct OverdueReconciler {
    repository: Repository,
    timezone: FixedOffset,
    update_timeout: Duration,
}

impl OverdueReconciler {
    pub fn new(repository: Repository, timezone: FixedOffset, update_timeout: Duration) -> Self {
        Self {
            repository,
            timezone,
            update_timeout,
        }
    }

    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    /// Mark every borrowed loan due before `today` as overdue.
    ///
    /// Each loan is updated on its own task. A failed or timed-out update is
    /// logged and counted; it never stops the others. Only a failure to read
    /// the ledger at all is returned as an error.
    pub async fn run_once(&self, today: NaiveDate) -> AppResult<ReconciliationReport> {
        let loans = self.repository.undeleted_loans().await?;

        let mut report = ReconciliationReport {
            scanned: loans.len(),
            ..Default::default()
        };

        let mut updates = JoinSet::new();
        for loan in loans.iter().filter(|l| l.is_past_due(today, &self.timezone)) {
            let repository = self.repository.clone();
            let timeout = self.update_timeout;
            let loan_id = loan.id;

            updates.spawn(async move {
                let result = match tokio::time::timeout(timeout, repository.mark_overdue(loan_id)).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::Internal(format!(
                        "Overdue update timed out after {:?}",
                        timeout
                    ))),
                };
                (loan_id, result)
            });
        }

        while let Some(joined) = updates.join_next().await {
            match joined {
                Ok((loan_id, Ok(true))) => {
                    report.marked_overdue += 1;
                    tracing::info!(loan_id, "Loan marked overdue");
                }
                // Returned or deleted between the scan and the update
                Ok((loan_id, Ok(false))) => {
                    tracing::debug!(loan_id, "Loan no longer borrowed, skipped");
                }
                Ok((loan_id, Err(e))) => {
                    report.failed += 1;
                    tracing::warn!(loan_id, error = %e, "Failed to mark loan overdue");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(error = %e, "Overdue update task aborted");
                }
            }
        }

        Ok(report)
    }
}

/// Time left until the next local midnight in `timezone`
pub fn until_next_midnight(now: DateTime<Utc>, timezone: &FixedOffset) -> Duration {
    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    calendar_date(now, timezone)
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .and_then(|midnight| timezone.from_local_datetime(&midnight).single())
        .and_then(|midnight| (midnight.with_timezone(&Utc) - now).to_std().ok())
        .unwrap_or(DAY)
}

/// Scheduled task running the reconciler once per day
pub struct ReconciliationJob {
    reconciler: OverdueReconciler,
    shutdown: Arc<Notify>,
}

/// Running job; dropping it leaves the task running until the runtime stops
pub struct ReconciliationHandle {
    shutdown: Arc<Notify>,
    task: tokio::task::JoinHandle<()>,
}

impl ReconciliationJob {
    pub fn new(reconciler: OverdueReconciler) -> Self {
        Self {
            reconciler,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Spawn the scheduling loop
    pub fn start(self) -> ReconciliationHandle {
        let shutdown = self.shutdown.clone();
        let reconciler = self.reconciler;

        let task = tokio::spawn(async move {
            let timezone = reconciler.timezone();
            tracing::info!(utc_offset = %timezone, "Overdue reconciliation job started");

            loop {
                let wait = until_next_midnight(Utc::now(), &timezone);
                tracing::debug!(?wait, "Next overdue reconciliation scheduled");

                tokio::select! {
                    _ = shutdown.notified() => {
                        tracing::info!("Overdue reconciliation job received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(wait) => {
                        let today = calendar_date(Utc::now(), &timezone);
                        match reconciler.run_once(today).await {
                            Ok(report) => tracing::info!(
                                %today,
                                scanned = report.scanned,
                                marked_overdue = report.marked_overdue,
                                failed = report.failed,
                                "Overdue reconciliation finished"
                            ),
                            Err(e) => tracing::error!(%today, error = %e, "Overdue reconciliation failed"),
                        }
                    }
                }
            }

            tracing::info!("Overdue reconciliation job stopped");
        });

        ReconciliationHandle {
            shutdown: self.shutdown,
            task,
        }
    }
}

impl ReconciliationHandle {
    /// Signal the job to stop and wait for it. A pass already in progress
    /// finishes first.
    pub async fn stop(self) {
        // notify_one keeps a permit, so a signal sent before the loop reaches
        // `notified()` is not lost
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Overdue reconciliation job panicked");
        }
    }
}
