use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::access::{AccessDenied, AccessPolicy, Capability};
use super::domain::{ResultDetail, ResultId};
use super::repository::{RecordStore, RepositoryError, SmsTransport, TransportError};

/// Render the SMS body announcing a published result.
pub fn render_message(detail: &ResultDetail) -> String {
    format!(
        "Dear {}, your {} ({}) result for {} {} is now available. Score: {}% (Grade {}). Visit the portal for details.",
        detail.student.first_name,
        detail.course.code,
        detail.course.title,
        detail.semester.name,
        detail.semester.year,
        detail.result.score,
        detail.result.grade,
    )
}

/// Confirmation returned once a result notification has been delivered and recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationReceipt {
    pub result_id: ResultId,
    pub destination: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchFailure {
    pub result_id: ResultId,
    pub reason: String,
}

/// Aggregate counts for one bulk dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchSummary {
    pub fn message(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

/// Error raised while notifying a single result.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Access(#[from] AccessDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("result {0} has already been notified")]
    AlreadyNotified(ResultId),
}

/// Drains unnotified results through the SMS transport, one at a time.
pub struct NotificationDispatcher<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    access: AccessPolicy,
}

impl<S, T> NotificationDispatcher<S, T>
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    pub fn new(store: Arc<S>, transport: Arc<T>) -> Self {
        Self::with_access(store, transport, AccessPolicy::default())
    }

    pub fn with_access(store: Arc<S>, transport: Arc<T>, access: AccessPolicy) -> Self {
        Self {
            store,
            transport,
            access,
        }
    }

    /// Notify one result. The flag is only set after the transport accepts the message.
    pub fn notify(&self, result_id: ResultId) -> Result<NotificationReceipt, DispatchError> {
        self.access.authorize(Capability::SendNotifications)?;

        let detail = self
            .store
            .fetch_result_detail(result_id)?
            .ok_or(RepositoryError::NotFound)?;
        if detail.result.notified {
            return Err(DispatchError::AlreadyNotified(result_id));
        }

        self.deliver(&detail)
    }

    /// Attempt every pending result in order, continuing past failures.
    pub fn notify_pending(&self) -> Result<DispatchSummary, DispatchError> {
        self.access.authorize(Capability::SendNotifications)?;

        let pending = self.store.pending_notifications()?;
        let mut summary = DispatchSummary::default();

        for detail in &pending {
            summary.attempted += 1;
            match self.deliver(detail) {
                Ok(_) => summary.succeeded += 1,
                Err(err) => {
                    summary.failed += 1;
                    summary.failures.push(DispatchFailure {
                        result_id: detail.result.id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "bulk result notification finished"
        );
        Ok(summary)
    }

    fn deliver(&self, detail: &ResultDetail) -> Result<NotificationReceipt, DispatchError> {
        let result_id = detail.result.id;
        let destination = detail.student.phone_number.clone();
        let message = render_message(detail);

        if let Err(err) = self.transport.send(&destination, &message) {
            warn!(%result_id, error = %err, "result notification not delivered");
            return Err(err.into());
        }

        self.store.mark_notified(result_id).map_err(|err| {
            warn!(%result_id, error = %err, "delivered notification could not be recorded");
            err
        })?;
        info!(%result_id, student = %detail.student.student_code, "result notification sent");

        Ok(NotificationReceipt {
            result_id,
            destination,
            message,
        })
    }
}
