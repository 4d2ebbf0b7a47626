//! # NotifyRecipients: the completion-notification finalizer.
//!
//! Looks up candidates through a [`RecipientDirectory`], keeps the eligible ones, drops
//! duplicate addresses and sends each remaining address exactly once. The first
//! delivery failure aborts the finalizer; the job is then not marked successful.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::JobError;
use crate::jobs::invocation::Invocation;
use crate::jobs::ports::{FinalizeSuccess, Notifier, Recipient, RecipientDirectory};

/// Finalizer that notifies every eligible recipient once.
pub struct NotifyRecipients<A> {
    directory: Arc<dyn RecipientDirectory<A>>,
    notifier: Arc<dyn Notifier>,
}

impl<A> NotifyRecipients<A> {
    /// Creates the finalizer.
    pub fn new(directory: Arc<dyn RecipientDirectory<A>>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            directory,
            notifier,
        }
    }
}

#[async_trait]
impl<A: Send + Sync + 'static> FinalizeSuccess<A> for NotifyRecipients<A> {
    async fn finalize(&self, invocation: &Invocation<A>) -> Result<Vec<String>, JobError> {
        let candidates = self
            .directory
            .recipients(&invocation.args)
            .await
            .map_err(|source| JobError::Recipients { source })?;
        let total = candidates.len();

        let mut seen = HashSet::new();
        let mut sent = Vec::new();
        for recipient in candidates.into_iter().filter(Recipient::is_eligible) {
            if !seen.insert(recipient.address.clone()) {
                continue;
            }
            self.notifier
                .send(&recipient.address)
                .await
                .map_err(|source| JobError::Notify {
                    recipient: recipient.address.clone(),
                    source,
                })?;
            debug!(recipient = %recipient.address, "notification delivered");
            sent.push(recipient.address);
        }

        info!(
            correlation_id = %invocation.correlation_id,
            candidates = total,
            notified = sent.len(),
            "completion notifications sent"
        );
        Ok(sent)
    }
}
