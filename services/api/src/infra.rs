use health_card::workflows::health_card::{
    DocumentCatalog, DocumentTypeId, NotificationError, NotificationPayload,
    NotificationPublisher, RoleDirectory, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

const STANDARD_DOCUMENTS: [(&str, &str); 4] = [
    ("valid_id", "Valid ID"),
    ("chest_xray", "Chest X-Ray"),
    ("urinalysis", "Urinalysis"),
    ("stool_exam", "Stool Examination"),
];

const SECURITY_GUARD_DOCUMENTS: [(&str, &str); 2] = [
    ("drug_test", "Drug Test"),
    ("neuro_exam", "Neuropsychiatric Evaluation"),
];

/// Fixed document-type catalog served by the standalone binary.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StaticDocumentCatalog;

impl DocumentCatalog for StaticDocumentCatalog {
    fn display_name(&self, document: &DocumentTypeId) -> Option<String> {
        STANDARD_DOCUMENTS
            .iter()
            .chain(SECURITY_GUARD_DOCUMENTS.iter())
            .find(|(id, _)| *id == document.0)
            .map(|(_, name)| (*name).to_string())
    }

    fn required_documents(&self, security_guard: bool) -> Vec<DocumentTypeId> {
        let extra: &[(&str, &str)] = if security_guard {
            &SECURITY_GUARD_DOCUMENTS
        } else {
            &[]
        };
        STANDARD_DOCUMENTS
            .iter()
            .chain(extra.iter())
            .map(|(id, _)| DocumentTypeId((*id).to_string()))
            .collect()
    }
}

/// Reviewer roster taken from `APP_REVIEWER_IDS`.
#[derive(Debug, Default, Clone)]
pub(crate) struct ConfiguredRoles {
    reviewers: BTreeSet<String>,
}

impl ConfiguredRoles {
    pub(crate) fn new(reviewer_ids: &[String]) -> Self {
        Self {
            reviewers: reviewer_ids.iter().cloned().collect(),
        }
    }
}

impl RoleDirectory for ConfiguredRoles {
    fn is_reviewer(&self, user: &UserId) -> bool {
        self.reviewers.contains(&user.0)
    }
}

/// Publisher that hands payloads to the log stream; delivery belongs to a downstream relay.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingNotificationPublisher;

impl NotificationPublisher for LoggingNotificationPublisher {
    fn publish(&self, payload: &NotificationPayload) -> Result<(), NotificationError> {
        info!(
            application_id = %payload.application_id.0,
            user_id = %payload.user_id.0,
            kind = ?payload.kind,
            title = %payload.title,
            action_url = %payload.action_url,
            "notification queued"
        );
        Ok(())
    }
}

/// Publisher that keeps payloads in memory so the demo can print them.
#[derive(Debug, Default, Clone)]
pub(crate) struct RecordingNotificationPublisher {
    sent: Arc<Mutex<Vec<NotificationPayload>>>,
}

impl NotificationPublisher for RecordingNotificationPublisher {
    fn publish(&self, payload: &NotificationPayload) -> Result<(), NotificationError> {
        let mut guard = self
            .sent
            .lock()
            .map_err(|_| NotificationError::Transport("outbox mutex poisoned".to_string()))?;
        guard.push(payload.clone());
        Ok(())
    }
}

impl RecordingNotificationPublisher {
    pub(crate) fn drain(&self) -> Vec<NotificationPayload> {
        match self.sent.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        }
    }
}
