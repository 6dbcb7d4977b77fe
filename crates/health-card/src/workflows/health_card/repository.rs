use chrono::{DateTime, Utc};

use super::domain::{Application, ApplicationId, DocumentTypeId, HealthCard, HealthCardId, UserId};
use super::notifications::NotificationPayload;
use super::referrals::{LegacyReferralRow, MergedReferrals, ReferralKey, ReferralRecord};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Reads are plain lookups. Every mutation goes through [`WorkflowRepository::commit`], which
/// must apply a [`ChangeSet`] atomically and enforce its conditions.
pub trait WorkflowRepository: Send + Sync {
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;

    /// All applications owned by `user`, soft-deleted ones included.
    fn applications_for_user(&self, user: &UserId) -> Result<Vec<Application>, RepositoryError>;

    fn fetch_card(&self, id: &HealthCardId) -> Result<Option<HealthCard>, RepositoryError>;

    /// Most recently issued card for `user`.
    fn latest_card_for_user(&self, user: &UserId) -> Result<Option<HealthCard>, RepositoryError>;

    fn legacy_referral_rows(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<LegacyReferralRow>, RepositoryError>;

    fn current_referrals(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<ReferralRecord>, RepositoryError>;

    /// Both referral tables, legacy rows adapted, with current-table preference applied.
    fn merged_referrals(
        &self,
        application: &ApplicationId,
    ) -> Result<MergedReferrals, RepositoryError> {
        let legacy = self
            .legacy_referral_rows(application)?
            .into_iter()
            .map(ReferralRecord::from)
            .collect();
        let current = self.current_referrals(application)?;
        Ok(MergedReferrals::merge(application.clone(), legacy, current))
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError>;
}

/// Writes produced by one request, applied all-or-nothing.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub at: DateTime<Utc>,
    pub application: Option<ApplicationWrite>,
    pub referral: Option<ReferralAppend>,
    /// Ledger rows (either table) to flag `was_replaced`.
    pub replaced: Vec<ReferralKey>,
    /// Ledger rows (either table) to flag `notification_sent`.
    pub notified: Vec<ReferralKey>,
    pub card: Option<HealthCard>,
}

impl ChangeSet {
    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            at,
            application: None,
            referral: None,
            replaced: Vec::new(),
            notified: Vec::new(),
            card: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.application.is_none()
            && self.referral.is_none()
            && self.replaced.is_empty()
            && self.notified.is_empty()
            && self.card.is_none()
    }
}

/// Application insert (`expected_revision: None`) or conditional update.
#[derive(Debug, Clone)]
pub struct ApplicationWrite {
    pub record: Application,
    pub expected_revision: Option<u64>,
}

/// New current-table ledger entry, valid only while the document's merged attempt count is
/// still `expected_attempts` and it has no unresolved referral.
#[derive(Debug, Clone)]
pub struct ReferralAppend {
    pub record: ReferralRecord,
    pub expected_attempts: u8,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record changed concurrently: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Document-type catalog collaborator.
pub trait DocumentCatalog: Send + Sync {
    fn display_name(&self, document: &DocumentTypeId) -> Option<String>;

    /// Documents an applicant must provide; security guards carry extra requirements.
    fn required_documents(&self, security_guard: bool) -> Vec<DocumentTypeId>;
}

/// User/role store collaborator.
pub trait RoleDirectory: Send + Sync {
    fn is_reviewer(&self, user: &UserId) -> bool;
}

/// Outbound notification transport. The engine only hands over composed payloads.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, payload: &NotificationPayload) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
