use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::WorkflowConfig;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationType, DocumentReviewStatus,
    DocumentTypeId, HealthCardId, OrientationState, PaymentState, PersonalDetails,
    RenewalFields, UserId,
};
use super::eligibility::{EligibilityResult, RenewalEligibilityEvaluator, RenewalPolicy};
use super::lifecycle::{derive_review_status, TransitionError};
use super::notifications::{NotificationComposer, NotificationPayload};
use super::referrals::{ReferralId, ReferralRecord, MAX_ATTEMPTS};
use super::repository::{
    ApplicationWrite, ChangeSet, Clock, DocumentCatalog, NotificationError,
    NotificationPublisher, RepositoryError, RoleDirectory, WorkflowRepository,
};
use super::review::{
    FinalDecision, FinalizeOutcome, ReviewEngine, ReviewError, Verdict, VerdictDetails,
    VerdictInput, VerdictOutcome,
};

/// Collaborators the workflow consults but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn DocumentCatalog>,
    pub roles: Arc<dyn RoleDirectory>,
    pub clock: Arc<dyn Clock>,
}

/// Intake payload for a first-time application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub user_id: UserId,
    pub personal: PersonalDetails,
    #[serde(default)]
    pub security_guard: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Validated,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceOutcome {
    CheckedIn,
    Attended,
    NoShow,
}

/// Per-document line of the status view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentView {
    pub document_type_id: DocumentTypeId,
    pub display_name: String,
    pub status: DocumentReviewStatus,
    pub attempts: u8,
    pub max_attempts: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    pub history: Vec<ReferralRecord>,
}

/// Read model served to applicants and staff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationView {
    pub application: Application,
    pub status_label: &'static str,
    pub documents: Vec<DocumentView>,
    pub has_unresolved_referrals: bool,
}

/// Service composing the repository, eligibility gate, review engine and notification composer.
pub struct HealthCardWorkflowService<R, P> {
    repository: Arc<R>,
    publisher: Arc<P>,
    catalog: Arc<dyn DocumentCatalog>,
    roles: Arc<dyn RoleDirectory>,
    clock: Arc<dyn Clock>,
    evaluator: RenewalEligibilityEvaluator,
    engine: ReviewEngine,
    composer: NotificationComposer,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static REFERRAL_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CARD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_referral_id() -> ReferralId {
    let id = REFERRAL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReferralId(format!("ref-{id:06}"))
}

fn next_card_id() -> HealthCardId {
    let id = CARD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    HealthCardId(format!("hc-{id:06}"))
}

impl<R, P> HealthCardWorkflowService<R, P>
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        publisher: Arc<P>,
        collaborators: Collaborators,
        config: &WorkflowConfig,
    ) -> Self {
        Self {
            repository,
            publisher,
            catalog: collaborators.catalog,
            roles: collaborators.roles,
            clock: collaborators.clock,
            evaluator: RenewalEligibilityEvaluator::new(RenewalPolicy::from(config)),
            engine: ReviewEngine::new(config.card_validity_days),
            composer: NotificationComposer,
        }
    }

    /// Run the renewal gate for `user` without side effects.
    pub fn get_renewal_eligibility(
        &self,
        user: &UserId,
    ) -> Result<EligibilityResult, WorkflowError> {
        let now = self.clock.now();
        self.evaluate_renewal(user, now)
    }

    fn evaluate_renewal(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<EligibilityResult, WorkflowError> {
        let applications = self.repository.applications_for_user(user)?;
        let card = self.repository.latest_card_for_user(user)?;
        Ok(self.evaluator.evaluate(&applications, card.as_ref(), now))
    }

    /// Create a Draft renewal seeded from the approved application behind `previous_card`.
    pub fn create_renewal_application(
        &self,
        user: &UserId,
        previous_card: &HealthCardId,
        fields: RenewalFields,
    ) -> Result<Application, WorkflowError> {
        let now = self.clock.now();

        let card = self
            .repository
            .fetch_card(previous_card)?
            .ok_or_else(|| WorkflowError::not_found("health card", previous_card))?;
        if &card.user_id != user {
            return Err(WorkflowError::Forbidden(format!(
                "health card {previous_card} does not belong to {user}"
            )));
        }

        let eligibility = self.evaluate_renewal(user, now)?;
        if !eligibility.is_eligible {
            return Err(WorkflowError::PreconditionFailed(eligibility.reason));
        }
        let (Some(previous), Some(eligible_card)) =
            (eligibility.eligible_application, eligibility.eligible_card)
        else {
            return Err(WorkflowError::PreconditionFailed(
                "no approved application backs this health card".to_string(),
            ));
        };
        if eligible_card.id != card.id {
            return Err(WorkflowError::PreconditionFailed(format!(
                "health card {previous_card} is not the card eligible for renewal"
            )));
        }

        let application = Application {
            id: next_application_id(),
            user_id: user.clone(),
            application_type: ApplicationType::Renew,
            status: ApplicationStatus::Draft,
            is_renewal: true,
            renewal_count: previous.renewal_count + 1,
            previous_health_card_id: Some(card.id.clone()),
            security_guard: previous.security_guard,
            personal: previous.personal.with_changes(&fields),
            documents: self.missing_documents(previous.security_guard),
            payment: PaymentState::Unpaid,
            orientation: OrientationState::NotScheduled,
            closure_document: None,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            approved_at: None,
            closed_at: None,
            closure_notified_at: None,
            deleted_at: None,
            revision: 0,
        };

        let stored = self.save(ChangeSet::at(now), application, None)?;
        info!(
            application_id = %stored.id,
            user_id = %user,
            previous_card = %card.id,
            renewal_count = stored.renewal_count,
            "renewal application created"
        );
        Ok(stored)
    }

    /// Open a first-time Draft application.
    pub fn create_application(&self, intake: NewApplication) -> Result<Application, WorkflowError> {
        let now = self.clock.now();
        validate_personal(&intake.personal)?;

        let existing = self.repository.applications_for_user(&intake.user_id)?;
        if existing
            .iter()
            .any(|application| application.is_active() && !application.status.is_terminal())
        {
            return Err(WorkflowError::PreconditionFailed(
                "complete or cancel the current application before starting a new one"
                    .to_string(),
            ));
        }

        let application = Application {
            id: next_application_id(),
            user_id: intake.user_id.clone(),
            application_type: ApplicationType::New,
            status: ApplicationStatus::Draft,
            is_renewal: false,
            renewal_count: 0,
            previous_health_card_id: None,
            security_guard: intake.security_guard,
            personal: intake.personal,
            documents: self.missing_documents(intake.security_guard),
            payment: PaymentState::Unpaid,
            orientation: OrientationState::NotScheduled,
            closure_document: None,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            approved_at: None,
            closed_at: None,
            closure_notified_at: None,
            deleted_at: None,
            revision: 0,
        };

        let stored = self.save(ChangeSet::at(now), application, None)?;
        info!(application_id = %stored.id, user_id = %stored.user_id, "application created");
        Ok(stored)
    }

    /// Applicant hands in a Draft once every required document is uploaded.
    pub fn submit_application(
        &self,
        id: &ApplicationId,
        user: &UserId,
    ) -> Result<Application, WorkflowError> {
        let now = self.clock.now();
        let application = self.load_owned(id, user)?;
        if application.status != ApplicationStatus::Draft {
            return Err(WorkflowError::PreconditionFailed(format!(
                "only draft applications can be submitted (currently {})",
                application.status
            )));
        }

        let missing: Vec<&str> = application
            .documents
            .iter()
            .filter(|(_, status)| **status == DocumentReviewStatus::Missing)
            .map(|(id, _)| id.0.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(WorkflowError::PreconditionFailed(format!(
                "documents not uploaded: {}",
                missing.join(", ")
            )));
        }

        let expected = application.revision;
        let mut updated = application;
        updated.transition_to(ApplicationStatus::Submitted, now)?;
        let stored = self.save(ChangeSet::at(now), updated, Some(expected))?;
        info!(application_id = %stored.id, status = %stored.status, "application submitted");
        Ok(stored)
    }

    /// Applicant uploads (or re-uploads) a document.
    ///
    /// Re-uploading a flagged document is the corrective action: its open referral is marked
    /// replaced in both ledger tables and the document goes back to review.
    pub fn submit_document(
        &self,
        id: &ApplicationId,
        document: &DocumentTypeId,
        user: &UserId,
    ) -> Result<Application, WorkflowError> {
        let now = self.clock.now();
        let application = self.load_owned(id, user)?;
        if application.status.is_terminal() {
            return Err(WorkflowError::PreconditionFailed(format!(
                "application is {}; documents can no longer be submitted",
                application.status
            )));
        }

        let current = application
            .document_status(document)
            .ok_or_else(|| WorkflowError::not_found("document", document))?;
        if current == DocumentReviewStatus::Approved {
            return Err(WorkflowError::PreconditionFailed(format!(
                "document '{document}' is already approved"
            )));
        }

        let mut changes = ChangeSet::at(now);
        let referrals = self.repository.merged_referrals(id)?;
        if let Some(open) = referrals.unresolved(document) {
            changes.replaced = open.keys;
        }

        let expected = application.revision;
        let mut updated = application;
        updated
            .documents
            .insert(document.clone(), DocumentReviewStatus::Pending);
        updated.updated_at = now;
        if updated.status.in_review() && updated.status != ApplicationStatus::Submitted {
            let next = derive_review_status(&updated);
            updated.transition_to(next, now)?;
        }

        let replaced = changes.replaced.len();
        let stored = self.save(changes, updated, Some(expected))?;
        info!(
            application_id = %stored.id,
            document_type_id = %document,
            replaced_referrals = replaced,
            status = %stored.status,
            "document submitted"
        );
        Ok(stored)
    }

    /// Record a reviewer's verdict on one document.
    pub fn record_verdict(
        &self,
        id: &ApplicationId,
        document: &DocumentTypeId,
        verdict: Verdict,
        details: VerdictDetails,
        reviewer: &UserId,
    ) -> Result<VerdictOutcome, WorkflowError> {
        self.require_reviewer(reviewer)?;
        let now = self.clock.now();
        let application = self.load(id)?;
        let referrals = self.repository.merged_referrals(id)?;

        let plan = self.engine.plan_verdict(
            &application,
            &referrals,
            VerdictInput {
                document,
                verdict,
                details: &details,
                reviewer,
                referral_id: next_referral_id(),
                now,
            },
        )?;
        self.repository.commit(plan.changes)?;

        let outcome = plan.outcome;
        if outcome.permanently_closed {
            warn!(
                application_id = %outcome.application_id,
                document_type_id = %outcome.document_type_id,
                attempt = ?outcome.attempt_number,
                "document attempts exhausted; application permanently closed"
            );
        } else {
            info!(
                application_id = %outcome.application_id,
                document_type_id = %outcome.document_type_id,
                verdict = ?outcome.verdict,
                attempt = ?outcome.attempt_number,
                status = %outcome.new_status,
                "document verdict recorded"
            );
        }
        Ok(outcome)
    }

    /// Close the review with an approval (issuing the card) or a rejection.
    pub fn finalize_application(
        &self,
        id: &ApplicationId,
        decision: FinalDecision,
        reviewer: &UserId,
    ) -> Result<FinalizeOutcome, WorkflowError> {
        self.require_reviewer(reviewer)?;
        let now = self.clock.now();
        let application = self.load(id)?;
        let referrals = self.repository.merged_referrals(id)?;

        let plan =
            self.engine
                .plan_finalize(&application, &referrals, decision, next_card_id(), now)?;
        self.repository.commit(plan.changes)?;

        let outcome = plan.outcome;
        info!(
            application_id = %outcome.application_id,
            status = %outcome.status,
            health_card = ?outcome.health_card.as_ref().map(|card| card.id.to_string()),
            "application finalized"
        );
        Ok(outcome)
    }

    /// Compose payloads for every unannounced referral (and closure), then mark them notified.
    pub fn compose_and_mark_notifications(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<NotificationPayload>, WorkflowError> {
        let now = self.clock.now();
        let application = self.load(id)?;
        let referrals = self.repository.merged_referrals(id)?;

        let mut changes = ChangeSet::at(now);
        let mut payloads = Vec::new();
        for referral in referrals.pending_notifications() {
            let name = self.display_name(&referral.record.document_type_id);
            payloads.push(
                self.composer
                    .compose_referral(&application, &referral, &name),
            );
            changes.notified.extend(referral.keys);
        }
        changes
            .notified
            .extend(referrals.superseded_notification_keys());

        if application.status == ApplicationStatus::PermanentlyClosed
            && application.closure_notified_at.is_none()
        {
            let name = application
                .closure_document
                .as_ref()
                .map(|document| self.display_name(document));
            payloads.push(self.composer.compose_closure(&application, name.as_deref()));

            let mut updated = application.clone();
            updated.closure_notified_at = Some(now);
            updated.updated_at = now;
            changes.application = Some(ApplicationWrite {
                record: updated,
                expected_revision: Some(application.revision),
            });
        }

        if changes.is_empty() {
            debug!(application_id = %id, "no pending notifications");
            return Ok(payloads);
        }

        let marked = changes.notified.len();
        self.repository.commit(changes)?;
        info!(
            application_id = %id,
            payloads = payloads.len(),
            marked_rows = marked,
            "notifications composed"
        );
        Ok(payloads)
    }

    /// Compose, mark and hand every payload to the publisher.
    ///
    /// Rows are marked before sending, so a transport failure drops the notice rather than
    /// repeating it on retry.
    pub fn dispatch_notifications(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<NotificationPayload>, WorkflowError> {
        let payloads = self.compose_and_mark_notifications(id)?;
        for payload in &payloads {
            self.publisher.publish(payload)?;
        }
        if !payloads.is_empty() {
            info!(application_id = %id, sent = payloads.len(), "notifications dispatched");
        }
        Ok(payloads)
    }

    /// Applicant reports a payment; staff validate it later.
    pub fn record_payment_submitted(
        &self,
        id: &ApplicationId,
        user: &UserId,
    ) -> Result<Application, WorkflowError> {
        let now = self.clock.now();
        let application = self.load_owned(id, user)?;
        if application.status.is_terminal() {
            return Err(WorkflowError::PreconditionFailed(format!(
                "application is {}; payment is closed",
                application.status
            )));
        }
        if application.payment != PaymentState::Unpaid {
            return Err(WorkflowError::PreconditionFailed(
                "a payment has already been submitted".to_string(),
            ));
        }

        let expected = application.revision;
        let mut updated = application;
        updated.payment = PaymentState::Submitted;
        updated.updated_at = now;
        self.rederive(&mut updated, now)?;

        let stored = self.save(ChangeSet::at(now), updated, Some(expected))?;
        info!(application_id = %stored.id, status = %stored.status, "payment submitted");
        Ok(stored)
    }

    /// Payment-outcome feed.
    pub fn record_payment_outcome(
        &self,
        id: &ApplicationId,
        outcome: PaymentOutcome,
    ) -> Result<Application, WorkflowError> {
        let now = self.clock.now();
        let application = self.load(id)?;
        if application.status != ApplicationStatus::ForPaymentValidation {
            return Err(WorkflowError::PreconditionFailed(format!(
                "application is {}; no payment awaits validation",
                application.status
            )));
        }

        let expected = application.revision;
        let mut updated = application;
        updated.payment = match outcome {
            PaymentOutcome::Validated => PaymentState::Validated,
            PaymentOutcome::Rejected => PaymentState::Unpaid,
        };
        updated.updated_at = now;
        self.rederive(&mut updated, now)?;

        let stored = self.save(ChangeSet::at(now), updated, Some(expected))?;
        info!(
            application_id = %stored.id,
            outcome = ?outcome,
            status = %stored.status,
            "payment outcome recorded"
        );
        Ok(stored)
    }

    pub fn schedule_orientation(
        &self,
        id: &ApplicationId,
        at: DateTime<Utc>,
    ) -> Result<Application, WorkflowError> {
        let now = self.clock.now();
        let application = self.load(id)?;
        if application.status != ApplicationStatus::ForOrientation {
            return Err(WorkflowError::PreconditionFailed(format!(
                "application is {}; orientation cannot be scheduled",
                application.status
            )));
        }
        if at <= now {
            return Err(WorkflowError::Validation(
                "orientation must be scheduled in the future".to_string(),
            ));
        }

        let expected = application.revision;
        let mut updated = application;
        updated.orientation = OrientationState::Scheduled { at };
        updated.updated_at = now;
        self.rederive(&mut updated, now)?;

        let stored = self.save(ChangeSet::at(now), updated, Some(expected))?;
        info!(application_id = %stored.id, orientation_at = %at, "orientation scheduled");
        Ok(stored)
    }

    /// Orientation-attendance feed.
    pub fn record_attendance(
        &self,
        id: &ApplicationId,
        outcome: AttendanceOutcome,
    ) -> Result<Application, WorkflowError> {
        let now = self.clock.now();
        let application = self.load(id)?;
        let allowed = match outcome {
            AttendanceOutcome::CheckedIn => application.status == ApplicationStatus::Scheduled,
            AttendanceOutcome::Attended => {
                application.status == ApplicationStatus::ForAttendanceValidation
            }
            AttendanceOutcome::NoShow => matches!(
                application.status,
                ApplicationStatus::Scheduled | ApplicationStatus::ForAttendanceValidation
            ),
        };
        if !allowed {
            return Err(WorkflowError::PreconditionFailed(format!(
                "attendance outcome {outcome:?} does not apply to an application that is {}",
                application.status
            )));
        }

        let expected = application.revision;
        let mut updated = application;
        updated.orientation = match outcome {
            AttendanceOutcome::CheckedIn => OrientationState::CheckedIn,
            AttendanceOutcome::Attended => OrientationState::Attended,
            AttendanceOutcome::NoShow => OrientationState::NotScheduled,
        };
        updated.updated_at = now;
        self.rederive(&mut updated, now)?;

        let stored = self.save(ChangeSet::at(now), updated, Some(expected))?;
        info!(
            application_id = %stored.id,
            outcome = ?outcome,
            status = %stored.status,
            "attendance recorded"
        );
        Ok(stored)
    }

    /// Applicant withdraws. Open referrals stay in the ledger as they are.
    pub fn cancel_application(
        &self,
        id: &ApplicationId,
        user: &UserId,
    ) -> Result<Application, WorkflowError> {
        let now = self.clock.now();
        let application = self.load_owned(id, user)?;
        let expected = application.revision;
        let mut updated = application;
        updated.transition_to(ApplicationStatus::Cancelled, now)?;

        let stored = self.save(ChangeSet::at(now), updated, Some(expected))?;
        info!(application_id = %stored.id, "application cancelled");
        Ok(stored)
    }

    /// Hide a Draft or finished application from the applicant and the renewal gate.
    pub fn soft_delete_application(
        &self,
        id: &ApplicationId,
        user: &UserId,
    ) -> Result<(), WorkflowError> {
        let now = self.clock.now();
        let application = self.load_owned(id, user)?;
        if application.status.in_review() {
            return Err(WorkflowError::PreconditionFailed(format!(
                "application is {}; cancel it before deleting",
                application.status
            )));
        }

        let expected = application.revision;
        let mut updated = application;
        updated.deleted_at = Some(now);
        updated.updated_at = now;
        self.save(ChangeSet::at(now), updated, Some(expected))?;
        info!(application_id = %id, "application deleted");
        Ok(())
    }

    /// Status view with per-document attempt badges from the merged ledger.
    pub fn get_application(&self, id: &ApplicationId) -> Result<ApplicationView, WorkflowError> {
        let application = self.load(id)?;
        let referrals = self.repository.merged_referrals(id)?;

        let documents = application
            .documents
            .iter()
            .map(|(document, status)| {
                let attempts = referrals.attempt_state(document).count;
                DocumentView {
                    document_type_id: document.clone(),
                    display_name: self.display_name(document),
                    status: *status,
                    attempts,
                    max_attempts: MAX_ATTEMPTS,
                    badge: (attempts > 0)
                        .then(|| format!("Attempt {attempts} of {MAX_ATTEMPTS}")),
                    history: referrals
                        .history(document)
                        .into_iter()
                        .map(|row| row.record.clone())
                        .collect(),
                }
            })
            .collect();

        Ok(ApplicationView {
            status_label: application.status.label(),
            has_unresolved_referrals: referrals.has_unresolved(),
            documents,
            application,
        })
    }

    /// Applications owned by `user`, oldest first, soft-deleted ones excluded.
    pub fn list_applications(&self, user: &UserId) -> Result<Vec<Application>, WorkflowError> {
        Ok(self
            .repository
            .applications_for_user(user)?
            .into_iter()
            .filter(Application::is_active)
            .collect())
    }

    fn load(&self, id: &ApplicationId) -> Result<Application, WorkflowError> {
        self.repository
            .fetch_application(id)?
            .filter(Application::is_active)
            .ok_or_else(|| WorkflowError::not_found("application", id))
    }

    fn load_owned(&self, id: &ApplicationId, user: &UserId) -> Result<Application, WorkflowError> {
        let application = self.load(id)?;
        if !application.is_owned_by(user) {
            return Err(WorkflowError::Forbidden(format!(
                "application {id} does not belong to {user}"
            )));
        }
        Ok(application)
    }

    fn require_reviewer(&self, user: &UserId) -> Result<(), WorkflowError> {
        if self.roles.is_reviewer(user) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden(format!(
                "{user} is not authorized to review applications"
            )))
        }
    }

    fn missing_documents(&self, security_guard: bool) -> BTreeMap<DocumentTypeId, DocumentReviewStatus> {
        self.catalog
            .required_documents(security_guard)
            .into_iter()
            .map(|document| (document, DocumentReviewStatus::Missing))
            .collect()
    }

    fn display_name(&self, document: &DocumentTypeId) -> String {
        self.catalog
            .display_name(document)
            .unwrap_or_else(|| document.0.clone())
    }

    // Submitted applications wait for the first verdict before derivation applies.
    fn rederive(
        &self,
        application: &mut Application,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if application.status.in_review() && application.status != ApplicationStatus::Submitted {
            let next = derive_review_status(application);
            application.transition_to(next, now)?;
        }
        Ok(())
    }

    fn save(
        &self,
        mut changes: ChangeSet,
        mut application: Application,
        expected_revision: Option<u64>,
    ) -> Result<Application, WorkflowError> {
        changes.application = Some(ApplicationWrite {
            record: application.clone(),
            expected_revision,
        });
        self.repository.commit(changes)?;
        if let Some(expected) = expected_revision {
            application.revision = expected + 1;
        }
        Ok(application)
    }
}

fn validate_personal(personal: &PersonalDetails) -> Result<(), WorkflowError> {
    let required = [
        ("full_name", &personal.full_name),
        ("sex", &personal.sex),
        ("address", &personal.address),
        ("contact_number", &personal.contact_number),
        ("occupation", &personal.occupation),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(WorkflowError::Validation(format!("{field} must not be blank")));
        }
    }
    Ok(())
}

/// Error raised by the health card workflow service.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("storage unavailable: {0}")]
    Storage(String),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl WorkflowError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict(detail) => Self::PreconditionFailed(detail),
            RepositoryError::NotFound(detail) => Self::NotFound {
                entity: "record",
                id: detail,
            },
            RepositoryError::Unavailable(detail) => Self::Storage(detail),
        }
    }
}

impl From<ReviewError> for WorkflowError {
    fn from(error: ReviewError) -> Self {
        match error {
            ReviewError::UnknownDocument(document) => Self::not_found("document", document),
            ReviewError::Invalid(detail) => Self::Validation(detail),
            ReviewError::Precondition(detail) => Self::PreconditionFailed(detail),
            ReviewError::Transition(transition) => Self::from(transition),
        }
    }
}

impl From<TransitionError> for WorkflowError {
    fn from(error: TransitionError) -> Self {
        Self::PreconditionFailed(error.to_string())
    }
}
