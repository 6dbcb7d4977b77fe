use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, DocumentReviewStatus, DocumentTypeId,
    HealthCard, HealthCardId, UserId,
};
use super::lifecycle::{derive_review_status, TransitionError};
use super::referrals::{IssueType, MergedReferrals, ReferralId, ReferralRecord};
use super::repository::{ApplicationWrite, ChangeSet, ReferralAppend};

/// Reviewer ruling on one uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    /// Document must be corrected and resubmitted.
    Reject,
    /// Applicant must see a doctor before the document can be accepted.
    Refer,
}

impl Verdict {
    fn document_status(self) -> DocumentReviewStatus {
        match self {
            Verdict::Approve => DocumentReviewStatus::Approved,
            Verdict::Reject => DocumentReviewStatus::Rejected,
            Verdict::Refer => DocumentReviewStatus::Referred,
        }
    }

    fn issue_type(self) -> Option<IssueType> {
        match self {
            Verdict::Approve => None,
            Verdict::Reject => Some(IssueType::DocumentIssue),
            Verdict::Refer => Some(IssueType::MedicalReferral),
        }
    }
}

/// Findings attached to an adverse verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictDetails {
    #[serde(default)]
    pub referral_reason: String,
    #[serde(default)]
    pub specific_issues: Vec<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub clinic_address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerdictOutcome {
    pub application_id: ApplicationId,
    pub document_type_id: DocumentTypeId,
    pub verdict: Verdict,
    pub new_status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_entry_id: Option<ReferralId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u8>,
    /// The verdict exhausted the document's attempts and closed the application.
    pub permanently_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizeOutcome {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_card: Option<HealthCard>,
}

/// Decision engine failures; the service maps them onto the public taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("document '{0}' is not part of this application")]
    UnknownDocument(DocumentTypeId),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Everything the engine needs to rule on one document.
pub(crate) struct VerdictInput<'a> {
    pub document: &'a DocumentTypeId,
    pub verdict: Verdict,
    pub details: &'a VerdictDetails,
    pub reviewer: &'a UserId,
    /// Id to use if the verdict appends a ledger entry.
    pub referral_id: ReferralId,
    pub now: DateTime<Utc>,
}

pub(crate) struct VerdictPlan {
    pub outcome: VerdictOutcome,
    pub changes: ChangeSet,
}

pub(crate) struct FinalizePlan {
    pub outcome: FinalizeOutcome,
    pub changes: ChangeSet,
}

/// Pure planner: turns a verdict or final decision into the writes that express it.
#[derive(Debug, Clone)]
pub struct ReviewEngine {
    card_validity: Duration,
}

impl ReviewEngine {
    pub fn new(card_validity_days: i64) -> Self {
        Self {
            card_validity: Duration::days(card_validity_days),
        }
    }

    pub(crate) fn plan_verdict(
        &self,
        application: &Application,
        referrals: &MergedReferrals,
        input: VerdictInput<'_>,
    ) -> Result<VerdictPlan, ReviewError> {
        let VerdictInput {
            document,
            verdict,
            details,
            reviewer,
            referral_id,
            now,
        } = input;

        if !application.status.in_review() {
            return Err(ReviewError::Precondition(format!(
                "application is {}; document verdicts are not accepted",
                application.status
            )));
        }
        let current = application
            .document_status(document)
            .ok_or_else(|| ReviewError::UnknownDocument(document.clone()))?;
        if current == DocumentReviewStatus::Missing {
            return Err(ReviewError::Precondition(format!(
                "document '{document}' has not been uploaded"
            )));
        }

        let mut updated = application.clone();
        let mut changes = ChangeSet::at(now);
        updated
            .documents
            .insert(document.clone(), verdict.document_status());

        let mut ledger_entry_id = None;
        let mut attempt_number = None;
        let mut permanently_closed = false;

        match verdict.issue_type() {
            None => {
                if let Some(open) = referrals.unresolved(document) {
                    changes.replaced = open.keys;
                }
                let next = derive_review_status(&updated);
                updated.transition_to(next, now)?;
            }
            Some(issue_type) => {
                validate_details(verdict, details)?;
                if referrals.unresolved(document).is_some() {
                    return Err(ReviewError::Precondition(format!(
                        "document '{document}' already has an unresolved referral"
                    )));
                }
                let attempts = referrals.attempt_state(document);

                match attempts.next_attempt() {
                    None => {
                        updated.closure_document = Some(document.clone());
                        updated.transition_to(ApplicationStatus::PermanentlyClosed, now)?;
                        attempt_number = Some(attempts.count);
                        permanently_closed = true;
                    }
                    Some(attempt) => {
                        let medical = issue_type == IssueType::MedicalReferral;
                        let record = ReferralRecord {
                            id: referral_id,
                            application_id: application.id.clone(),
                            document_type_id: document.clone(),
                            issue_type,
                            attempt_number: attempt,
                            referral_reason: details.referral_reason.trim().to_string(),
                            specific_issues: clean_issues(&details.specific_issues),
                            doctor_name: medical
                                .then(|| trimmed(&details.doctor_name))
                                .flatten(),
                            clinic_address: medical
                                .then(|| trimmed(&details.clinic_address))
                                .flatten(),
                            reviewer_id: Some(reviewer.clone()),
                            notification_sent: false,
                            notification_sent_at: None,
                            was_replaced: false,
                            replaced_at: None,
                            created_at: now,
                        };

                        ledger_entry_id = Some(record.id.clone());
                        attempt_number = Some(attempt);
                        changes.referral = Some(ReferralAppend {
                            record,
                            expected_attempts: attempts.count,
                        });

                        let next = derive_review_status(&updated);
                        updated.transition_to(next, now)?;
                    }
                }
            }
        }

        updated.updated_at = now;
        let outcome = VerdictOutcome {
            application_id: application.id.clone(),
            document_type_id: document.clone(),
            verdict,
            new_status: updated.status,
            ledger_entry_id,
            attempt_number,
            permanently_closed,
        };
        changes.application = Some(ApplicationWrite {
            record: updated,
            expected_revision: Some(application.revision),
        });

        Ok(VerdictPlan { outcome, changes })
    }

    /// Validate the complete review set and close the application with `decision`.
    pub(crate) fn plan_finalize(
        &self,
        application: &Application,
        referrals: &MergedReferrals,
        decision: FinalDecision,
        card_id: HealthCardId,
        now: DateTime<Utc>,
    ) -> Result<FinalizePlan, ReviewError> {
        if !application.status.in_review() {
            return Err(ReviewError::Precondition(format!(
                "application is {} and cannot be finalized",
                application.status
            )));
        }

        let unreviewed = application.unreviewed_documents();
        if !unreviewed.is_empty() {
            return Err(ReviewError::Precondition(format!(
                "documents awaiting review: {}",
                join_ids(&unreviewed)
            )));
        }

        let adverse = application.adverse_documents();
        let mut updated = application.clone();
        let mut changes = ChangeSet::at(now);
        let mut health_card = None;

        match decision {
            FinalDecision::Rejected => {
                if adverse.is_empty() {
                    return Err(ReviewError::Precondition(
                        "rejection requires at least one rejected or referred document"
                            .to_string(),
                    ));
                }
                updated.transition_to(ApplicationStatus::Rejected, now)?;
            }
            FinalDecision::Approved => {
                if !adverse.is_empty() {
                    return Err(ReviewError::Precondition(format!(
                        "cannot approve with pending referrals on: {}",
                        join_ids(&adverse)
                    )));
                }
                if referrals.has_unresolved() {
                    return Err(ReviewError::Precondition(
                        "cannot approve while ledger referrals remain unresolved".to_string(),
                    ));
                }
                if application.status != ApplicationStatus::UnderReview {
                    return Err(ReviewError::Precondition(format!(
                        "application must be Under Review to approve (currently {})",
                        application.status
                    )));
                }

                updated.transition_to(ApplicationStatus::Approved, now)?;
                let card = HealthCard {
                    id: card_id,
                    application_id: application.id.clone(),
                    user_id: application.user_id.clone(),
                    issued_at: now,
                    expiry_date: now + self.card_validity,
                };
                changes.card = Some(card.clone());
                health_card = Some(card);
            }
        }

        let outcome = FinalizeOutcome {
            application_id: application.id.clone(),
            status: updated.status,
            health_card,
        };
        changes.application = Some(ApplicationWrite {
            record: updated,
            expected_revision: Some(application.revision),
        });

        Ok(FinalizePlan { outcome, changes })
    }
}

fn validate_details(verdict: Verdict, details: &VerdictDetails) -> Result<(), ReviewError> {
    if details.referral_reason.trim().is_empty() {
        return Err(ReviewError::Invalid(
            "a referral reason is required when rejecting or referring a document".to_string(),
        ));
    }
    if verdict == Verdict::Refer {
        if trimmed(&details.doctor_name).is_none() {
            return Err(ReviewError::Invalid(
                "medical referrals require a doctor name".to_string(),
            ));
        }
        if trimmed(&details.clinic_address).is_none() {
            return Err(ReviewError::Invalid(
                "medical referrals require a clinic address".to_string(),
            ));
        }
    }
    Ok(())
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn clean_issues(issues: &[String]) -> Vec<String> {
    issues
        .iter()
        .map(|issue| issue.trim())
        .filter(|issue| !issue.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_ids(ids: &[&DocumentTypeId]) -> String {
    ids.iter()
        .map(|id| id.0.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
