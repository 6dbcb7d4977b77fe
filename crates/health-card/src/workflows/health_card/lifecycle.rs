//! Transition table and status derivation for the application lifecycle.
//!
//! Every status change goes through [`Application::transition_to`], which rejects edges that are
//! not in the table. Review-zone events never pick a status directly; they update documents or
//! milestones and then ask [`derive_review_status`] where the application now sits.

use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationStatus, DocumentReviewStatus, OrientationState, PaymentState,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("application cannot move from {from} to {to}")]
    NotAllowed {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

/// Whether the lifecycle permits moving directly from `from` to `to`.
pub fn allows(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;

    if from.is_terminal() {
        return false;
    }

    match (from, to) {
        (Draft, Submitted) | (Draft, Cancelled) => true,
        (Draft, _) => false,
        (_, Cancelled) | (_, PermanentlyClosed) | (_, Rejected) => true,
        (UnderReview, Approved) => true,
        (_, Approved) | (_, Draft) | (_, Submitted) => false,
        _ => to.in_review(),
    }
}

impl Application {
    /// Move to `next`, stamping lifecycle timestamps. Staying put is allowed until the
    /// application reaches a terminal state.
    pub fn transition_to(
        &mut self,
        next: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::NotAllowed {
                from: self.status,
                to: next,
            });
        }
        if self.status == next {
            return Ok(());
        }
        if !allows(self.status, next) {
            return Err(TransitionError::NotAllowed {
                from: self.status,
                to: next,
            });
        }

        match next {
            ApplicationStatus::Submitted => self.submitted_at = Some(at),
            ApplicationStatus::Approved => self.approved_at = Some(at),
            ApplicationStatus::Rejected
            | ApplicationStatus::Cancelled
            | ApplicationStatus::PermanentlyClosed => self.closed_at = Some(at),
            _ => {}
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}

/// Where a review-zone application belongs given its documents and milestones.
pub fn derive_review_status(application: &Application) -> ApplicationStatus {
    let statuses = || application.documents.values().copied();

    if statuses().any(|status| status == DocumentReviewStatus::Referred) {
        return ApplicationStatus::ReferredForMedicalManagement;
    }
    if statuses().any(|status| status == DocumentReviewStatus::Rejected) {
        return ApplicationStatus::DocumentsNeedRevision;
    }
    if statuses().any(|status| !status.has_verdict()) {
        return ApplicationStatus::ForDocumentVerification;
    }

    match (application.payment, application.orientation) {
        (PaymentState::Unpaid, _) => ApplicationStatus::PendingPayment,
        (PaymentState::Submitted, _) => ApplicationStatus::ForPaymentValidation,
        (PaymentState::Validated, OrientationState::NotScheduled) => {
            ApplicationStatus::ForOrientation
        }
        (PaymentState::Validated, OrientationState::Scheduled { .. }) => {
            ApplicationStatus::Scheduled
        }
        (PaymentState::Validated, OrientationState::CheckedIn) => {
            ApplicationStatus::ForAttendanceValidation
        }
        (PaymentState::Validated, OrientationState::Attended) => ApplicationStatus::UnderReview,
    }
}
