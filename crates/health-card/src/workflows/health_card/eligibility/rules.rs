use chrono::{DateTime, Utc};

use super::super::domain::{Application, ApplicationStatus, ApplicationType, HealthCard};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Statuses that block a renewal until the applicant finishes or cancels.
pub(crate) const IN_PROGRESS_STATUSES: [ApplicationStatus; 9] = [
    ApplicationStatus::Submitted,
    ApplicationStatus::ForDocumentVerification,
    ApplicationStatus::ForPaymentValidation,
    ApplicationStatus::ForOrientation,
    ApplicationStatus::Scheduled,
    ApplicationStatus::ForAttendanceValidation,
    ApplicationStatus::UnderReview,
    ApplicationStatus::DocumentsNeedRevision,
    ApplicationStatus::PendingPayment,
];

pub(crate) fn has_in_progress(applications: &[&Application]) -> bool {
    applications
        .iter()
        .any(|application| IN_PROGRESS_STATUSES.contains(&application.status))
}

/// Any renewal that has not reached a terminal state, drafts included.
pub(crate) fn has_open_renewal(applications: &[&Application]) -> bool {
    applications.iter().any(|application| {
        application.application_type == ApplicationType::Renew
            && !application.status.is_terminal()
    })
}

pub(crate) fn latest_approved<'a>(applications: &[&'a Application]) -> Option<&'a Application> {
    applications
        .iter()
        .copied()
        .filter(|application| application.status == ApplicationStatus::Approved)
        .max_by_key(|application| {
            application
                .approved_at
                .map(|at| at.timestamp_millis())
                .unwrap_or(0)
        })
}

pub(crate) fn card_for<'a>(
    application: &Application,
    card: Option<&'a HealthCard>,
) -> Option<&'a HealthCard> {
    card.filter(|card| card.application_id == application.id)
}

/// Whole days until expiry, rounded up; negative once the card has lapsed.
pub(crate) fn days_until_expiry(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (expiry - now).num_milliseconds();
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}
