//! Health card application review, referral escalation and renewal.
//!
//! Applications move through a fixed lifecycle. Reviewers rule on each required document; adverse
//! rulings are written to a referral ledger that caps every document at three attempts before the
//! application is closed for good. Approved applications issue a card, and cards near expiry pass
//! through the renewal gate before a renewal application can be opened.

pub mod domain;
pub mod eligibility;
pub mod lifecycle;
pub mod memory;
pub mod notifications;
pub mod referrals;
pub mod repository;
pub mod review;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationType, DocumentReviewStatus,
    DocumentTypeId, HealthCard, HealthCardId, OrientationState, PaymentState, PersonalDetails,
    RenewalFields, UserId,
};
pub use eligibility::{
    EligibilityCode, EligibilityResult, RenewalEligibilityEvaluator, RenewalPolicy,
};
pub use lifecycle::TransitionError;
pub use memory::InMemoryWorkflowStore;
pub use notifications::{NotificationComposer, NotificationKind, NotificationPayload};
pub use referrals::{
    AttemptState, IssueType, LegacyReferralRow, MergedReferrals, ReferralId, ReferralKey,
    ReferralRecord, ReferralTable, MAX_ATTEMPTS,
};
pub use repository::{
    ChangeSet, Clock, DocumentCatalog, NotificationError, NotificationPublisher, RepositoryError,
    RoleDirectory, SystemClock, WorkflowRepository,
};
pub use review::{FinalDecision, FinalizeOutcome, Verdict, VerdictDetails, VerdictOutcome};
pub use router::{health_card_router, workflow_status};
pub use service::{
    ApplicationView, AttendanceOutcome, Collaborators, DocumentView, HealthCardWorkflowService,
    NewApplication, PaymentOutcome, WorkflowError,
};
