use super::common::*;

use crate::workflows::health_card::domain::{Application, ApplicationId, ApplicationStatus};
use crate::workflows::health_card::referrals::{IssueType, ReferralId, ReferralRecord};
use crate::workflows::health_card::repository::{
    ApplicationWrite, ChangeSet, ReferralAppend, RepositoryError, WorkflowRepository,
};
use crate::workflows::health_card::service::WorkflowError;

fn flag(id: &str, application: &ApplicationId, attempt: u8) -> ReferralRecord {
    ReferralRecord {
        id: ReferralId(id.to_string()),
        application_id: application.clone(),
        document_type_id: doc("valid_id"),
        issue_type: IssueType::DocumentIssue,
        attempt_number: attempt,
        referral_reason: "Photo is blurred".to_string(),
        specific_issues: Vec::new(),
        doctor_name: None,
        clinic_address: None,
        reviewer_id: Some(reviewer()),
        notification_sent: false,
        notification_sent_at: None,
        was_replaced: false,
        replaced_at: None,
        created_at: start(),
    }
}

fn flag_changes(
    snapshot: &Application,
    referral: ReferralRecord,
    expected_attempts: u8,
) -> ChangeSet {
    let mut record = snapshot.clone();
    record.status = ApplicationStatus::DocumentsNeedRevision;
    let mut changes = ChangeSet::at(start());
    changes.application = Some(ApplicationWrite {
        record,
        expected_revision: Some(snapshot.revision),
    });
    changes.referral = Some(ReferralAppend {
        record: referral,
        expected_attempts,
    });
    changes
}

#[test]
fn stale_append_loses_to_competing_reviewer() {
    let harness = harness();
    let id = harness.submitted_application(false);
    let snapshot = harness.fetch(&id);
    let attempts = harness.referrals(&id).attempt_state(&doc("valid_id")).count;
    assert_eq!(attempts, 0);

    harness
        .store
        .commit(flag_changes(&snapshot, flag("ref-first", &id, 1), attempts))
        .expect("first reviewer commits");
    let after_first = harness.fetch(&id);

    let err = harness
        .store
        .commit(flag_changes(&snapshot, flag("ref-second", &id, 1), attempts))
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
    assert!(matches!(
        WorkflowError::from(err),
        WorkflowError::PreconditionFailed(_)
    ));

    assert_eq!(harness.fetch(&id), after_first);
    let ledger = harness.store.current_referrals(&id).expect("store");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].id, ReferralId("ref-first".to_string()));
}

#[test]
fn stale_attempt_count_is_refused_even_with_fresh_revision() {
    let harness = harness();
    let id = harness.submitted_application(false);
    let snapshot = harness.fetch(&id);

    harness
        .store
        .commit(flag_changes(&snapshot, flag("ref-first", &id, 1), 0))
        .expect("first flag commits");
    let fresh = harness.fetch(&id);

    match harness
        .store
        .commit(flag_changes(&fresh, flag("ref-stale", &id, 1), 0))
    {
        Err(RepositoryError::Conflict(message)) => assert!(message.contains("attempts")),
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(harness.fetch(&id), fresh);
    assert_eq!(harness.store.current_referrals(&id).expect("store").len(), 1);
}
