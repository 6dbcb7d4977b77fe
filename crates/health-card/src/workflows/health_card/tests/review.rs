use super::common::*;

use crate::workflows::health_card::domain::{ApplicationStatus, DocumentReviewStatus};
use crate::workflows::health_card::referrals::{IssueType, ReferralTable};
use crate::workflows::health_card::repository::WorkflowRepository;
use crate::workflows::health_card::review::{Verdict, VerdictDetails};
use crate::workflows::health_card::service::WorkflowError;

#[test]
fn rejection_opens_first_attempt() {
    let harness = harness();
    let id = harness.submitted_application(false);

    let outcome = harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("verdict recorded");
    assert_eq!(outcome.new_status, ApplicationStatus::DocumentsNeedRevision);
    assert_eq!(outcome.attempt_number, Some(1));
    assert!(!outcome.permanently_closed);

    let ledger = harness.store.current_referrals(&id).expect("store available");
    assert_eq!(ledger.len(), 1);
    assert_eq!(Some(ledger[0].id.clone()), outcome.ledger_entry_id);
    assert_eq!(ledger[0].issue_type, IssueType::DocumentIssue);
    assert_eq!(ledger[0].reviewer_id, Some(reviewer()));
    assert!(ledger[0].doctor_name.is_none());
}

#[test]
fn referral_outranks_revision_in_status() {
    let harness = harness();
    let id = harness.submitted_application(false);

    harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("rejected");
    let outcome = harness
        .verdict(&id, "chest_xray", Verdict::Refer)
        .expect("referred");
    assert_eq!(
        outcome.new_status,
        ApplicationStatus::ReferredForMedicalManagement
    );

    let ledger = harness.store.current_referrals(&id).expect("store available");
    let referral = ledger
        .iter()
        .find(|record| record.document_type_id == doc("chest_xray"))
        .expect("referral recorded");
    assert_eq!(referral.issue_type, IssueType::MedicalReferral);
    assert_eq!(referral.doctor_name.as_deref(), Some("Dr. Cruz"));
}

#[test]
fn second_referral_without_resubmission_is_refused() {
    let harness = harness();
    let id = harness.submitted_application(false);
    harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("rejected");
    let before = harness.fetch(&id);

    match harness.verdict(&id, "valid_id", Verdict::Reject) {
        Err(WorkflowError::PreconditionFailed(message)) => {
            assert!(message.contains("unresolved referral"))
        }
        other => panic!("expected precondition failure, got {other:?}"),
    }

    assert_eq!(harness.fetch(&id), before);
    assert_eq!(
        harness.store.current_referrals(&id).expect("store").len(),
        1
    );
}

#[test]
fn repeat_flag_on_final_attempt_waits_for_resubmission() {
    let harness = harness();
    let id = harness.submitted_application(false);
    for _ in 0..2 {
        harness
            .verdict(&id, "valid_id", Verdict::Reject)
            .expect("rejected");
        harness.resubmit(&id, "valid_id");
    }
    let third = harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("final attempt opened");
    assert_eq!(third.attempt_number, Some(3));
    let before = harness.fetch(&id);

    match harness.verdict(&id, "valid_id", Verdict::Reject) {
        Err(WorkflowError::PreconditionFailed(message)) => {
            assert!(message.contains("unresolved referral"))
        }
        other => panic!("expected precondition failure, got {other:?}"),
    }
    assert_eq!(harness.fetch(&id), before);
    assert_eq!(before.status, ApplicationStatus::DocumentsNeedRevision);

    harness.resubmit(&id, "valid_id");
    let closing = harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("closure after the last resubmission");
    assert!(closing.permanently_closed);
}

#[test]
fn attempts_climb_by_one_per_review_cycle() {
    let harness = harness();
    let id = harness.submitted_application(false);

    for expected in 1..=3u8 {
        let outcome = harness
            .verdict(&id, "urinalysis", Verdict::Reject)
            .expect("rejected");
        assert_eq!(outcome.attempt_number, Some(expected));
        harness.resubmit(&id, "urinalysis");
    }

    let attempts: Vec<u8> = harness
        .referrals(&id)
        .history(&doc("urinalysis"))
        .into_iter()
        .map(|row| row.record.attempt_number)
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
}

#[test]
fn fourth_adverse_verdict_closes_the_application() {
    let harness = harness();
    let id = harness.submitted_application(false);
    for _ in 0..3 {
        harness
            .verdict(&id, "chest_xray", Verdict::Refer)
            .expect("referred");
        harness.resubmit(&id, "chest_xray");
    }

    let outcome = harness
        .verdict(&id, "chest_xray", Verdict::Refer)
        .expect("closure is a successful transition");
    assert!(outcome.permanently_closed);
    assert_eq!(outcome.new_status, ApplicationStatus::PermanentlyClosed);
    assert!(outcome.ledger_entry_id.is_none());

    let application = harness.fetch(&id);
    assert_eq!(application.status, ApplicationStatus::PermanentlyClosed);
    assert_eq!(application.closure_document, Some(doc("chest_xray")));
    assert!(application.closed_at.is_some());

    let ledger = harness.store.current_referrals(&id).expect("store");
    assert_eq!(ledger.len(), 3);
    assert!(ledger.iter().all(|record| record.attempt_number <= 3));

    assert!(matches!(
        harness.verdict(&id, "valid_id", Verdict::Approve),
        Err(WorkflowError::PreconditionFailed(_))
    ));
}

#[test]
fn legacy_attempts_count_towards_the_cap() {
    let harness = harness();
    let id = harness.submitted_application(false);
    let mut legacy = legacy_row("legacy-3", &id, "valid_id", 3, None);
    legacy.was_replaced = true;
    harness.store.seed_legacy_referral(legacy).expect("seeded");

    let outcome = harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("closure");
    assert!(outcome.permanently_closed);
    assert_eq!(outcome.attempt_number, Some(3));
}

#[test]
fn current_table_count_wins_over_legacy() {
    let harness = harness();
    let id = harness.submitted_application(false);
    harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("rejected");
    harness.resubmit(&id, "valid_id");

    let mut stale = legacy_row("legacy-2", &id, "valid_id", 2, None);
    stale.was_replaced = true;
    harness.store.seed_legacy_referral(stale).expect("seeded");

    let state = harness.referrals(&id).attempt_state(&doc("valid_id"));
    assert_eq!(state.count, 1);
    assert_eq!(state.source_table, Some(ReferralTable::Current));

    let outcome = harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("rejected again");
    assert_eq!(outcome.attempt_number, Some(2));
}

#[test]
fn approval_replaces_open_referral_in_both_tables() {
    let harness = harness();
    let id = harness.submitted_application(false);
    harness
        .verdict(&id, "chest_xray", Verdict::Refer)
        .expect("referred");
    harness
        .store
        .seed_legacy_referral(legacy_row("legacy-1", &id, "chest_xray", 1, Some("Dr. Lim")))
        .expect("seeded");

    let outcome = harness
        .verdict(&id, "chest_xray", Verdict::Approve)
        .expect("approved");
    assert!(outcome.attempt_number.is_none());

    assert!(harness
        .store
        .current_referrals(&id)
        .expect("store")
        .iter()
        .all(|record| record.was_replaced));
    assert!(harness
        .store
        .legacy_referral_rows(&id)
        .expect("store")
        .iter()
        .all(|row| row.was_replaced && row.replaced_at.is_some()));
    assert_eq!(
        harness.referrals(&id).attempt_state(&doc("chest_xray")).count,
        1
    );
}

#[test]
fn refer_requires_doctor_and_clinic() {
    let harness = harness();
    let id = harness.submitted_application(false);
    let details = VerdictDetails {
        referral_reason: "Elevated readings".to_string(),
        doctor_name: Some("  ".to_string()),
        clinic_address: Some("City Health Office".to_string()),
        ..VerdictDetails::default()
    };

    let result =
        harness
            .service
            .record_verdict(&id, &doc("chest_xray"), Verdict::Refer, details, &reviewer());
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
    assert!(harness.store.current_referrals(&id).expect("store").is_empty());
}

#[test]
fn reject_requires_reason() {
    let harness = harness();
    let id = harness.submitted_application(false);
    let result = harness.service.record_verdict(
        &id,
        &doc("valid_id"),
        Verdict::Reject,
        VerdictDetails::default(),
        &reviewer(),
    );
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
}

#[test]
fn non_reviewers_cannot_rule() {
    let harness = harness();
    let id = harness.submitted_application(false);
    let result = harness.service.record_verdict(
        &id,
        &doc("valid_id"),
        Verdict::Approve,
        VerdictDetails::default(),
        &applicant(),
    );
    assert!(matches!(result, Err(WorkflowError::Forbidden(_))));
}

#[test]
fn unknown_document_is_not_found() {
    let harness = harness();
    let id = harness.submitted_application(false);
    match harness.verdict(&id, "drug_test", Verdict::Approve) {
        Err(WorkflowError::NotFound { entity, id }) => {
            assert_eq!(entity, "document");
            assert_eq!(id, "drug_test");
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn draft_applications_take_no_verdicts() {
    let harness = harness();
    let draft = harness
        .service
        .create_application(intake(false))
        .expect("draft");
    harness.resubmit(&draft.id, "valid_id");
    assert!(matches!(
        harness.verdict(&draft.id, "valid_id", Verdict::Approve),
        Err(WorkflowError::PreconditionFailed(_))
    ));
    assert_eq!(
        harness.fetch(&draft.id).document_status(&doc("valid_id")),
        Some(DocumentReviewStatus::Pending)
    );
}
