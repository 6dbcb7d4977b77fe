use super::common::*;

use crate::workflows::health_card::notifications::NotificationKind;
use crate::workflows::health_card::referrals::ReferralId;
use crate::workflows::health_card::repository::WorkflowRepository;
use crate::workflows::health_card::review::Verdict;

#[test]
fn mirrored_referral_yields_one_payload_and_marks_both_rows() {
    let harness = harness();
    let id = harness.submitted_application(false);
    let outcome = harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("rejected");
    harness
        .store
        .seed_legacy_referral(legacy_row("legacy-mirror", &id, "valid_id", 1, None))
        .expect("seeded");

    let payloads = harness
        .service
        .compose_and_mark_notifications(&id)
        .expect("composed");
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].referral_id, outcome.ledger_entry_id);
    assert_eq!(payloads[0].kind, NotificationKind::DocumentIssue);
    assert_eq!(
        payloads[0].action_url,
        format!("/applications/{id}/documents/valid_id/resubmit")
    );

    assert!(harness
        .store
        .current_referrals(&id)
        .expect("store")
        .iter()
        .all(|record| record.notification_sent && record.notification_sent_at.is_some()));
    assert!(harness
        .store
        .legacy_referral_rows(&id)
        .expect("store")
        .iter()
        .all(|row| row.notification_sent));

    assert!(harness
        .service
        .compose_and_mark_notifications(&id)
        .expect("composed")
        .is_empty());
}

#[test]
fn legacy_only_referral_is_announced_with_inferred_type() {
    let harness = harness();
    let id = harness.submitted_application(false);
    harness
        .store
        .seed_legacy_referral(legacy_row(
            "legacy-med",
            &id,
            "chest_xray",
            2,
            Some("Dr. Lim"),
        ))
        .expect("seeded");

    let payloads = harness
        .service
        .compose_and_mark_notifications(&id)
        .expect("composed");
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].kind, NotificationKind::MedicalReferral);
    assert_eq!(payloads[0].attempt_number, Some(2));
    assert_eq!(
        payloads[0].referral_id,
        Some(ReferralId("legacy-med".to_string()))
    );
    assert!(payloads[0].body.contains("Warning: this is attempt 2 of 3"));
}

#[test]
fn one_payload_per_flagged_document() {
    let harness = harness();
    let id = harness.submitted_application(false);
    harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("rejected");
    harness
        .verdict(&id, "chest_xray", Verdict::Refer)
        .expect("referred");

    let payloads = harness
        .service
        .compose_and_mark_notifications(&id)
        .expect("composed");
    let mut documents: Vec<String> = payloads
        .iter()
        .filter_map(|payload| payload.document_type_id.as_ref().map(|doc| doc.0.clone()))
        .collect();
    documents.sort();
    assert_eq!(documents, vec!["chest_xray", "valid_id"]);
}

#[test]
fn resubmitted_document_gets_no_revision_notice() {
    let harness = harness();
    let id = harness.submitted_application(false);
    harness
        .verdict(&id, "valid_id", Verdict::Reject)
        .expect("rejected");
    harness.resubmit(&id, "valid_id");

    assert!(harness
        .service
        .dispatch_notifications(&id)
        .expect("dispatched")
        .is_empty());
    assert!(harness.publisher.sent().is_empty());
    assert!(harness
        .store
        .current_referrals(&id)
        .expect("store")
        .iter()
        .all(|record| record.notification_sent && record.was_replaced));
}

#[test]
fn unknown_application_is_not_found() {
    let harness = harness();
    let missing = crate::workflows::health_card::domain::ApplicationId("app-missing".to_string());
    assert!(harness
        .service
        .compose_and_mark_notifications(&missing)
        .is_err());
}
