use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::WorkflowConfig;
use crate::workflows::health_card::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationType, DocumentReviewStatus,
    DocumentTypeId, HealthCard, HealthCardId, OrientationState, PaymentState, PersonalDetails,
    UserId,
};
use crate::workflows::health_card::memory::InMemoryWorkflowStore;
use crate::workflows::health_card::notifications::NotificationPayload;
use crate::workflows::health_card::referrals::{
    LegacyReferralRow, MergedReferrals, ReferralId, ReferralRecord,
};
use crate::workflows::health_card::repository::{
    ChangeSet, Clock, DocumentCatalog, NotificationError, NotificationPublisher, RepositoryError,
    RoleDirectory, WorkflowRepository,
};
use crate::workflows::health_card::review::{Verdict, VerdictDetails, VerdictOutcome};
use crate::workflows::health_card::service::{
    AttendanceOutcome, Collaborators, HealthCardWorkflowService, NewApplication, PaymentOutcome,
    WorkflowError,
};
use crate::workflows::health_card::{health_card_router, FinalDecision};

pub(super) const APPLICANT: &str = "applicant-1";
pub(super) const REVIEWER: &str = "staff-001";

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

pub(super) fn applicant() -> UserId {
    UserId(APPLICANT.to_string())
}

pub(super) fn reviewer() -> UserId {
    UserId(REVIEWER.to_string())
}

pub(super) fn doc(id: &str) -> DocumentTypeId {
    DocumentTypeId(id.to_string())
}

pub(super) fn workflow_config() -> WorkflowConfig {
    WorkflowConfig {
        renewal_window_days: 30,
        card_validity_days: 365,
        reviewer_ids: vec![REVIEWER.to_string()],
    }
}

pub(super) fn personal() -> PersonalDetails {
    PersonalDetails {
        full_name: "Maria Santos".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1994, 4, 2).expect("valid"),
        sex: "F".to_string(),
        address: "12 Rizal St, Poblacion".to_string(),
        contact_number: "09171234567".to_string(),
        occupation: "Food handler".to_string(),
        establishment: Some("Bakeshop Dos".to_string()),
    }
}

pub(super) fn intake(security_guard: bool) -> NewApplication {
    NewApplication {
        user_id: applicant(),
        personal: personal(),
        security_guard,
    }
}

pub(super) fn details(verdict: Verdict) -> VerdictDetails {
    match verdict {
        Verdict::Approve => VerdictDetails::default(),
        Verdict::Reject => VerdictDetails {
            referral_reason: "Photo is blurred".to_string(),
            specific_issues: vec!["Name unreadable".to_string()],
            ..VerdictDetails::default()
        },
        Verdict::Refer => VerdictDetails {
            referral_reason: "Abnormal chest findings".to_string(),
            specific_issues: vec!["Possible opacity".to_string()],
            doctor_name: Some("Dr. Cruz".to_string()),
            clinic_address: Some("City Health Office".to_string()),
        },
    }
}

/// Approved application as left behind by an earlier issuance cycle.
pub(super) fn approved_application(
    id: &str,
    approved_at: DateTime<Utc>,
    security_guard: bool,
) -> Application {
    let mut documents = BTreeMap::new();
    for document in StaticCatalog.required_documents(security_guard) {
        documents.insert(document, DocumentReviewStatus::Approved);
    }
    Application {
        id: ApplicationId(id.to_string()),
        user_id: applicant(),
        application_type: ApplicationType::New,
        status: ApplicationStatus::Approved,
        is_renewal: false,
        renewal_count: 0,
        previous_health_card_id: None,
        security_guard,
        personal: personal(),
        documents,
        payment: PaymentState::Validated,
        orientation: OrientationState::Attended,
        closure_document: None,
        created_at: approved_at - Duration::days(20),
        updated_at: approved_at,
        submitted_at: Some(approved_at - Duration::days(19)),
        approved_at: Some(approved_at),
        closed_at: None,
        closure_notified_at: None,
        deleted_at: None,
        revision: 4,
    }
}

pub(super) fn card(id: &str, application: &str, expiry_date: DateTime<Utc>) -> HealthCard {
    HealthCard {
        id: HealthCardId(id.to_string()),
        application_id: ApplicationId(application.to_string()),
        user_id: applicant(),
        issued_at: expiry_date - Duration::days(365),
        expiry_date,
    }
}

pub(super) fn legacy_row(
    id: &str,
    application: &ApplicationId,
    document: &str,
    attempt: u8,
    doctor: Option<&str>,
) -> LegacyReferralRow {
    LegacyReferralRow {
        id: ReferralId(id.to_string()),
        application_id: application.clone(),
        document_type_id: doc(document),
        attempt_number: attempt,
        referral_reason: "Migrated finding".to_string(),
        specific_issues: Vec::new(),
        doctor_name: doctor.map(str::to_string),
        clinic_address: doctor.map(|_| "District Clinic".to_string()),
        notification_sent: false,
        notification_sent_at: None,
        was_replaced: false,
        replaced_at: None,
        created_at: start() - Duration::days(1),
    }
}

pub(super) struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub(super) fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

pub(super) struct StaticCatalog;

impl DocumentCatalog for StaticCatalog {
    fn display_name(&self, document: &DocumentTypeId) -> Option<String> {
        let name = match document.0.as_str() {
            "valid_id" => "Valid ID",
            "chest_xray" => "Chest X-Ray",
            "urinalysis" => "Urinalysis",
            "drug_test" => "Drug Test",
            _ => return None,
        };
        Some(name.to_string())
    }

    fn required_documents(&self, security_guard: bool) -> Vec<DocumentTypeId> {
        let mut documents = vec![doc("valid_id"), doc("chest_xray"), doc("urinalysis")];
        if security_guard {
            documents.push(doc("drug_test"));
        }
        documents
    }
}

pub(super) struct StaticRoles;

impl RoleDirectory for StaticRoles {
    fn is_reviewer(&self, user: &UserId) -> bool {
        user.0 == REVIEWER
    }
}

#[derive(Default)]
pub(super) struct MemoryPublisher {
    sent: Mutex<Vec<NotificationPayload>>,
    offline: bool,
}

impl MemoryPublisher {
    pub(super) fn offline() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            offline: true,
        }
    }

    pub(super) fn sent(&self) -> Vec<NotificationPayload> {
        self.sent.lock().expect("publisher mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryPublisher {
    fn publish(&self, payload: &NotificationPayload) -> Result<(), NotificationError> {
        if self.offline {
            return Err(NotificationError::Transport("push gateway offline".to_string()));
        }
        self.sent
            .lock()
            .expect("publisher mutex poisoned")
            .push(payload.clone());
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl WorkflowRepository for UnavailableRepository {
    fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn applications_for_user(&self, _user: &UserId) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_card(&self, _id: &HealthCardId) -> Result<Option<HealthCard>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn latest_card_for_user(&self, _user: &UserId) -> Result<Option<HealthCard>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn legacy_referral_rows(
        &self,
        _application: &ApplicationId,
    ) -> Result<Vec<LegacyReferralRow>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn current_referrals(
        &self,
        _application: &ApplicationId,
    ) -> Result<Vec<ReferralRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit(&self, _changes: ChangeSet) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) type TestService = HealthCardWorkflowService<InMemoryWorkflowStore, MemoryPublisher>;

pub(super) fn collaborators(clock: Arc<FixedClock>) -> Collaborators {
    Collaborators {
        catalog: Arc::new(StaticCatalog),
        roles: Arc::new(StaticRoles),
        clock,
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) store: Arc<InMemoryWorkflowStore>,
    pub(super) publisher: Arc<MemoryPublisher>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn harness() -> Harness {
    harness_with(MemoryPublisher::default())
}

pub(super) fn harness_with(publisher: MemoryPublisher) -> Harness {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let publisher = Arc::new(publisher);
    let clock = Arc::new(FixedClock::new(start()));
    let service = Arc::new(HealthCardWorkflowService::new(
        store.clone(),
        publisher.clone(),
        collaborators(clock.clone()),
        &workflow_config(),
    ));
    Harness {
        service,
        store,
        publisher,
        clock,
    }
}

impl Harness {
    pub(super) fn fetch(&self, id: &ApplicationId) -> Application {
        self.store
            .fetch_application(id)
            .expect("store available")
            .expect("application stored")
    }

    pub(super) fn referrals(&self, id: &ApplicationId) -> MergedReferrals {
        self.store.merged_referrals(id).expect("store available")
    }

    /// Draft with every required document uploaded, handed in for review.
    pub(super) fn submitted_application(&self, security_guard: bool) -> ApplicationId {
        let draft = self
            .service
            .create_application(intake(security_guard))
            .expect("draft created");
        for document in draft.documents.keys() {
            self.service
                .submit_document(&draft.id, document, &applicant())
                .expect("document uploaded");
        }
        self.service
            .submit_application(&draft.id, &applicant())
            .expect("application submitted");
        draft.id
    }

    pub(super) fn verdict(
        &self,
        id: &ApplicationId,
        document: &str,
        verdict: Verdict,
    ) -> Result<VerdictOutcome, WorkflowError> {
        self.service
            .record_verdict(id, &doc(document), verdict, details(verdict), &reviewer())
    }

    pub(super) fn resubmit(&self, id: &ApplicationId, document: &str) -> Application {
        self.service
            .submit_document(id, &doc(document), &applicant())
            .expect("document resubmitted")
    }

    pub(super) fn approve_all(&self, id: &ApplicationId) {
        let documents: Vec<DocumentTypeId> = self.fetch(id).documents.into_keys().collect();
        for document in documents {
            self.verdict(id, &document.0, Verdict::Approve)
                .expect("document approved");
        }
    }

    /// Walk a fresh application through documents, payment and orientation.
    pub(super) fn under_review_application(&self) -> ApplicationId {
        let id = self.submitted_application(false);
        self.approve_all(&id);
        self.service
            .record_payment_submitted(&id, &applicant())
            .expect("payment submitted");
        self.service
            .record_payment_outcome(&id, PaymentOutcome::Validated)
            .expect("payment validated");
        self.service
            .schedule_orientation(&id, start() + Duration::days(2))
            .expect("orientation scheduled");
        self.service
            .record_attendance(&id, AttendanceOutcome::CheckedIn)
            .expect("checked in");
        self.service
            .record_attendance(&id, AttendanceOutcome::Attended)
            .expect("attended");
        id
    }

    pub(super) fn approved_with_card(&self) -> (ApplicationId, HealthCard) {
        let id = self.under_review_application();
        let outcome = self
            .service
            .finalize_application(&id, FinalDecision::Approved, &reviewer())
            .expect("application approved");
        (id, outcome.health_card.expect("card issued"))
    }

    pub(super) fn router(&self) -> axum::Router {
        health_card_router(self.service.clone())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
