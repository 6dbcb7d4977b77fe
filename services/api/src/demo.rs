use crate::infra::{ConfiguredRoles, RecordingNotificationPublisher, StaticDocumentCatalog};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use health_card::config::WorkflowConfig;
use health_card::error::AppError;
use health_card::workflows::health_card::{
    Application, AttendanceOutcome, Clock, Collaborators, DocumentTypeId, FinalDecision,
    HealthCardId, HealthCardWorkflowService, InMemoryWorkflowStore, NewApplication,
    NotificationPayload, PaymentOutcome, PersonalDetails, RenewalFields, UserId, Verdict,
    VerdictDetails,
};
use std::sync::{Arc, Mutex};

type DemoService =
    HealthCardWorkflowService<InMemoryWorkflowStore, RecordingNotificationPublisher>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Register the demo applicants as security guards (extra required documents).
    #[arg(long)]
    pub(crate) security_guard: bool,
    /// Skip the three-strike referral closure portion of the demo.
    #[arg(long)]
    pub(crate) skip_closure: bool,
    /// Skip the renewal portion of the demo.
    #[arg(long)]
    pub(crate) skip_renewal: bool,
}

/// Clock the demo moves forward by hand to reach the renewal window.
#[derive(Debug)]
struct DemoClock {
    now: Mutex<DateTime<Utc>>,
}

impl DemoClock {
    fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    fn set(&self, at: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = at,
            Err(poisoned) => *poisoned.into_inner() = at,
        }
    }
}

impl Clock for DemoClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

struct DemoContext {
    service: Arc<DemoService>,
    outbox: Arc<RecordingNotificationPublisher>,
    clock: Arc<DemoClock>,
    reviewer: UserId,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        security_guard,
        skip_closure,
        skip_renewal,
    } = args;

    let config = WorkflowConfig::default();
    let reviewer = UserId(
        config
            .reviewer_ids
            .first()
            .cloned()
            .unwrap_or_else(|| "staff-001".to_string()),
    );
    let clock = Arc::new(DemoClock::new(Utc::now()));
    let outbox = Arc::new(RecordingNotificationPublisher::default());
    let service = Arc::new(HealthCardWorkflowService::new(
        Arc::new(InMemoryWorkflowStore::new()),
        outbox.clone(),
        Collaborators {
            catalog: Arc::new(StaticDocumentCatalog),
            roles: Arc::new(ConfiguredRoles::new(&[reviewer.0.clone()])),
            clock: clock.clone(),
        },
        &config,
    ));
    let context = DemoContext {
        service,
        outbox,
        clock,
        reviewer,
    };

    println!("Health card review demo");
    println!(
        "Renewal window {} days | card validity {} days | reviewer {}",
        config.renewal_window_days, config.card_validity_days, context.reviewer.0
    );

    let holder = UserId("demo-applicant-1".to_string());
    let card_id = demo_issuance(&context, &holder, security_guard)?;

    if !skip_closure {
        demo_closure(&context, security_guard)?;
    }

    if !skip_renewal {
        demo_renewal(&context, &holder, card_id.as_ref(), &config)?;
    }

    Ok(())
}

fn demo_issuance(
    context: &DemoContext,
    holder: &UserId,
    security_guard: bool,
) -> Result<Option<HealthCardId>, AppError> {
    let service = &context.service;
    println!("\nIssuance walkthrough");

    let draft = submitted_application(service, holder, "Maria Santos", security_guard)?;
    print_status("Submitted", &draft);

    let chest_xray = DocumentTypeId("chest_xray".to_string());
    let outcome = service.record_verdict(
        &draft.id,
        &chest_xray,
        Verdict::Refer,
        VerdictDetails {
            referral_reason: "Findings need clearance from a physician".to_string(),
            specific_issues: vec!["Possible opacity, upper right lobe".to_string()],
            doctor_name: Some("Dr. Reyes".to_string()),
            clinic_address: Some("City Health Office, Room 4".to_string()),
        },
        &context.reviewer,
    )?;
    println!(
        "- Chest X-Ray referred (attempt {}) -> {}",
        outcome.attempt_number.unwrap_or_default(),
        outcome.new_status
    );
    service.dispatch_notifications(&draft.id)?;
    print_notifications(&context.outbox.drain());

    service.submit_document(&draft.id, &chest_xray, holder)?;
    println!("- Medical clearance uploaded");

    let documents: Vec<DocumentTypeId> = service
        .get_application(&draft.id)?
        .application
        .documents
        .keys()
        .cloned()
        .collect();
    for document in &documents {
        service.record_verdict(
            &draft.id,
            document,
            Verdict::Approve,
            VerdictDetails::default(),
            &context.reviewer,
        )?;
    }
    let cleared = service.get_application(&draft.id)?;
    print_status("Documents cleared", &cleared.application);

    service.record_payment_submitted(&draft.id, holder)?;
    let paid = service.record_payment_outcome(&draft.id, PaymentOutcome::Validated)?;
    print_status("Payment validated", &paid);

    let session = context.clock.now() + Duration::days(2);
    service.schedule_orientation(&draft.id, session)?;
    context.clock.set(session);
    service.record_attendance(&draft.id, AttendanceOutcome::CheckedIn)?;
    let attended = service.record_attendance(&draft.id, AttendanceOutcome::Attended)?;
    print_status("Orientation attended", &attended);

    let finalized =
        service.finalize_application(&draft.id, FinalDecision::Approved, &context.reviewer)?;
    match &finalized.health_card {
        Some(card) => println!(
            "- {} -> card {} valid until {}",
            finalized.status,
            card.id.0,
            card.expiry_date.date_naive()
        ),
        None => println!("- {} (no card issued)", finalized.status),
    }

    Ok(finalized.health_card.map(|card| card.id))
}

fn demo_closure(context: &DemoContext, security_guard: bool) -> Result<(), AppError> {
    let service = &context.service;
    let applicant = UserId("demo-applicant-2".to_string());
    println!("\nReferral escalation walkthrough");

    let draft = submitted_application(service, &applicant, "Jose Garcia", security_guard)?;
    let stool_exam = DocumentTypeId("stool_exam".to_string());

    loop {
        let outcome = service.record_verdict(
            &draft.id,
            &stool_exam,
            Verdict::Reject,
            VerdictDetails {
                referral_reason: "Specimen container is unlabeled".to_string(),
                specific_issues: vec!["Missing collection date".to_string()],
                ..VerdictDetails::default()
            },
            &context.reviewer,
        )?;
        let sent = service.dispatch_notifications(&draft.id)?;
        println!(
            "- Stool Examination rejected (attempt {}) -> {}",
            outcome.attempt_number.unwrap_or_default(),
            outcome.new_status
        );
        print_notifications(&sent);
        context.outbox.drain();

        if outcome.permanently_closed {
            break;
        }
        service.submit_document(&draft.id, &stool_exam, &applicant)?;
    }

    let view = service.get_application(&draft.id)?;
    for line in view.documents.iter().filter(|line| line.attempts > 0) {
        println!(
            "  {}: {} of {} attempts used",
            line.display_name, line.attempts, line.max_attempts
        );
    }

    Ok(())
}

fn demo_renewal(
    context: &DemoContext,
    holder: &UserId,
    card_id: Option<&HealthCardId>,
    config: &WorkflowConfig,
) -> Result<(), AppError> {
    let service = &context.service;
    println!("\nRenewal walkthrough");

    let Some(card_id) = card_id else {
        println!("- No card on file; renewal skipped");
        return Ok(());
    };

    let early = service.get_renewal_eligibility(holder)?;
    println!("- Today: {} ({:?})", early.reason, early.code);

    let due = context.clock.now()
        + Duration::days(config.card_validity_days - config.renewal_window_days + 10);
    context.clock.set(due);
    let eligibility = service.get_renewal_eligibility(holder)?;
    println!(
        "- On {}: {} ({:?})",
        due.date_naive(),
        eligibility.reason,
        eligibility.code
    );
    if !eligibility.is_eligible {
        return Ok(());
    }

    let renewal = service.create_renewal_application(
        holder,
        card_id,
        RenewalFields {
            contact_number: Some("09175550123".to_string()),
            ..RenewalFields::default()
        },
    )?;
    println!(
        "- Renewal {} drafted (renewal #{}, {} documents to upload)",
        renewal.id.0,
        renewal.renewal_count,
        renewal.documents.len()
    );

    let blocked = service.get_renewal_eligibility(holder)?;
    println!("- Second renewal: {} ({:?})", blocked.reason, blocked.code);
    Ok(())
}

fn submitted_application(
    service: &DemoService,
    applicant: &UserId,
    full_name: &str,
    security_guard: bool,
) -> Result<Application, AppError> {
    let draft = service.create_application(NewApplication {
        user_id: applicant.clone(),
        personal: demo_personal_details(full_name, security_guard),
        security_guard,
    })?;
    let documents: Vec<DocumentTypeId> = draft.documents.keys().cloned().collect();
    for document in &documents {
        service.submit_document(&draft.id, document, applicant)?;
    }
    Ok(service.submit_application(&draft.id, applicant)?)
}

fn demo_personal_details(full_name: &str, security_guard: bool) -> PersonalDetails {
    PersonalDetails {
        full_name: full_name.to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 3, 14).unwrap_or_default(),
        sex: "F".to_string(),
        address: "12 Rizal St, Poblacion".to_string(),
        contact_number: "09171234567".to_string(),
        occupation: if security_guard {
            "Security guard".to_string()
        } else {
            "Food handler".to_string()
        },
        establishment: Some("Bakeshop Dos".to_string()),
    }
}

fn print_status(step: &str, application: &Application) {
    println!("- {}: {} -> {}", step, application.id.0, application.status);
}

fn print_notifications(sent: &[NotificationPayload]) {
    if sent.is_empty() {
        println!("  Notifications: none dispatched");
        return;
    }
    for payload in sent {
        println!("  Notification: {} -> {}", payload.title, payload.action_url);
    }
}
