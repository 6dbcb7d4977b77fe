use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{ApplicationId, DocumentTypeId, HealthCardId, RenewalFields, UserId};
use super::repository::{NotificationPublisher, WorkflowRepository};
use super::review::{FinalDecision, Verdict, VerdictDetails};
use super::service::{
    AttendanceOutcome, HealthCardWorkflowService, NewApplication, PaymentOutcome, WorkflowError,
};

type SharedService<R, P> = Arc<HealthCardWorkflowService<R, P>>;

/// Caller identity for applicant-initiated actions.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenewalRequest {
    pub previous_health_card_id: HealthCardId,
    #[serde(flatten)]
    pub fields: RenewalFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerdictRequest {
    pub reviewer_id: UserId,
    pub verdict: Verdict,
    #[serde(flatten)]
    pub details: VerdictDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeRequest {
    pub reviewer_id: UserId,
    pub decision: FinalDecision,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentOutcomeRequest {
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrientationRequest {
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceRequest {
    pub outcome: AttendanceOutcome,
}

/// Router builder exposing the application lifecycle, review and renewal endpoints.
pub fn health_card_router<R, P>(service: SharedService<R, P>) -> Router
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/users/:user_id/renewal-eligibility",
            get(eligibility_handler::<R, P>),
        )
        .route(
            "/api/v1/users/:user_id/renewals",
            post(renewal_handler::<R, P>),
        )
        .route(
            "/api/v1/users/:user_id/applications",
            get(list_handler::<R, P>),
        )
        .route("/api/v1/applications", post(create_handler::<R, P>))
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<R, P>).delete(delete_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id/submit",
            post(submit_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id/cancel",
            post(cancel_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id/payment",
            post(payment_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id/payment/outcome",
            post(payment_outcome_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id/orientation",
            post(orientation_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id/attendance",
            post(attendance_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id/finalize",
            post(finalize_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id/notifications",
            post(notifications_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id/documents/:document_type_id",
            post(document_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id/documents/:document_type_id/verdict",
            post(verdict_handler::<R, P>),
        )
        .with_state(service)
}

/// HTTP status for each workflow failure.
pub fn workflow_status(error: &WorkflowError) -> StatusCode {
    match error {
        WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
        WorkflowError::PreconditionFailed(_) => StatusCode::CONFLICT,
        WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Storage(_) | WorkflowError::Notification(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn error_response(error: WorkflowError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (workflow_status(&error), Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, WorkflowError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn eligibility_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.get_renewal_eligibility(&UserId(user_id)),
    )
}

pub(crate) async fn renewal_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(user_id): Path<String>,
    Json(request): Json<RenewalRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::CREATED,
        service.create_renewal_application(
            &UserId(user_id),
            &request.previous_health_card_id,
            request.fields,
        ),
    )
}

pub(crate) async fn list_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(StatusCode::OK, service.list_applications(&UserId(user_id)))
}

pub(crate) async fn create_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Json(intake): Json<NewApplication>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(StatusCode::CREATED, service.create_application(intake))
}

pub(crate) async fn status_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.get_application(&ApplicationId(application_id)),
    )
}

pub(crate) async fn delete_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(actor): Json<ActorRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    match service.soft_delete_application(&ApplicationId(application_id), &actor.user_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(actor): Json<ActorRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.submit_application(&ApplicationId(application_id), &actor.user_id),
    )
}

pub(crate) async fn cancel_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(actor): Json<ActorRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.cancel_application(&ApplicationId(application_id), &actor.user_id),
    )
}

pub(crate) async fn payment_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(actor): Json<ActorRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.record_payment_submitted(&ApplicationId(application_id), &actor.user_id),
    )
}

pub(crate) async fn payment_outcome_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(request): Json<PaymentOutcomeRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.record_payment_outcome(&ApplicationId(application_id), request.outcome),
    )
}

pub(crate) async fn orientation_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(request): Json<OrientationRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.schedule_orientation(&ApplicationId(application_id), request.at),
    )
}

pub(crate) async fn attendance_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(request): Json<AttendanceRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.record_attendance(&ApplicationId(application_id), request.outcome),
    )
}

pub(crate) async fn finalize_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(request): Json<FinalizeRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.finalize_application(
            &ApplicationId(application_id),
            request.decision,
            &request.reviewer_id,
        ),
    )
}

pub(crate) async fn notifications_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.dispatch_notifications(&ApplicationId(application_id)),
    )
}

pub(crate) async fn document_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((application_id, document_type_id)): Path<(String, String)>,
    Json(actor): Json<ActorRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.submit_document(
            &ApplicationId(application_id),
            &DocumentTypeId(document_type_id),
            &actor.user_id,
        ),
    )
}

pub(crate) async fn verdict_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((application_id, document_type_id)): Path<(String, String)>,
    Json(request): Json<VerdictRequest>,
) -> Response
where
    R: WorkflowRepository + 'static,
    P: NotificationPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.record_verdict(
            &ApplicationId(application_id),
            &DocumentTypeId(document_type_id),
            request.verdict,
            request.details,
            &request.reviewer_id,
        ),
    )
}
