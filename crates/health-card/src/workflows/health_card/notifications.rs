use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, DocumentTypeId, UserId};
use super::referrals::{IssueType, LogicalReferral, ReferralId, MAX_ATTEMPTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MedicalReferral,
    DocumentIssue,
    PermanentClosure,
}

impl From<IssueType> for NotificationKind {
    fn from(issue: IssueType) -> Self {
        match issue {
            IssueType::MedicalReferral => Self::MedicalReferral,
            IssueType::DocumentIssue => Self::DocumentIssue,
        }
    }
}

/// Applicant-facing message handed to the notification transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type_id: Option<DocumentTypeId>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub action_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_id: Option<ReferralId>,
}

/// Renders referral and closure notices. Pure; marking rows notified is the service's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationComposer;

impl NotificationComposer {
    pub fn compose_referral(
        &self,
        application: &Application,
        referral: &LogicalReferral,
        document_name: &str,
    ) -> NotificationPayload {
        let record = &referral.record;
        let attempt = record.attempt_number;
        let final_attempt = attempt >= MAX_ATTEMPTS;

        let base_title = match record.issue_type {
            IssueType::MedicalReferral => "Medical Referral Required",
            IssueType::DocumentIssue => "Document Revision Required",
        };
        let title = if final_attempt {
            format!("Final Attempt: {base_title}")
        } else {
            base_title.to_string()
        };

        let mut body = match record.issue_type {
            IssueType::MedicalReferral => {
                let doctor = record.doctor_name.as_deref().unwrap_or("the assigned doctor");
                let clinic = record
                    .clinic_address
                    .as_deref()
                    .unwrap_or("the designated clinic");
                format!(
                    "Your {document_name} requires medical evaluation. Reason: {}. Please consult {doctor} at {clinic} and upload the clearance.",
                    record.referral_reason
                )
            }
            IssueType::DocumentIssue => format!(
                "Your {document_name} needs to be revised. Reason: {}. Please upload a corrected copy.",
                record.referral_reason
            ),
        };

        if !record.specific_issues.is_empty() {
            body.push_str(&format!(
                " Issues noted: {}.",
                record.specific_issues.join("; ")
            ));
        }

        if final_attempt {
            body.push_str(&format!(
                " FINAL ATTEMPT: this is attempt {attempt} of {MAX_ATTEMPTS}. If this document is flagged again, your application will be permanently closed and you will need to submit a new application."
            ));
        } else if attempt == 2 {
            body.push_str(&format!(
                " Warning: this is attempt 2 of {MAX_ATTEMPTS}. Please review the requirements carefully before resubmitting."
            ));
        }

        let action_url = match record.issue_type {
            IssueType::MedicalReferral => format!(
                "/applications/{}/medical-referral/{}",
                application.id, record.document_type_id
            ),
            IssueType::DocumentIssue => format!(
                "/applications/{}/documents/{}/resubmit",
                application.id, record.document_type_id
            ),
        };

        NotificationPayload {
            application_id: application.id.clone(),
            user_id: application.user_id.clone(),
            document_type_id: Some(record.document_type_id.clone()),
            kind: record.issue_type.into(),
            title,
            body,
            action_url,
            attempt_number: Some(attempt),
            referral_id: Some(record.id.clone()),
        }
    }

    /// Notice for an application closed after a document exhausted its attempts.
    pub fn compose_closure(
        &self,
        application: &Application,
        document_name: Option<&str>,
    ) -> NotificationPayload {
        let cause = match document_name {
            Some(name) => format!(
                "Your {name} used all {MAX_ATTEMPTS} review attempts and was not accepted."
            ),
            None => format!(
                "A required document used all {MAX_ATTEMPTS} review attempts and was not accepted."
            ),
        };

        NotificationPayload {
            application_id: application.id.clone(),
            user_id: application.user_id.clone(),
            document_type_id: application.closure_document.clone(),
            kind: NotificationKind::PermanentClosure,
            title: "Application Permanently Closed".to_string(),
            body: format!(
                "{cause} Your health card application has been permanently closed. Please submit a new application to continue."
            ),
            action_url: "/applications/new".to_string(),
            attempt_number: None,
            referral_id: None,
        }
    }
}
