use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{ApplicationId, DocumentTypeId};
use super::domain::{IssueType, ReferralId, ReferralRecord};

/// Row shape of the pre-migration referral table, which has no issue type column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyReferralRow {
    pub id: ReferralId,
    pub application_id: ApplicationId,
    pub document_type_id: DocumentTypeId,
    pub attempt_number: u8,
    pub referral_reason: String,
    #[serde(default)]
    pub specific_issues: Vec<String>,
    pub doctor_name: Option<String>,
    pub clinic_address: Option<String>,
    pub notification_sent: bool,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub was_replaced: bool,
    pub replaced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LegacyReferralRow {
    /// Legacy rows only recorded a doctor for medical referrals.
    pub fn inferred_issue_type(&self) -> IssueType {
        match self.doctor_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => IssueType::MedicalReferral,
            _ => IssueType::DocumentIssue,
        }
    }
}

impl From<LegacyReferralRow> for ReferralRecord {
    fn from(row: LegacyReferralRow) -> Self {
        let issue_type = row.inferred_issue_type();
        ReferralRecord {
            id: row.id,
            application_id: row.application_id,
            document_type_id: row.document_type_id,
            issue_type,
            attempt_number: row.attempt_number,
            referral_reason: row.referral_reason,
            specific_issues: row.specific_issues,
            doctor_name: row.doctor_name,
            clinic_address: row.clinic_address,
            reviewer_id: None,
            notification_sent: row.notification_sent,
            notification_sent_at: row.notification_sent_at,
            was_replaced: row.was_replaced,
            replaced_at: row.replaced_at,
            created_at: row.created_at,
        }
    }
}
