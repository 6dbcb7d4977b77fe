use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{ApplicationId, DocumentTypeId, UserId};

/// Review cycles allowed per document before the application is closed.
pub const MAX_ATTEMPTS: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferralId(pub String);

impl fmt::Display for ReferralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Follow-up the applicant owes for a flagged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MedicalReferral,
    DocumentIssue,
}

impl IssueType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MedicalReferral => "medical_referral",
            Self::DocumentIssue => "document_issue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralTable {
    Legacy,
    Current,
}

/// Physical address of a ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferralKey {
    pub table: ReferralTable,
    pub id: ReferralId,
}

/// One ledger entry: a single adverse verdict on one document attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralRecord {
    pub id: ReferralId,
    pub application_id: ApplicationId,
    pub document_type_id: DocumentTypeId,
    pub issue_type: IssueType,
    pub attempt_number: u8,
    pub referral_reason: String,
    pub specific_issues: Vec<String>,
    pub doctor_name: Option<String>,
    pub clinic_address: Option<String>,
    pub reviewer_id: Option<UserId>,
    pub notification_sent: bool,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub was_replaced: bool,
    pub replaced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ReferralRecord {
    pub fn is_unresolved(&self) -> bool {
        !self.was_replaced
    }

    pub fn mark_notified(&mut self, at: DateTime<Utc>) {
        if !self.notification_sent {
            self.notification_sent = true;
            self.notification_sent_at = Some(at);
        }
    }

    pub fn mark_replaced(&mut self, at: DateTime<Utc>) {
        if !self.was_replaced {
            self.was_replaced = true;
            self.replaced_at = Some(at);
        }
    }
}
