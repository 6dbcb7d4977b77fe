use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for health card applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier for an applicant or staff account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Catalog key of a required document (e.g. `chest_xray`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentTypeId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HealthCardId(pub String);

macro_rules! display_id {
    ($($name:ident),+) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )+
    };
}

display_id!(ApplicationId, UserId, DocumentTypeId, HealthCardId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationType {
    New,
    Renew,
}

/// Position of an application in the issuance pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    ForDocumentVerification,
    DocumentsNeedRevision,
    ReferredForMedicalManagement,
    PendingPayment,
    ForPaymentValidation,
    ForOrientation,
    Scheduled,
    ForAttendanceValidation,
    UnderReview,
    Approved,
    Rejected,
    Cancelled,
    PermanentlyClosed,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::ForDocumentVerification => "For Document Verification",
            Self::DocumentsNeedRevision => "Documents Need Revision",
            Self::ReferredForMedicalManagement => "Referred for Medical Management",
            Self::PendingPayment => "Pending Payment",
            Self::ForPaymentValidation => "For Payment Validation",
            Self::ForOrientation => "For Orientation",
            Self::Scheduled => "Scheduled",
            Self::ForAttendanceValidation => "For Attendance Validation",
            Self::UnderReview => "Under Review",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
            Self::PermanentlyClosed => "Permanently Closed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Cancelled | Self::PermanentlyClosed
        )
    }

    /// Statuses in which staff review events (verdicts, payment, orientation) apply.
    pub const fn in_review(self) -> bool {
        !self.is_terminal() && !matches!(self, Self::Draft)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-document review state tracked on the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentReviewStatus {
    Missing,
    Pending,
    Approved,
    Rejected,
    Referred,
}

impl DocumentReviewStatus {
    /// A reviewer has ruled on the current upload.
    pub const fn has_verdict(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Referred)
    }

    pub const fn is_adverse(self) -> bool {
        matches!(self, Self::Rejected | Self::Referred)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Unpaid,
    Submitted,
    Validated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum OrientationState {
    NotScheduled,
    Scheduled { at: DateTime<Utc> },
    CheckedIn,
    Attended,
}

/// Applicant details printed on the card and carried into renewals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub sex: String,
    pub address: String,
    pub contact_number: String,
    pub occupation: String,
    #[serde(default)]
    pub establishment: Option<String>,
}

impl PersonalDetails {
    /// Copy of these details with any supplied renewal changes applied.
    pub fn with_changes(&self, changes: &RenewalFields) -> Self {
        let mut updated = self.clone();
        if let Some(address) = &changes.address {
            updated.address = address.trim().to_string();
        }
        if let Some(contact) = &changes.contact_number {
            updated.contact_number = contact.trim().to_string();
        }
        if let Some(occupation) = &changes.occupation {
            updated.occupation = occupation.trim().to_string();
        }
        if let Some(establishment) = &changes.establishment {
            let trimmed = establishment.trim();
            updated.establishment = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        updated
    }
}

/// Fields an applicant may change when renewing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalFields {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub establishment: Option<String>,
}

/// One applicant submission and everything the pipeline knows about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub application_type: ApplicationType,
    pub status: ApplicationStatus,
    pub is_renewal: bool,
    pub renewal_count: u32,
    pub previous_health_card_id: Option<HealthCardId>,
    pub security_guard: bool,
    pub personal: PersonalDetails,
    pub documents: BTreeMap<DocumentTypeId, DocumentReviewStatus>,
    pub payment: PaymentState,
    pub orientation: OrientationState,
    /// Document whose exhausted attempts closed the application.
    pub closure_document: Option<DocumentTypeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closure_notified_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every committed write.
    pub revision: u64,
}

impl Application {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }

    pub fn document_status(&self, document: &DocumentTypeId) -> Option<DocumentReviewStatus> {
        self.documents.get(document).copied()
    }

    /// Documents still waiting on an upload or a verdict.
    pub fn unreviewed_documents(&self) -> Vec<&DocumentTypeId> {
        self.documents
            .iter()
            .filter(|(_, status)| !status.has_verdict())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn adverse_documents(&self) -> Vec<&DocumentTypeId> {
        self.documents
            .iter()
            .filter(|(_, status)| status.is_adverse())
            .map(|(id, _)| id)
            .collect()
    }
}

/// Issued card. Existence implies the linked application reached `Approved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCard {
    pub id: HealthCardId,
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}
