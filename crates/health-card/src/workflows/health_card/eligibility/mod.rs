mod config;
mod rules;

pub use config::RenewalPolicy;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Application, HealthCard};

/// Rule that decided an eligibility check, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityCode {
    NoApplicationHistory,
    ApplicationInProgress,
    RenewalInProgress,
    NoApprovedApplication,
    MissingHealthCard,
    NotYetDue,
    Eligible,
}

impl EligibilityCode {
    /// User-facing explanation. `days_until_expiry` is only read for `NotYetDue`.
    pub fn reason(self, days_until_expiry: i64, policy: &RenewalPolicy) -> String {
        match self {
            Self::NoApplicationHistory => {
                "No previous health card application found. Please apply for a new health card."
                    .to_string()
            }
            Self::ApplicationInProgress => {
                "You have an application in progress. Please complete or cancel it before renewing."
                    .to_string()
            }
            Self::RenewalInProgress => {
                "A renewal application is already in progress for this account.".to_string()
            }
            Self::NoApprovedApplication => {
                "No approved health card application found. Please apply for a new health card."
                    .to_string()
            }
            Self::MissingHealthCard => {
                "Your approved application has no issued health card on record. Please contact support."
                    .to_string()
            }
            Self::NotYetDue => format!(
                "Your health card is still valid for {days_until_expiry} days. Renewal opens {} days before expiry.",
                policy.window_days
            ),
            Self::Eligible => "Your health card is eligible for renewal.".to_string(),
        }
    }
}

/// Outcome of the renewal gate, shared by the read path and the renewal write guard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityResult {
    pub is_eligible: bool,
    pub code: EligibilityCode,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_expiry: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible_application: Option<Application>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible_card: Option<HealthCard>,
}

/// Stateless rule chain deciding whether a user may renew.
#[derive(Debug, Clone, Default)]
pub struct RenewalEligibilityEvaluator {
    policy: RenewalPolicy,
}

impl RenewalEligibilityEvaluator {
    pub fn new(policy: RenewalPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RenewalPolicy {
        &self.policy
    }

    /// Apply the rules in order, stopping at the first that fails.
    pub fn evaluate(
        &self,
        applications: &[Application],
        card: Option<&HealthCard>,
        now: DateTime<Utc>,
    ) -> EligibilityResult {
        let active: Vec<&Application> = applications
            .iter()
            .filter(|application| application.is_active())
            .collect();

        if active.is_empty() {
            return self.ineligible(EligibilityCode::NoApplicationHistory);
        }
        if rules::has_in_progress(&active) {
            return self.ineligible(EligibilityCode::ApplicationInProgress);
        }
        if rules::has_open_renewal(&active) {
            return self.ineligible(EligibilityCode::RenewalInProgress);
        }

        let Some(approved) = rules::latest_approved(&active) else {
            return self.ineligible(EligibilityCode::NoApprovedApplication);
        };
        let Some(card) = rules::card_for(approved, card) else {
            return self.ineligible(EligibilityCode::MissingHealthCard);
        };

        let days_until_expiry = rules::days_until_expiry(card.expiry_date, now);
        if days_until_expiry > self.policy.window_days {
            let code = EligibilityCode::NotYetDue;
            return EligibilityResult {
                is_eligible: false,
                reason: code.reason(days_until_expiry, &self.policy),
                code,
                days_until_expiry: Some(days_until_expiry),
                eligible_application: None,
                eligible_card: None,
            };
        }

        EligibilityResult {
            is_eligible: true,
            code: EligibilityCode::Eligible,
            reason: EligibilityCode::Eligible.reason(days_until_expiry, &self.policy),
            days_until_expiry: Some(days_until_expiry),
            eligible_application: Some(approved.clone()),
            eligible_card: Some(card.clone()),
        }
    }

    fn ineligible(&self, code: EligibilityCode) -> EligibilityResult {
        EligibilityResult {
            is_eligible: false,
            reason: code.reason(0, &self.policy),
            code,
            days_until_expiry: None,
            eligible_application: None,
            eligible_card: None,
        }
    }
}
