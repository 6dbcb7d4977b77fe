//! Append-only ledger of per-document referral verdicts.
//!
//! Referrals live in two physical tables while the legacy storage is migrated. Everything above
//! the repository reads them through [`MergedReferrals`], which applies the current-table
//! preference once per request.

mod domain;
mod ledger;
mod legacy;

pub use domain::{IssueType, ReferralId, ReferralKey, ReferralRecord, ReferralTable, MAX_ATTEMPTS};
pub use ledger::{AttemptState, LogicalReferral, MergedReferrals, SourcedReferral};
pub use legacy::LegacyReferralRow;
