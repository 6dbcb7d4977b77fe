use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{Application, ApplicationId, HealthCard, HealthCardId, UserId};
use super::referrals::{
    LegacyReferralRow, MergedReferrals, ReferralKey, ReferralRecord, ReferralTable,
};
use super::repository::{ChangeSet, RepositoryError, WorkflowRepository};

/// Mutex-guarded store used by the demo server and the test suites.
///
/// `commit` validates every condition of a change set before applying any of it, all under one
/// lock, so a rejected change set leaves no trace.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWorkflowStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    applications: BTreeMap<ApplicationId, Application>,
    cards: BTreeMap<HealthCardId, HealthCard>,
    legacy: Vec<LegacyReferralRow>,
    current: Vec<ReferralRecord>,
}

#[derive(Clone, Copy)]
enum RowMark {
    Replaced,
    Notified,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("workflow store mutex poisoned".to_string()))
    }

    /// Insert or overwrite an application as-is, bypassing revision checks.
    pub fn seed_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state
            .applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    pub fn seed_card(&self, card: HealthCard) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state.cards.insert(card.id.clone(), card);
        Ok(())
    }

    /// Rows written before the ledger migration.
    pub fn seed_legacy_referral(&self, row: LegacyReferralRow) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state.legacy.push(row);
        Ok(())
    }

    pub fn seed_current_referral(&self, record: ReferralRecord) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state.current.push(record);
        Ok(())
    }
}

impl StoreState {
    fn merged(&self, application: &ApplicationId) -> MergedReferrals {
        let legacy = self
            .legacy
            .iter()
            .filter(|row| &row.application_id == application)
            .cloned()
            .map(ReferralRecord::from)
            .collect();
        let current = self
            .current
            .iter()
            .filter(|record| &record.application_id == application)
            .cloned()
            .collect();
        MergedReferrals::merge(application.clone(), legacy, current)
    }

    fn contains(&self, key: &ReferralKey) -> bool {
        match key.table {
            ReferralTable::Legacy => self.legacy.iter().any(|row| row.id == key.id),
            ReferralTable::Current => self.current.iter().any(|record| record.id == key.id),
        }
    }

    fn validate(&self, changes: &ChangeSet) -> Result<(), RepositoryError> {
        if let Some(write) = &changes.application {
            let id = &write.record.id;
            match (self.applications.get(id), write.expected_revision) {
                (Some(_), None) => {
                    return Err(RepositoryError::Conflict(format!(
                        "application {id} already exists"
                    )))
                }
                (None, Some(_)) => {
                    return Err(RepositoryError::NotFound(format!("application {id}")))
                }
                (Some(existing), Some(expected)) if existing.revision != expected => {
                    return Err(RepositoryError::Conflict(format!(
                        "application {id} is at revision {}, expected {expected}",
                        existing.revision
                    )))
                }
                _ => {}
            }
        }

        if let Some(append) = &changes.referral {
            let record = &append.record;
            let document = &record.document_type_id;
            if self.current.iter().any(|existing| existing.id == record.id) {
                return Err(RepositoryError::Conflict(format!(
                    "referral {} already exists",
                    record.id
                )));
            }

            let merged = self.merged(&record.application_id);
            let attempts = merged.attempt_state(document);
            if attempts.count != append.expected_attempts {
                return Err(RepositoryError::Conflict(format!(
                    "document {document} has {} attempts, expected {}",
                    attempts.count, append.expected_attempts
                )));
            }
            if let Some(open) = merged.unresolved(document) {
                let resolved_here = open.keys.iter().all(|key| changes.replaced.contains(key));
                if !resolved_here {
                    return Err(RepositoryError::Conflict(format!(
                        "document {document} already has an unresolved referral"
                    )));
                }
            }
        }

        for key in changes.replaced.iter().chain(changes.notified.iter()) {
            if !self.contains(key) {
                return Err(RepositoryError::NotFound(format!(
                    "referral {} in {:?} table",
                    key.id, key.table
                )));
            }
        }

        if let Some(card) = &changes.card {
            if self.cards.contains_key(&card.id) {
                return Err(RepositoryError::Conflict(format!(
                    "health card {} already exists",
                    card.id
                )));
            }
        }

        Ok(())
    }

    fn apply(&mut self, changes: ChangeSet) {
        let at = changes.at;

        if let Some(write) = changes.application {
            let mut record = write.record;
            if let Some(expected) = write.expected_revision {
                record.revision = expected + 1;
            }
            self.applications.insert(record.id.clone(), record);
        }
        if let Some(append) = changes.referral {
            self.current.push(append.record);
        }
        for key in &changes.replaced {
            self.mark(key, RowMark::Replaced, at);
        }
        for key in &changes.notified {
            self.mark(key, RowMark::Notified, at);
        }
        if let Some(card) = changes.card {
            self.cards.insert(card.id.clone(), card);
        }
    }

    fn mark(&mut self, key: &ReferralKey, mark: RowMark, at: DateTime<Utc>) {
        match key.table {
            ReferralTable::Legacy => {
                for row in self.legacy.iter_mut().filter(|row| row.id == key.id) {
                    match mark {
                        RowMark::Replaced if !row.was_replaced => {
                            row.was_replaced = true;
                            row.replaced_at = Some(at);
                        }
                        RowMark::Notified if !row.notification_sent => {
                            row.notification_sent = true;
                            row.notification_sent_at = Some(at);
                        }
                        _ => {}
                    }
                }
            }
            ReferralTable::Current => {
                for record in self.current.iter_mut().filter(|record| record.id == key.id) {
                    match mark {
                        RowMark::Replaced => record.mark_replaced(at),
                        RowMark::Notified => record.mark_notified(at),
                    }
                }
            }
        }
    }
}

impl WorkflowRepository for InMemoryWorkflowStore {
    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.applications.get(id).cloned())
    }

    fn applications_for_user(&self, user: &UserId) -> Result<Vec<Application>, RepositoryError> {
        let state = self.lock()?;
        let mut applications: Vec<Application> = state
            .applications
            .values()
            .filter(|application| application.is_owned_by(user))
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(applications)
    }

    fn fetch_card(&self, id: &HealthCardId) -> Result<Option<HealthCard>, RepositoryError> {
        Ok(self.lock()?.cards.get(id).cloned())
    }

    fn latest_card_for_user(&self, user: &UserId) -> Result<Option<HealthCard>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .cards
            .values()
            .filter(|card| &card.user_id == user)
            .max_by_key(|card| card.issued_at)
            .cloned())
    }

    fn legacy_referral_rows(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<LegacyReferralRow>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .legacy
            .iter()
            .filter(|row| &row.application_id == application)
            .cloned()
            .collect())
    }

    fn current_referrals(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<ReferralRecord>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .current
            .iter()
            .filter(|record| &record.application_id == application)
            .cloned()
            .collect())
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state.validate(&changes)?;
        state.apply(changes);
        Ok(())
    }
}
