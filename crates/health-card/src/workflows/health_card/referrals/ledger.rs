use std::collections::BTreeSet;

use serde::Serialize;

use super::super::domain::{ApplicationId, DocumentTypeId};
use super::domain::{ReferralKey, ReferralRecord, ReferralTable, MAX_ATTEMPTS};

/// Ledger row tagged with the table it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcedReferral {
    pub table: ReferralTable,
    pub record: ReferralRecord,
}

impl SourcedReferral {
    pub fn key(&self) -> ReferralKey {
        ReferralKey {
            table: self.table,
            id: self.record.id.clone(),
        }
    }
}

/// Attempt count for one document, computed once per request from the merged ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptState {
    pub document_type_id: DocumentTypeId,
    pub count: u8,
    /// Table the count came from; `None` when the document has no referrals.
    pub source_table: Option<ReferralTable>,
}

impl AttemptState {
    pub fn is_exhausted(&self) -> bool {
        self.count >= MAX_ATTEMPTS
    }

    pub fn next_attempt(&self) -> Option<u8> {
        (!self.is_exhausted()).then(|| self.count + 1)
    }
}

/// The authoritative referral for a document plus every physical row that mirrors it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalReferral {
    pub record: ReferralRecord,
    pub source_table: ReferralTable,
    /// Rows in either table that must be updated together with `record`.
    pub keys: Vec<ReferralKey>,
}

/// Both referral tables for one application, merged with current-table preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedReferrals {
    application_id: ApplicationId,
    rows: Vec<SourcedReferral>,
}

impl MergedReferrals {
    pub fn merge(
        application_id: ApplicationId,
        legacy: Vec<ReferralRecord>,
        current: Vec<ReferralRecord>,
    ) -> Self {
        let mut rows: Vec<SourcedReferral> = legacy
            .into_iter()
            .map(|record| SourcedReferral {
                table: ReferralTable::Legacy,
                record,
            })
            .chain(current.into_iter().map(|record| SourcedReferral {
                table: ReferralTable::Current,
                record,
            }))
            .filter(|row| row.record.application_id == application_id)
            .collect();

        rows.sort_by(|a, b| {
            a.record
                .document_type_id
                .cmp(&b.record.document_type_id)
                .then(a.record.attempt_number.cmp(&b.record.attempt_number))
                .then(a.table.cmp(&b.table))
                .then(a.record.created_at.cmp(&b.record.created_at))
        });

        Self {
            application_id,
            rows,
        }
    }

    pub fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    pub fn rows(&self) -> &[SourcedReferral] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn documents(&self) -> BTreeSet<&DocumentTypeId> {
        self.rows
            .iter()
            .map(|row| &row.record.document_type_id)
            .collect()
    }

    fn rows_for<'a>(
        &'a self,
        document: &DocumentTypeId,
    ) -> impl Iterator<Item = &'a SourcedReferral> + 'a {
        let document = document.clone();
        self.rows
            .iter()
            .filter(move |row| row.record.document_type_id == document)
    }

    // `Current` orders after `Legacy`, so the max is the preferred table.
    fn preferred_table(&self, document: &DocumentTypeId) -> Option<ReferralTable> {
        self.rows_for(document).map(|row| row.table).max()
    }

    /// Latest row of the preferred table for `document`.
    pub fn authoritative(&self, document: &DocumentTypeId) -> Option<&SourcedReferral> {
        let table = self.preferred_table(document)?;
        self.rows_for(document)
            .filter(|row| row.table == table)
            .max_by(|a, b| {
                a.record
                    .attempt_number
                    .cmp(&b.record.attempt_number)
                    .then(a.record.created_at.cmp(&b.record.created_at))
            })
    }

    pub fn attempt_state(&self, document: &DocumentTypeId) -> AttemptState {
        match self.authoritative(document) {
            Some(row) => AttemptState {
                document_type_id: document.clone(),
                count: row.record.attempt_number,
                source_table: Some(row.table),
            },
            None => AttemptState {
                document_type_id: document.clone(),
                count: 0,
                source_table: None,
            },
        }
    }

    pub fn attempt_states(&self) -> Vec<AttemptState> {
        self.documents()
            .into_iter()
            .map(|document| self.attempt_state(document))
            .collect()
    }

    /// The document's open referral, if the authoritative row has not been replaced.
    pub fn unresolved(&self, document: &DocumentTypeId) -> Option<LogicalReferral> {
        let authoritative = self.authoritative(document)?;
        if !authoritative.record.is_unresolved() {
            return None;
        }

        let keys = self
            .rows_for(document)
            .filter(|row| row.record.is_unresolved())
            .map(SourcedReferral::key)
            .collect();

        Some(LogicalReferral {
            record: authoritative.record.clone(),
            source_table: authoritative.table,
            keys,
        })
    }

    pub fn has_unresolved(&self) -> bool {
        self.documents()
            .into_iter()
            .any(|document| self.unresolved(document).is_some())
    }

    /// One entry per document whose open authoritative referral has not been announced yet.
    pub fn pending_notifications(&self) -> Vec<LogicalReferral> {
        self.documents()
            .into_iter()
            .filter_map(|document| {
                let authoritative = self.authoritative(document)?;
                if authoritative.record.notification_sent || !authoritative.record.is_unresolved()
                {
                    return None;
                }

                let keys = self
                    .rows_for(document)
                    .filter(|row| !row.record.notification_sent)
                    .map(SourcedReferral::key)
                    .collect();

                Some(LogicalReferral {
                    record: authoritative.record.clone(),
                    source_table: authoritative.table,
                    keys,
                })
            })
            .collect()
    }

    /// Unannounced rows for documents the applicant already resubmitted. They are marked
    /// notified without composing a notice.
    pub fn superseded_notification_keys(&self) -> Vec<ReferralKey> {
        self.documents()
            .into_iter()
            .filter(|document| {
                self.authoritative(document).is_some_and(|row| {
                    !row.record.notification_sent && !row.record.is_unresolved()
                })
            })
            .flat_map(|document| {
                self.rows_for(document)
                    .filter(|row| !row.record.notification_sent)
                    .map(SourcedReferral::key)
            })
            .collect()
    }

    /// Attempts for `document` in order, one row per attempt, current table winning ties.
    pub fn history(&self, document: &DocumentTypeId) -> Vec<&SourcedReferral> {
        let mut history: Vec<&SourcedReferral> = Vec::new();
        for row in self.rows_for(document) {
            let same_attempt = history
                .last()
                .is_some_and(|last| last.record.attempt_number == row.record.attempt_number);
            if !same_attempt {
                history.push(row);
            } else if row.table == ReferralTable::Current {
                if let Some(last) = history.last_mut() {
                    *last = row;
                }
            }
        }
        history
    }
}
