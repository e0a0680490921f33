//! Local marker stores.
//!
//! [`LocalStore`] is what a sync cycle needs from persistence: a snapshot
//! read, single-row mutations, and atomic batch application.
//! [`MemoryStore`] is the in-process implementation used by the native
//! library and by tests.

use crate::{
    error::Result, Error, ExternalId, LocalEntry, ReconciliationPlan, RemoteEntry, RowId,
    StoreSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};

/// Emitted once per applied batch (and once per single-row mutation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    /// Rows inserted
    pub inserted: usize,
    /// Rows updated
    pub updated: usize,
    /// Rows deleted
    pub deleted: usize,
}

impl ChangeNotification {
    /// Counts of a fully applied plan.
    pub fn for_plan(plan: &ReconciliationPlan) -> Self {
        Self {
            inserted: plan.inserts.len(),
            updated: plan.updates.len(),
            deleted: plan.deletes.len(),
        }
    }
}

/// Row selection for queries.
///
/// All present criteria must match. A filter with a row id is therefore
/// "this row, and only if it also matches the rest".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerFilter {
    /// Restrict to a single row
    #[serde(default)]
    pub row_id: Option<RowId>,
    /// Restrict to a feed id
    #[serde(default)]
    pub external_id: Option<ExternalId>,
    /// Restrict to an exact name
    #[serde(default)]
    pub name: Option<String>,
}

impl MarkerFilter {
    /// A filter that matches every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope to a row id.
    pub fn with_row_id(mut self, row_id: RowId) -> Self {
        self.row_id = Some(row_id);
        self
    }

    /// Scope to a feed id.
    pub fn with_external_id(mut self, external_id: impl Into<ExternalId>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Scope to an exact name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Check a row against every present criterion.
    pub fn matches(&self, entry: &LocalEntry) -> bool {
        self.row_id.map_or(true, |id| entry.row_id == id)
            && self
                .external_id
                .as_deref()
                .map_or(true, |id| entry.external_id.as_deref() == Some(id))
            && self
                .name
                .as_deref()
                .map_or(true, |name| entry.name.as_deref() == Some(name))
    }
}

/// Persistence seam for sync cycles.
pub trait LocalStore {
    /// All rows, ordered by row id.
    fn snapshot(&self) -> Result<Vec<LocalEntry>>;

    /// A row by its row id.
    fn get(&self, row_id: RowId) -> Result<Option<LocalEntry>>;

    /// A row by its feed id.
    fn find_by_external_id(&self, external_id: &str) -> Result<Option<LocalEntry>>;

    /// Insert a row for a remote entry, returning the assigned row id.
    fn insert(&mut self, entry: &RemoteEntry) -> Result<RowId>;

    /// Overwrite a row with a remote entry.
    fn update(&mut self, row_id: RowId, entry: &RemoteEntry) -> Result<()>;

    /// Remove a row.
    fn delete(&mut self, row_id: RowId) -> Result<()>;

    /// Apply a whole plan, returning the number of mutations applied.
    ///
    /// Either every operation lands or none does; on failure the error is
    /// [`Error::Apply`] carrying the count applied before the rollback.
    fn apply_batch(&mut self, plan: &ReconciliationPlan) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq)]
struct Rows {
    entries: BTreeMap<RowId, LocalEntry>,
    next_row_id: RowId,
}

impl Rows {
    fn find_by_external_id(&self, external_id: &str) -> Option<&LocalEntry> {
        self.entries
            .values()
            .find(|e| e.external_id.as_deref() == Some(external_id))
    }

    fn insert(&mut self, entry: &RemoteEntry) -> Result<RowId> {
        if let Some(id) = &entry.id {
            if self.find_by_external_id(id).is_some() {
                return Err(Error::DuplicateExternalId(id.clone()));
            }
        }

        let row_id = self.next_row_id;
        self.next_row_id += 1;
        self.entries
            .insert(row_id, LocalEntry::from_remote(row_id, entry));
        Ok(row_id)
    }

    fn update(&mut self, row_id: RowId, entry: &RemoteEntry) -> Result<()> {
        if let Some(id) = &entry.id {
            let taken = self
                .find_by_external_id(id)
                .is_some_and(|other| other.row_id != row_id);
            if taken {
                return Err(Error::DuplicateExternalId(id.clone()));
            }
        }

        let row = self
            .entries
            .get_mut(&row_id)
            .ok_or(Error::RowNotFound(row_id))?;
        row.apply_remote(entry);
        Ok(())
    }

    fn delete(&mut self, row_id: RowId) -> Result<()> {
        self.entries
            .remove(&row_id)
            .map(|_| ())
            .ok_or(Error::RowNotFound(row_id))
    }
}

/// In-memory marker cache.
///
/// Batches are applied to a staged copy and swapped in only when every
/// operation succeeded.
#[derive(Debug)]
pub struct MemoryStore {
    rows: Rows,
    subscribers: Vec<Sender<ChangeNotification>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store. Row ids start at 1.
    pub fn new() -> Self {
        Self {
            rows: Rows {
                entries: BTreeMap::new(),
                next_row_id: 1,
            },
            subscribers: Vec::new(),
        }
    }

    /// Number of cached rows.
    pub fn len(&self) -> usize {
        self.rows.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.entries.is_empty()
    }

    /// Rows matching a filter, ordered by row id.
    pub fn query(&self, filter: &MarkerFilter) -> Vec<&LocalEntry> {
        match filter.row_id {
            Some(row_id) => self
                .rows
                .entries
                .get(&row_id)
                .filter(|e| filter.matches(e))
                .into_iter()
                .collect(),
            None => self
                .rows
                .entries
                .values()
                .filter(|e| filter.matches(e))
                .collect(),
        }
    }

    /// Receive a [`ChangeNotification`] after every committed change.
    ///
    /// Dropped receivers are pruned on the next notification.
    pub fn subscribe(&mut self) -> Receiver<ChangeNotification> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, notification: ChangeNotification) {
        self.subscribers
            .retain(|tx| tx.send(notification).is_ok());
    }

    /// Export the cache as a snapshot.
    pub fn export_state(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new();
        snapshot.next_row_id = self.rows.next_row_id;
        for entry in self.rows.entries.values() {
            snapshot.add_entry(entry.clone());
        }
        snapshot
    }

    /// Replace the cache with a snapshot's contents.
    ///
    /// Subscribers are kept and notified with the size of the swap.
    pub fn import_state(&mut self, snapshot: StoreSnapshot) -> Result<()> {
        snapshot.validate()?;

        let deleted = self.rows.entries.len();
        let inserted = snapshot.entries.len();
        self.rows = Rows {
            entries: snapshot.entries,
            next_row_id: snapshot.next_row_id,
        };
        self.notify(ChangeNotification {
            inserted,
            updated: 0,
            deleted,
        });
        Ok(())
    }
}

impl LocalStore for MemoryStore {
    fn snapshot(&self) -> Result<Vec<LocalEntry>> {
        Ok(self.rows.entries.values().cloned().collect())
    }

    fn get(&self, row_id: RowId) -> Result<Option<LocalEntry>> {
        Ok(self.rows.entries.get(&row_id).cloned())
    }

    fn find_by_external_id(&self, external_id: &str) -> Result<Option<LocalEntry>> {
        Ok(self.rows.find_by_external_id(external_id).cloned())
    }

    fn insert(&mut self, entry: &RemoteEntry) -> Result<RowId> {
        let row_id = self.rows.insert(entry)?;
        self.notify(ChangeNotification {
            inserted: 1,
            ..Default::default()
        });
        Ok(row_id)
    }

    fn update(&mut self, row_id: RowId, entry: &RemoteEntry) -> Result<()> {
        self.rows.update(row_id, entry)?;
        self.notify(ChangeNotification {
            updated: 1,
            ..Default::default()
        });
        Ok(())
    }

    fn delete(&mut self, row_id: RowId) -> Result<()> {
        self.rows.delete(row_id)?;
        self.notify(ChangeNotification {
            deleted: 1,
            ..Default::default()
        });
        Ok(())
    }

    fn apply_batch(&mut self, plan: &ReconciliationPlan) -> Result<usize> {
        let mut staged = self.rows.clone();
        let mut applied = 0;

        // Deletes first so a freed external id can be reused by an insert.
        for row_id in &plan.deletes {
            staged
                .delete(*row_id)
                .map_err(|e| Error::apply(applied, e))?;
            applied += 1;
        }
        for update in &plan.updates {
            staged
                .update(update.row_id, &update.entry)
                .map_err(|e| Error::apply(applied, e))?;
            applied += 1;
        }
        for entry in &plan.inserts {
            staged.insert(entry).map_err(|e| Error::apply(applied, e))?;
            applied += 1;
        }

        self.rows = staged;
        self.notify(ChangeNotification::for_plan(plan));
        Ok(applied)
    }
}
