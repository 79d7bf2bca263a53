//! fintrack-storage-json
//!
//! Filesystem-backed JSON persistence for recurrence definitions and the
//! transactions they produce. Every mutation rewrites the snapshot through a
//! temporary file and an atomic rename, so a commit is either fully on disk or not
//! at all. An advisory lock on a sidecar `<store>.lock` file serialises
//! read-modify-write cycles across processes sharing the same store.

use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::NaiveDate;
use fintrack_core::{
    storage::{ensure_commit_target, DueEntry, RecurrenceStore, StoreResult},
    StoreError,
};
use fintrack_domain::{
    DateWindow, DueOccurrence, Frequency, MaterializedTransaction, RecurrenceDefinition,
    TransactionKind, Transition,
};
use fs2::FileExt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STORE_SCHEMA_VERSION: u32 = 1;
const TMP_SUFFIX: &str = "tmp";
const LOCK_SUFFIX: &str = "lock";

/// On-disk shape of a definition. The frequency stays a raw code so a single
/// unrecognised row cannot make the whole file unreadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDefinition {
    id: Uuid,
    owner_id: Uuid,
    amount: Decimal,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    kind: TransactionKind,
    frequency: String,
    start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
    next_occurrence: NaiveDate,
    is_active: bool,
}

impl StoredDefinition {
    fn to_definition(&self) -> Option<RecurrenceDefinition> {
        let frequency = self.frequency.parse::<Frequency>().ok()?;
        Some(RecurrenceDefinition {
            id: self.id,
            owner_id: self.owner_id,
            amount: self.amount,
            description: self.description.clone(),
            category: self.category.clone(),
            kind: self.kind,
            frequency,
            start_date: self.start_date,
            end_date: self.end_date,
            next_occurrence: self.next_occurrence,
            is_active: self.is_active,
        })
    }

    fn due_occurrence(&self) -> DueOccurrence {
        DueOccurrence {
            recurrence_id: self.id,
            owner_id: self.owner_id,
            amount: self.amount,
            description: self.description.clone(),
            category: self.category.clone(),
            kind: self.kind,
            date: self.next_occurrence,
        }
    }

    fn to_entry(&self) -> DueEntry {
        match self.to_definition() {
            Some(definition) => DueEntry::Ready(definition),
            None => DueEntry::Unschedulable {
                occurrence: self.due_occurrence(),
                frequency: self.frequency.clone(),
            },
        }
    }

    /// Applies a committed transition to the raw row. Works for rows whose
    /// frequency code is unknown, which can only ever terminate.
    fn apply(&mut self, transition: Transition) {
        if !self.is_active {
            return;
        }
        match transition {
            Transition::Advance { next } => self.next_occurrence = next,
            Transition::Terminate => self.is_active = false,
        }
    }
}

impl From<&RecurrenceDefinition> for StoredDefinition {
    fn from(definition: &RecurrenceDefinition) -> Self {
        Self {
            id: definition.id,
            owner_id: definition.owner_id,
            amount: definition.amount,
            description: definition.description.clone(),
            category: definition.category.clone(),
            kind: definition.kind,
            frequency: definition.frequency.code().to_string(),
            start_date: definition.start_date,
            end_date: definition.end_date,
            next_occurrence: definition.next_occurrence,
            is_active: definition.is_active,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    #[serde(default)]
    schema_version: u32,
    #[serde(default)]
    definitions: Vec<StoredDefinition>,
    #[serde(default)]
    transactions: Vec<MaterializedTransaction>,
}

impl StoreSnapshot {
    fn definition_mut(&mut self, id: Uuid) -> StoreResult<&mut StoredDefinition> {
        self.definitions
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

/// Holds the process-local mutex and the advisory file lock; both are released
/// on drop.
struct StoreGuard<'a> {
    _local: MutexGuard<'a, ()>,
    file: File,
}

impl Drop for StoreGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %err, "failed to release json store file lock");
        }
    }
}

/// JSON file store. Reads take a shared lock and mutations an exclusive one, both
/// on the sidecar lock file, so several handles or processes can share a path.
#[derive(Debug)]
pub struct JsonRecurrenceStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonRecurrenceStore {
    /// Opens the store at `path`, creating an empty snapshot when the file is missing.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            lock_path: sidecar_path(&path, LOCK_SUFFIX),
            path,
            lock: Mutex::new(()),
        };
        {
            let _guard = store.exclusive()?;
            if !store.path.exists() {
                store.write(&StoreSnapshot {
                    schema_version: STORE_SCHEMA_VERSION,
                    ..StoreSnapshot::default()
                })?;
            }
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file carrying the advisory lock.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Every transaction in the file, in creation order.
    pub fn transactions(&self) -> StoreResult<Vec<MaterializedTransaction>> {
        let _guard = self.shared()?;
        Ok(self.read()?.transactions)
    }

    fn shared(&self) -> StoreResult<StoreGuard<'_>> {
        let local = self.local()?;
        let file = self.open_lock_file()?;
        FileExt::lock_shared(&file)?;
        Ok(StoreGuard {
            _local: local,
            file,
        })
    }

    fn exclusive(&self) -> StoreResult<StoreGuard<'_>> {
        let local = self.local()?;
        let file = self.open_lock_file()?;
        FileExt::lock_exclusive(&file)?;
        Ok(StoreGuard {
            _local: local,
            file,
        })
    }

    fn local(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| StoreError::Unavailable("json store lock poisoned".into()))
    }

    fn open_lock_file(&self) -> StoreResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?)
    }

    fn read(&self) -> StoreResult<StoreSnapshot> {
        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|err| StoreError::Serde(err.to_string()))
    }

    fn write(&self, snapshot: &StoreSnapshot) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|err| StoreError::Serde(err.to_string()))?;
        let tmp = sidecar_path(&self.path, TMP_SUFFIX);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut StoreSnapshot) -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.exclusive()?;
        let mut snapshot = self.read()?;
        let value = apply(&mut snapshot)?;
        snapshot.schema_version = STORE_SCHEMA_VERSION;
        self.write(&snapshot)?;
        Ok(value)
    }
}

impl RecurrenceStore for JsonRecurrenceStore {
    fn list_due(&self, as_of: NaiveDate) -> StoreResult<Vec<DueEntry>> {
        let _guard = self.shared()?;
        let snapshot = self.read()?;
        Ok(snapshot
            .definitions
            .iter()
            .filter(|stored| stored.is_active && stored.next_occurrence <= as_of)
            .map(StoredDefinition::to_entry)
            .collect())
    }

    fn commit_occurrence(
        &self,
        transaction: &MaterializedTransaction,
        transition: Transition,
    ) -> StoreResult<()> {
        self.mutate(|snapshot| {
            let stored = snapshot.definition_mut(transaction.recurrence_id)?;
            ensure_commit_target(
                stored.id,
                stored.is_active,
                stored.next_occurrence,
                transaction.date,
            )?;
            stored.apply(transition);
            snapshot.transactions.push(transaction.clone());
            Ok(())
        })
    }

    fn insert_definition(&self, definition: &RecurrenceDefinition) -> StoreResult<()> {
        self.mutate(|snapshot| {
            if snapshot.definitions.iter().any(|stored| stored.id == definition.id) {
                return Err(StoreError::Duplicate { id: definition.id });
            }
            snapshot.definitions.push(StoredDefinition::from(definition));
            Ok(())
        })
    }

    fn definition(&self, id: Uuid) -> StoreResult<Option<RecurrenceDefinition>> {
        let _guard = self.shared()?;
        let snapshot = self.read()?;
        match snapshot.definitions.iter().find(|stored| stored.id == id) {
            None => Ok(None),
            Some(stored) => stored.to_definition().map(Some).ok_or_else(|| {
                StoreError::Serde(format!(
                    "recurrence {} has unknown frequency `{}`",
                    stored.id, stored.frequency
                ))
            }),
        }
    }

    fn list_definitions(&self) -> StoreResult<Vec<RecurrenceDefinition>> {
        let _guard = self.shared()?;
        let snapshot = self.read()?;
        let mut definitions = Vec::with_capacity(snapshot.definitions.len());
        for stored in &snapshot.definitions {
            match stored.to_definition() {
                Some(definition) => definitions.push(definition),
                None => tracing::warn!(
                    id = %stored.id,
                    frequency = %stored.frequency,
                    "skipping recurrence with unknown frequency"
                ),
            }
        }
        Ok(definitions)
    }

    fn transactions_for(
        &self,
        owner_id: Uuid,
        window: DateWindow,
    ) -> StoreResult<Vec<MaterializedTransaction>> {
        let _guard = self.shared()?;
        Ok(self
            .read()?
            .transactions
            .into_iter()
            .filter(|txn| txn.owner_id == owner_id && window.contains(txn.date))
            .collect())
    }
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut sidecar = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{suffix}"),
        None => suffix.to_string(),
    };
    sidecar.set_extension(ext);
    sidecar
}

fn write_atomic(path: &Path, data: &str) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
