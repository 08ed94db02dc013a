//! Change/event stores.
//!
//! Two variants sit behind [`ChangesStore`]: an append-only [`ListStore`] and
//! an id-indexed [`IndexedStore`] that upserts on re-ingestion and can
//! snapshot itself to a JSON file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gstats_core::error::{Result, StatsError};
use gstats_core::models::{Changeset, Event};
use gstats_core::settings::StoreKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

// ── ChangesStore ──────────────────────────────────────────────────────────────

/// Storage for normalized changesets and events.
pub trait ChangesStore {
    fn add_changeset(&mut self, changeset: Changeset);
    fn add_events(&mut self, events: Vec<Event>);

    fn changesets(&self) -> &[Changeset];
    fn events(&self) -> &[Event];

    /// Restore the persisted snapshot, if the store has one.
    fn load(&mut self) -> Result<()>;
    /// Overwrite the persisted snapshot with the current content.
    fn commit(&self) -> Result<()>;
}

impl<S: ChangesStore + ?Sized> ChangesStore for Box<S> {
    fn add_changeset(&mut self, changeset: Changeset) {
        (**self).add_changeset(changeset)
    }

    fn add_events(&mut self, events: Vec<Event>) {
        (**self).add_events(events)
    }

    fn changesets(&self) -> &[Changeset] {
        (**self).changesets()
    }

    fn events(&self) -> &[Event] {
        (**self).events()
    }

    fn load(&mut self) -> Result<()> {
        (**self).load()
    }

    fn commit(&self) -> Result<()> {
        (**self).commit()
    }
}

/// Build the store selected on the command line.
pub fn open_store(kind: StoreKind, db_path: Option<PathBuf>) -> Box<dyn ChangesStore> {
    match kind {
        StoreKind::Indexed => Box::new(IndexedStore::new(db_path)),
        StoreKind::List => {
            if let Some(path) = db_path {
                warn!(
                    "List store does not persist; ignoring db path {}",
                    path.display()
                );
            }
            Box::new(ListStore::new())
        }
    }
}

// ── ListStore ─────────────────────────────────────────────────────────────────

/// Append-only in-memory store. Re-ingesting the same data duplicates it.
#[derive(Debug, Default)]
pub struct ListStore {
    changesets: Vec<Changeset>,
    events: Vec<Event>,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangesStore for ListStore {
    fn add_changeset(&mut self, changeset: Changeset) {
        self.changesets.push(changeset);
    }

    fn add_events(&mut self, events: Vec<Event>) {
        self.events.extend(events);
    }

    fn changesets(&self) -> &[Changeset] {
        &self.changesets
    }

    fn events(&self) -> &[Event] {
        &self.events
    }

    fn load(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        Ok(())
    }
}

// ── KeyedVec ──────────────────────────────────────────────────────────────────

/// A `Vec` addressable by string key. Replacing a key keeps its original
/// position, so iteration order is first-insertion order.
#[derive(Debug, Clone)]
pub(crate) struct KeyedVec<T> {
    items: Vec<T>,
    positions: HashMap<String, usize>,
}

impl<T> Default for KeyedVec<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T> KeyedVec<T> {
    /// Insert or replace the value stored under `key`.
    pub(crate) fn upsert(&mut self, key: String, value: T) {
        match self.positions.get(&key) {
            Some(&idx) => self.items[idx] = value,
            None => {
                self.positions.insert(key, self.items.len());
                self.items.push(value);
            }
        }
    }

    /// Mutable access to the value under `key`, inserting `make()` first if
    /// the key is new.
    pub(crate) fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> T) -> &mut T {
        let idx = match self.positions.get(key) {
            Some(&idx) => idx,
            None => {
                let idx = self.items.len();
                self.positions.insert(key.to_string(), idx);
                self.items.push(make());
                idx
            }
        };
        &mut self.items[idx]
    }

    pub(crate) fn get(&self, key: &str) -> Option<&T> {
        self.positions.get(key).map(|&idx| &self.items[idx])
    }

    pub(crate) fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub(crate) fn into_vec(self) -> Vec<T> {
        self.items
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

// ── IndexedStore ──────────────────────────────────────────────────────────────

/// On-disk layout of an [`IndexedStore`] snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedStore {
    #[serde(default)]
    changesets: Map<String, Value>,
    #[serde(default)]
    events: Map<String, Value>,
}

/// In-memory store indexed by id, with optional whole-file persistence.
#[derive(Debug, Default)]
pub struct IndexedStore {
    changesets: KeyedVec<Changeset>,
    events: KeyedVec<Event>,
    /// Snapshot location; `None` disables `load`/`commit`.
    path: Option<PathBuf>,
}

impl IndexedStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    /// Store without persistence.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn changeset(&self, id: &str) -> Option<&Changeset> {
        self.changesets.get(id)
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }
}

impl ChangesStore for IndexedStore {
    fn add_changeset(&mut self, changeset: Changeset) {
        self.changesets.upsert(changeset.id.clone(), changeset);
    }

    fn add_events(&mut self, events: Vec<Event>) {
        for event in events {
            self.events.upsert(event.id.clone(), event);
        }
    }

    fn changesets(&self) -> &[Changeset] {
        self.changesets.as_slice()
    }

    fn events(&self) -> &[Event] {
        self.events.as_slice()
    }

    /// A missing file is an empty initial state; anything else that stops the
    /// snapshot from being read is an error.
    fn load(&mut self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No store at {}, starting empty", path.display());
                return Ok(());
            }
            Err(source) => {
                return Err(StatsError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(());
        }

        let decode_err = |source| StatsError::StoreDecode {
            path: path.to_path_buf(),
            source,
        };
        let persisted: PersistedStore = serde_json::from_str(&raw).map_err(decode_err)?;
        let changesets = from_keyed(persisted.changesets).map_err(decode_err)?;
        let events = from_keyed(persisted.events).map_err(decode_err)?;

        info!(
            "Loaded {} changesets and {} events from {}",
            changesets.len(),
            events.len(),
            path.display()
        );
        self.changesets = changesets;
        self.events = events;
        Ok(())
    }

    /// Write both collections as id-keyed objects, replacing the whole file.
    fn commit(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let persisted = PersistedStore {
            changesets: to_keyed(self.changesets.as_slice(), |cs| &cs.id)?,
            events: to_keyed(self.events.as_slice(), |ev| &ev.id)?,
        };
        let json = serde_json::to_string_pretty(&persisted)
            .map_err(|e| StatsError::Other(e.into()))?;

        let write_err = |source| StatsError::FileWrite {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(write_err)?;
        std::fs::rename(&tmp, path).map_err(write_err)?;

        debug!(
            "Committed {} changesets and {} events to {}",
            self.changesets.len(),
            self.events.len(),
            path.display()
        );
        Ok(())
    }
}

fn to_keyed<T: Serialize>(items: &[T], key: impl Fn(&T) -> &String) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for item in items {
        let value = serde_json::to_value(item).map_err(|e| StatsError::Other(e.into()))?;
        map.insert(key(item).clone(), value);
    }
    Ok(map)
}

fn from_keyed<T: DeserializeOwned>(map: Map<String, Value>) -> serde_json::Result<KeyedVec<T>> {
    let mut out = KeyedVec::default();
    for (key, value) in map {
        out.upsert(key, serde_json::from_value(value)?);
    }
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
