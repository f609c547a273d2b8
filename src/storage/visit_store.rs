//! The visit state store.
//!
//! Groups sockets by host identity, keeps one [`VisitRecord`] per port and
//! persists the whole structure as `{"ips": [...]}`. Structure is fixed once
//! built; only records change during a scan.

use super::record::VisitRecord;
use crate::error::{StorageError, StorageResult};
use crate::types::{HostIdentity, Port, Socket};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// One port of a host entry with its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    pub port: Port,
    pub record: VisitRecord,
}

// Persisted as a single-key object: {"8080": {...}}.
impl Serialize for PortEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.port.to_string(), &self.record)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for PortEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PortEntryVisitor;

        impl<'de> Visitor<'de> for PortEntryVisitor {
            type Value = PortEntry;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object with a single port key")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PortEntry, A::Error> {
                let (key, record): (String, VisitRecord) = map
                    .next_entry()?
                    .ok_or_else(|| de::Error::custom("empty port entry"))?;
                if map.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom("port entry has more than one key"));
                }
                let port = key.parse::<Port>().map_err(de::Error::custom)?;
                Ok(PortEntry { port, record })
            }
        }

        deserializer.deserialize_map(PortEntryVisitor)
    }
}

/// All ports visited for one host identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub identity: HostIdentity,
    pub ports: Vec<PortEntry>,
}

impl HostEntry {
    fn new(identity: HostIdentity) -> Self {
        Self {
            identity,
            ports: Vec::new(),
        }
    }

    pub fn record(&self, port: Port) -> Option<&VisitRecord> {
        self.ports.iter().find(|p| p.port == port).map(|p| &p.record)
    }

    fn record_mut(&mut self, port: Port) -> Option<&mut VisitRecord> {
        self.ports
            .iter_mut()
            .find(|p| p.port == port)
            .map(|p| &mut p.record)
    }
}

impl Serialize for HostEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (ip, url) = match &self.identity {
            HostIdentity::Ip(ip) => (ip.clone(), String::new()),
            HostIdentity::Name(name) => (String::new(), name.clone()),
        };
        let mut state = serializer.serialize_struct("HostEntry", 3)?;
        state.serialize_field("ip", &ip)?;
        state.serialize_field("url", &url)?;
        state.serialize_field("ports", &self.ports)?;
        state.end()
    }
}

#[derive(Deserialize)]
struct HostRepr {
    #[serde(default)]
    ip: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    ports: Vec<PortEntry>,
}

impl<'de> Deserialize<'de> for HostEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = HostRepr::deserialize(deserializer)?;
        let identity = if !repr.url.is_empty() {
            HostIdentity::Name(repr.url)
        } else {
            if repr.ip.parse::<IpAddr>().is_err() {
                return Err(de::Error::custom(format!(
                    "host entry has neither url nor valid ip: {:?}",
                    repr.ip
                )));
            }
            HostIdentity::Ip(repr.ip)
        };
        Ok(Self {
            identity,
            ports: repr.ports,
        })
    }
}

/// One unit of scan work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitTask {
    pub identity: HostIdentity,
    pub port: Port,
}

impl fmt::Display for VisitTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identity, self.port)
    }
}

/// Ordered host entries with unique identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitStore {
    entries: Vec<HostEntry>,
    index: HashMap<HostIdentity, usize>,
}

impl VisitStore {
    /// Group sockets by identity, with empty records.
    ///
    /// Identities keep first-seen order; duplicate ports under one identity
    /// collapse into one record.
    pub fn from_sockets<'a>(sockets: impl IntoIterator<Item = &'a Socket>) -> Self {
        let mut store = Self::default();
        for socket in sockets {
            tracing::debug!("Processing socket: {}", socket);
            store.insert(socket.identity(), socket.port);
        }
        tracing::debug!(
            "Built visit state with {} unique identities and {} port entries",
            store.len(),
            store.socket_count()
        );
        store
    }

    fn from_entries(entries: Vec<HostEntry>) -> Self {
        let mut store = Self::default();
        for entry in entries {
            let identity = entry.identity.clone();
            for port_entry in entry.ports {
                store.insert(identity.clone(), port_entry.port);
                if let Some(record) = store.record_mut(&identity, port_entry.port) {
                    *record = port_entry.record;
                }
            }
        }
        store
    }

    fn insert(&mut self, identity: HostIdentity, port: Port) {
        let idx = match self.index.get(&identity) {
            Some(&idx) => idx,
            None => {
                self.entries.push(HostEntry::new(identity.clone()));
                self.index.insert(identity, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[idx];
        if entry.record(port).is_none() {
            entry.ports.push(PortEntry {
                port,
                record: VisitRecord::default(),
            });
        }
    }

    /// Number of host identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of (identity, port) records.
    pub fn socket_count(&self) -> usize {
        self.entries.iter().map(|e| e.ports.len()).sum()
    }

    pub fn entries(&self) -> &[HostEntry] {
        &self.entries
    }

    pub fn records(&self) -> impl Iterator<Item = &VisitRecord> {
        self.entries
            .iter()
            .flat_map(|e| e.ports.iter().map(|p| &p.record))
    }

    pub fn record(&self, identity: &HostIdentity, port: Port) -> Option<&VisitRecord> {
        let idx = *self.index.get(identity)?;
        self.entries[idx].record(port)
    }

    pub fn record_mut(&mut self, identity: &HostIdentity, port: Port) -> Option<&mut VisitRecord> {
        let idx = *self.index.get(identity)?;
        self.entries[idx].record_mut(port)
    }

    /// Every (identity, port) pair in store order. With `skip_visited`,
    /// records that already hold a response are left out.
    pub fn tasks(&self, skip_visited: bool) -> Vec<VisitTask> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry
                    .ports
                    .iter()
                    .filter(move |p| !skip_visited || p.record.is_pending())
                    .map(move |p| VisitTask {
                        identity: entry.identity.clone(),
                        port: p.port,
                    })
            })
            .collect()
    }

    /// Copy records of a previous run into matching (identity, port) pairs.
    ///
    /// Pairs that are not part of this run are ignored. Returns the number
    /// of records carried over.
    pub fn merge_previous(&mut self, previous: VisitStore) -> usize {
        let mut merged = 0;
        for entry in previous.entries {
            for port_entry in entry.ports {
                if let Some(record) = self.record_mut(&entry.identity, port_entry.port) {
                    *record = port_entry.record;
                    merged += 1;
                }
            }
        }
        merged
    }

    /// Load a persisted store.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| StorageError::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| StorageError::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> StorageResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the store by replacing `path` with a fully written temp file.
    pub async fn write_atomic(&self, path: &Path) -> StorageResult<()> {
        let content = self.to_json()?;
        let tmp = tmp_path(path);

        tokio::fs::write(&tmp, content)
            .await
            .map_err(|source| StorageError::WriteFailed {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| StorageError::WriteFailed {
                path: path.to_path_buf(),
                source,
            })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

impl Serialize for VisitStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("VisitStore", 1)?;
        state.serialize_field("ips", &self.entries)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for VisitStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct StoreRepr {
            #[serde(default)]
            ips: Vec<HostEntry>,
        }

        let repr = StoreRepr::deserialize(deserializer)?;
        Ok(Self::from_entries(repr.ips))
    }
}

/// The store shared by scan tasks, bound to its output file.
///
/// One lock covers the record update and the flush that follows it, so the
/// file on disk is always a complete snapshot.
#[derive(Debug)]
pub struct SharedStore {
    store: Mutex<VisitStore>,
    path: PathBuf,
}

impl SharedStore {
    pub fn new(store: VisitStore, path: impl Into<PathBuf>) -> Self {
        Self {
            store: Mutex::new(store),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mutate one record and flush the whole store.
    ///
    /// Returns `false` when the pair is unknown. Write failures are logged
    /// and do not fail the update.
    pub async fn update<F>(&self, identity: &HostIdentity, port: Port, apply: F) -> bool
    where
        F: FnOnce(&mut VisitRecord),
    {
        let mut store = self.store.lock().await;
        let Some(record) = store.record_mut(identity, port) else {
            tracing::error!("No visit record for {}:{}", identity, port);
            return false;
        };
        apply(record);

        if let Err(e) = store.write_atomic(&self.path).await {
            tracing::error!("Failed to save visit state: {}", e);
        }
        true
    }

    /// Flush the current state.
    pub async fn flush(&self) -> StorageResult<()> {
        let store = self.store.lock().await;
        store.write_atomic(&self.path).await
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> VisitStore {
        self.store.lock().await.clone()
    }

    pub fn into_inner(self) -> VisitStore {
        self.store.into_inner()
    }
}
