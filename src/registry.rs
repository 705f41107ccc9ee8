//! Tracked-domain registry: an in-memory set mirrored to a JSON file on
//! every mutation.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::error::RegistryError;

/// Durable storage handle for the registry. Injected so persistence
/// failures can be exercised apart from the in-memory set arithmetic.
pub trait RegistryStore: Send + Sync {
    /// `Ok(None)` means the storage does not exist yet and the caller
    /// should fall back to the bundled seed list.
    fn load(&self) -> Result<Option<BTreeSet<String>>, RegistryError>;
    fn save(&self, domains: &BTreeSet<String>) -> Result<(), RegistryError>;
}

/// JSON-array-of-strings file storage.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<Option<BTreeSet<String>>, RegistryError> {
        // A directory at the storage path is environment misconfiguration;
        // treat it as absent and let the next save replace it with a file.
        if !self.path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let entries: Vec<String> = serde_json::from_str(&raw)?;
        Ok(Some(entries.into_iter().collect()))
    }

    fn save(&self, domains: &BTreeSet<String>) -> Result<(), RegistryError> {
        if self.path.is_dir() {
            fs::remove_dir_all(&self.path)?;
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        // BTreeSet iterates in lexicographic order, so the serialized array
        // is already sorted and the file format is stable across saves.
        let entries: Vec<&String> = domains.iter().collect();
        let json = serde_json::to_string_pretty(&entries)?;

        // Temp sibling + rename so a reader never observes a partial file.
        let tmp = self.path.with_file_name(format!(
            "{}.tmp",
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "domains".to_string())
        ));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Set of tracked paywalled domains, owned by the process for its lifetime.
///
/// Reads (membership, list) run concurrently; mutations serialize under the
/// writer lock and persist before the in-memory set is updated, so memory
/// and disk converge before any mutating call returns.
pub struct DomainRegistry {
    domains: RwLock<BTreeSet<String>>,
    store: Box<dyn RegistryStore>,
}

impl DomainRegistry {
    /// Load the registry from durable storage, falling back to the seed
    /// list (persisted immediately) and then to an empty set.
    pub fn open(
        store: Box<dyn RegistryStore>,
        seed_file: &Path,
    ) -> Result<Self, RegistryError> {
        let domains = match store.load()? {
            Some(set) => set,
            None if seed_file.is_file() => {
                let seeded = load_seed(seed_file)?;
                store.save(&seeded)?;
                tracing::info!(
                    count = seeded.len(),
                    seed = %seed_file.display(),
                    "seeded domain registry from bundled list"
                );
                seeded
            }
            None => BTreeSet::new(),
        };

        Ok(Self {
            domains: RwLock::new(domains),
            store,
        })
    }

    pub async fn contains(&self, domain: &str) -> bool {
        self.domains.read().await.contains(domain)
    }

    /// All members in lexicographic order.
    pub async fn list(&self) -> Vec<String> {
        self.domains.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.domains.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.domains.read().await.is_empty()
    }

    /// Add the normalized candidates, persist, and return only the domains
    /// that were actually new. An empty result is a no-op, not an error.
    pub async fn add<I, S>(&self, candidates: I) -> Result<BTreeSet<String>, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested = normalize(candidates);
        let mut guard = self.domains.write().await;

        let added: BTreeSet<String> = requested.difference(&guard).cloned().collect();
        let mut next = guard.clone();
        next.extend(requested);
        self.store.save(&next)?;
        *guard = next;
        Ok(added)
    }

    /// Remove the normalized candidates and return the intersection that
    /// was actually present. Persists only when something was removed.
    pub async fn remove<I, S>(&self, candidates: I) -> Result<BTreeSet<String>, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested = normalize(candidates);
        let mut guard = self.domains.write().await;

        let removed: BTreeSet<String> = requested.intersection(&guard).cloned().collect();
        if removed.is_empty() {
            return Ok(removed);
        }

        let next: BTreeSet<String> = guard.difference(&requested).cloned().collect();
        self.store.save(&next)?;
        *guard = next;
        Ok(removed)
    }
}

/// Trim, lowercase, drop empties. Applied once at the mutation boundary;
/// stored domains are always already normalized.
fn normalize<I, S>(candidates: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .map(|candidate| candidate.as_ref().trim().to_lowercase())
        .filter(|candidate| !candidate.is_empty())
        .collect()
}

fn load_seed(path: &Path) -> Result<BTreeSet<String>, RegistryError> {
    let raw = fs::read_to_string(path)?;
    Ok(normalize(raw.lines()))
}
