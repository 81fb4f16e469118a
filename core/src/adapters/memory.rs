use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{
    CoreError, Domain, DomainDirectory, DomainId, SettingsBatch, SettingsStore, Theme,
    ThemeDirectory,
};

/// Simple in-memory settings store. Saves apply under one lock, so a batch is
/// never observed half-written.
pub struct InMemorySettingsStore {
    inner: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    values: BTreeMap<String, String>,
    saves: usize,
    fail_next: Option<String>,
}

/// In-memory domain directory; order is insertion order.
pub struct InMemoryDomainDirectory {
    inner: Mutex<DirectoryState<Domain>>,
}

/// In-memory theme directory; order is insertion order.
pub struct InMemoryThemeDirectory {
    inner: Mutex<DirectoryState<Theme>>,
}

struct DirectoryState<T> {
    items: Vec<T>,
    fail_next: Option<String>,
}

impl<T: Clone> DirectoryState<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            items,
            fail_next: None,
        }
    }

    fn list(&mut self) -> Result<Vec<T>, CoreError> {
        match self.fail_next.take() {
            Some(msg) => Err(CoreError::Directory(msg)),
            None => Ok(self.items.clone()),
        }
    }
}

fn directory_poisoned(_: impl std::fmt::Debug) -> CoreError {
    CoreError::Directory("mutex poisoned".into())
}

fn poisoned(_: impl std::fmt::Debug) -> CoreError {
    CoreError::Store("mutex poisoned".into())
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreState::default()),
        }
    }

    /// Seed a value directly, bypassing `save`.
    pub fn insert<K: Into<String>, V: Into<String>>(&self, key: K, value: V) {
        if let Ok(mut state) = self.inner.lock() {
            state.values.insert(key.into(), value.into());
        }
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .ok()
            .and_then(|state| state.values.get(key).cloned())
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner
            .lock()
            .map(|state| state.values.clone())
            .unwrap_or_default()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.inner.lock().map(|state| state.saves).unwrap_or(0)
    }

    /// Make the next `get` or `save` fail with the given message.
    pub fn fail_next<S: Into<String>>(&self, msg: S) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail_next = Some(msg.into());
        }
    }
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let mut state = self.inner.lock().map_err(poisoned)?;
        if let Some(msg) = state.fail_next.take() {
            return Err(CoreError::Store(msg));
        }
        Ok(state.values.get(key).cloned())
    }

    fn save(&self, batch: &SettingsBatch) -> Result<(), CoreError> {
        let mut state = self.inner.lock().map_err(poisoned)?;
        if let Some(msg) = state.fail_next.take() {
            return Err(CoreError::Store(msg));
        }
        for (key, value) in batch.entries() {
            match value {
                Some(v) => {
                    state.values.insert(key.clone(), v.clone());
                }
                None => {
                    state.values.remove(key);
                }
            }
        }
        state.saves += 1;
        Ok(())
    }
}

impl InMemoryDomainDirectory {
    pub fn new() -> Self {
        Self::with_domains(Vec::new())
    }

    pub fn with_domains(domains: Vec<Domain>) -> Self {
        Self {
            inner: Mutex::new(DirectoryState::new(domains)),
        }
    }

    /// Add a domain, replacing any existing one with the same id in place.
    pub fn push(&self, domain: Domain) {
        if let Ok(mut state) = self.inner.lock() {
            match state.items.iter_mut().find(|d| d.id == domain.id) {
                Some(existing) => *existing = domain,
                None => state.items.push(domain),
            }
        }
    }

    pub fn remove(&self, id: &DomainId) {
        if let Ok(mut state) = self.inner.lock() {
            state.items.retain(|d| &d.id != id);
        }
    }

    /// Make the next `list_all` fail with the given message.
    pub fn fail_next<S: Into<String>>(&self, msg: S) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail_next = Some(msg.into());
        }
    }
}

impl Default for InMemoryDomainDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainDirectory for InMemoryDomainDirectory {
    fn list_all(&self) -> Result<Vec<Domain>, CoreError> {
        self.inner.lock().map_err(directory_poisoned)?.list()
    }
}

impl InMemoryThemeDirectory {
    pub fn with_themes(themes: Vec<Theme>) -> Self {
        Self {
            inner: Mutex::new(DirectoryState::new(themes)),
        }
    }

    /// Make the next `list_installed` fail with the given message.
    pub fn fail_next<S: Into<String>>(&self, msg: S) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail_next = Some(msg.into());
        }
    }
}

impl Default for InMemoryThemeDirectory {
    fn default() -> Self {
        Self::with_themes(Vec::new())
    }
}

impl ThemeDirectory for InMemoryThemeDirectory {
    fn list_installed(&self) -> Result<Vec<Theme>, CoreError> {
        self.inner.lock().map_err(directory_poisoned)?.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_applies_sets_and_clears() {
        let store = InMemorySettingsStore::new();
        store.insert("a_admin", "seven");
        let mut batch = SettingsBatch::new();
        batch.set("a_site", "bartik");
        batch.clear("a_admin");
        store.save(&batch).unwrap();

        assert_eq!(store.get("a_site").unwrap().as_deref(), Some("bartik"));
        assert_eq!(store.get("a_admin").unwrap(), None);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn failed_save_leaves_values_untouched() {
        let store = InMemorySettingsStore::new();
        store.insert("a_site", "stark");
        store.fail_next("boom");
        let mut batch = SettingsBatch::new();
        batch.set("a_site", "bartik");
        assert!(matches!(store.save(&batch), Err(CoreError::Store(_))));
        assert_eq!(store.value("a_site").as_deref(), Some("stark"));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn domain_directory_keeps_insertion_order() {
        let dir = InMemoryDomainDirectory::new();
        dir.push(Domain::new(DomainId::new("b").unwrap(), "b.example"));
        dir.push(Domain::new(DomainId::new("a").unwrap(), "a.example"));
        dir.push(Domain::new(DomainId::new("b").unwrap(), "b2.example"));
        let listed = dir.list_all().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].hostname, "b2.example");
        assert_eq!(listed[1].id.as_str(), "a");

        dir.remove(&DomainId::new("b").unwrap());
        assert_eq!(dir.list_all().unwrap().len(), 1);
    }

    #[test]
    fn directories_fail_once_when_asked() {
        let domains = InMemoryDomainDirectory::with_domains(vec![Domain::new(
            DomainId::new("a").unwrap(),
            "a.example",
        )]);
        domains.fail_next("ldap down");
        assert!(matches!(domains.list_all(), Err(CoreError::Directory(_))));
        assert_eq!(domains.list_all().unwrap().len(), 1);

        let themes = InMemoryThemeDirectory::with_themes(vec![Theme::new("stark", "Stark")]);
        themes.fail_next("theme registry unavailable");
        assert!(matches!(
            themes.list_installed(),
            Err(CoreError::Directory(_))
        ));
        assert_eq!(themes.list_installed().unwrap().len(), 1);
    }
}
