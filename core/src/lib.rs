//! Core library for per-domain theme switching.
//!
//! Holds the domain types, ports (traits), and error definitions used to map
//! each configured domain to a site theme and an admin theme. Adapters and IO
//! concerns live in other crates; the in-memory adapters here exist for tests
//! and the demo binary.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::Serialize;

/// Configuration name the per-domain assignments are stored under.
pub const SETTINGS_NAME: &str = "domain_theme_switch.settings";

/// Stable machine name of a configured domain (e.g. `example_com`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.is_empty() {
            return Err(CoreError::InvalidDomainId("empty".into()));
        }
        if !val
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CoreError::InvalidDomainId(format!(
                "invalid characters in '{}'",
                val
            )));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DomainId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an installed theme. Not validated: submitted values are
/// stored verbatim, including ids of themes that no longer exist.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ThemeId(String);

impl ThemeId {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ThemeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A configured domain as listed by the domain directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Domain {
    pub id: DomainId,
    /// Human-readable label, usually the hostname.
    pub hostname: String,
}

impl Domain {
    pub fn new<S: Into<String>>(id: DomainId, hostname: S) -> Self {
        Self {
            id,
            hostname: hostname.into(),
        }
    }
}

/// An installed theme as listed by the theme directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    pub id: ThemeId,
    pub display_name: String,
}

impl Theme {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, display_name: N) -> Self {
        Self {
            id: ThemeId::new(id),
            display_name: display_name.into(),
        }
    }
}

/// Which of the two per-domain themes a setting refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThemeSlot {
    /// Front-end theme.
    Site,
    /// Administration theme.
    Admin,
}

impl ThemeSlot {
    pub const ALL: [ThemeSlot; 2] = [ThemeSlot::Site, ThemeSlot::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeSlot::Site => "site",
            ThemeSlot::Admin => "admin",
        }
    }

    /// Settings key for this slot of the given domain: `<domainId>_site` or
    /// `<domainId>_admin`.
    pub fn key_for(&self, domain: &DomainId) -> String {
        format!("{}_{}", domain.as_str(), self.as_str())
    }
}

/// Resolved theme pair for one domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThemeAssignment {
    pub domain_id: DomainId,
    pub site_theme_id: ThemeId,
    pub admin_theme_id: ThemeId,
}

/// Process-wide fallback themes (the host's `system.theme` default/admin).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThemeDefaults {
    pub site: ThemeId,
    pub admin: ThemeId,
}

impl ThemeDefaults {
    pub fn new<S: Into<String>, A: Into<String>>(site: S, admin: A) -> Self {
        Self {
            site: ThemeId::new(site),
            admin: ThemeId::new(admin),
        }
    }

    pub fn for_slot(&self, slot: ThemeSlot) -> &ThemeId {
        match slot {
            ThemeSlot::Site => &self.site,
            ThemeSlot::Admin => &self.admin,
        }
    }
}

/// Stored value if present, otherwise the default.
pub fn resolve<T>(stored: Option<T>, default: T) -> T {
    stored.unwrap_or(default)
}

/// Pending writes applied by a single [`SettingsStore::save`].
///
/// `None` values clear the key so later reads fall back to the default.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsBatch {
    entries: Vec<(String, Option<String>)>,
}

impl SettingsBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.entries.push((key.into(), Some(value.into())));
    }

    pub fn clear<K: Into<String>>(&mut self, key: K) {
        self.entries.push((key.into(), None));
    }

    pub fn entries(&self) -> &[(String, Option<String>)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Settings store port for the `domain_theme_switch.settings` keys.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;
    /// Apply every entry of the batch as one all-or-nothing save.
    fn save(&self, batch: &SettingsBatch) -> Result<(), CoreError>;
}

/// Read-only catalog of configured domains, in the directory's natural order.
pub trait DomainDirectory: Send + Sync {
    fn list_all(&self) -> Result<Vec<Domain>, CoreError>;
}

/// Read-only catalog of installed themes.
pub trait ThemeDirectory: Send + Sync {
    fn list_installed(&self) -> Result<Vec<Theme>, CoreError>;
}

/// Source of the global default site and admin themes.
pub trait GlobalThemeDefaults: Send + Sync {
    fn default_site_theme(&self) -> Result<ThemeId, CoreError>;
    fn default_admin_theme(&self) -> Result<ThemeId, CoreError>;
}

impl GlobalThemeDefaults for ThemeDefaults {
    fn default_site_theme(&self) -> Result<ThemeId, CoreError> {
        Ok(self.site.clone())
    }

    fn default_admin_theme(&self) -> Result<ThemeId, CoreError> {
        Ok(self.admin.clone())
    }
}

macro_rules! forward_ports {
    ($($wrapper:ty),*) => {$(
        impl<T: SettingsStore + ?Sized> SettingsStore for $wrapper {
            fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
                (**self).get(key)
            }
            fn save(&self, batch: &SettingsBatch) -> Result<(), CoreError> {
                (**self).save(batch)
            }
        }

        impl<T: DomainDirectory + ?Sized> DomainDirectory for $wrapper {
            fn list_all(&self) -> Result<Vec<Domain>, CoreError> {
                (**self).list_all()
            }
        }

        impl<T: ThemeDirectory + ?Sized> ThemeDirectory for $wrapper {
            fn list_installed(&self) -> Result<Vec<Theme>, CoreError> {
                (**self).list_installed()
            }
        }

        impl<T: GlobalThemeDefaults + ?Sized> GlobalThemeDefaults for $wrapper {
            fn default_site_theme(&self) -> Result<ThemeId, CoreError> {
                (**self).default_site_theme()
            }
            fn default_admin_theme(&self) -> Result<ThemeId, CoreError> {
                (**self).default_admin_theme()
            }
        }
    )*};
}

forward_ports!(&T, Arc<T>);

/// Core errors (no external error crates to keep deps minimal).
#[derive(Debug)]
pub enum CoreError {
    InvalidDomainId(String),
    /// Reading or saving settings failed.
    Store(String),
    /// Listing domains, themes or global defaults failed.
    Directory(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidDomainId(msg) => write!(f, "invalid domain id: {}", msg),
            CoreError::Store(msg) => write!(f, "settings store error: {}", msg),
            CoreError::Directory(msg) => write!(f, "directory error: {}", msg),
        }
    }
}

impl Error for CoreError {}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - core library loaded", pkg, ver)
}

pub mod adapters;
pub mod service;
pub mod view;
