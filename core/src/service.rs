use std::collections::HashMap;

use tracing::{debug, info};

use crate::view::{EditableForm, FieldGroup, SelectOption, SettingsView};
use crate::{
    resolve, CoreError, Domain, DomainDirectory, DomainId, GlobalThemeDefaults, SettingsBatch,
    SettingsStore, ThemeAssignment, ThemeDefaults, ThemeDirectory, ThemeId, ThemeSlot,
};

/// Submitted form values keyed by `<domainId>_site` / `<domainId>_admin`.
pub type FormValues = HashMap<String, String>;

/// What a submit wrote to the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Domains whose two keys were written.
    pub domains_written: usize,
    /// Keys cleared because no value was submitted for them.
    pub keys_cleared: usize,
}

/// Application service building the settings form and saving its submissions.
///
/// It is generic over the settings store, both directories, and the source of
/// global defaults. Every call re-reads its inputs; nothing is cached between
/// calls, so concurrent saves are last-writer-wins.
pub struct ThemeSwitchService<S, D, T, G>
where
    S: SettingsStore,
    D: DomainDirectory,
    T: ThemeDirectory,
    G: GlobalThemeDefaults,
{
    store: S,
    domains: D,
    themes: T,
    defaults: G,
}

impl<S, D, T, G> ThemeSwitchService<S, D, T, G>
where
    S: SettingsStore,
    D: DomainDirectory,
    T: ThemeDirectory,
    G: GlobalThemeDefaults,
{
    pub fn new(store: S, domains: D, themes: T, defaults: G) -> Self {
        Self {
            store,
            domains,
            themes,
            defaults,
        }
    }

    fn load_defaults(&self) -> Result<ThemeDefaults, CoreError> {
        Ok(ThemeDefaults {
            site: self.defaults.default_site_theme()?,
            admin: self.defaults.default_admin_theme()?,
        })
    }

    fn resolved(
        &self,
        domain: &DomainId,
        slot: ThemeSlot,
        defaults: &ThemeDefaults,
    ) -> Result<ThemeId, CoreError> {
        let stored = self.store.get(&slot.key_for(domain))?.map(ThemeId::new);
        Ok(resolve(stored, defaults.for_slot(slot).clone()))
    }

    fn assignment(
        &self,
        domain: &DomainId,
        defaults: &ThemeDefaults,
    ) -> Result<ThemeAssignment, CoreError> {
        Ok(ThemeAssignment {
            domain_id: domain.clone(),
            site_theme_id: self.resolved(domain, ThemeSlot::Site, defaults)?,
            admin_theme_id: self.resolved(domain, ThemeSlot::Admin, defaults)?,
        })
    }

    /// Build the settings form: one group per domain, preselected with the
    /// stored theme or the global default.
    pub fn render(&self) -> Result<SettingsView, CoreError> {
        let domains = self.domains.list_all()?;
        if domains.is_empty() {
            debug!("no domains configured; rendering empty notice");
            return Ok(SettingsView::empty());
        }

        let options: Vec<SelectOption> = self
            .themes
            .list_installed()?
            .iter()
            .map(SelectOption::from)
            .collect();
        let defaults = self.load_defaults()?;

        let mut groups = Vec::with_capacity(domains.len());
        for Domain { id, hostname } in &domains {
            let assignment = self.assignment(id, &defaults)?;
            groups.push(FieldGroup::new(
                id,
                hostname,
                &options,
                assignment.site_theme_id,
                assignment.admin_theme_id,
            ));
        }
        debug!(
            domains = groups.len(),
            themes = options.len(),
            "rendered theme switch form"
        );
        Ok(SettingsView::Editable(EditableForm::new(groups)))
    }

    /// Write both theme keys of every current domain from the submitted
    /// values and persist them in one save.
    ///
    /// Values are not validated. A missing value clears the stored override so
    /// the domain falls back to the global default. With no domains nothing is
    /// saved.
    pub fn submit(&self, values: &FormValues) -> Result<SubmitOutcome, CoreError> {
        let domains = self.domains.list_all()?;
        if domains.is_empty() {
            debug!("submit with no domains configured; nothing to save");
            return Ok(SubmitOutcome::default());
        }

        let mut batch = SettingsBatch::new();
        let mut outcome = SubmitOutcome::default();
        for domain in &domains {
            for slot in ThemeSlot::ALL {
                let key = slot.key_for(&domain.id);
                match values.get(&key) {
                    Some(theme) => batch.set(key, theme.as_str()),
                    None => {
                        outcome.keys_cleared += 1;
                        batch.clear(key);
                    }
                }
            }
            outcome.domains_written += 1;
        }

        self.store.save(&batch)?;
        info!(
            domains = outcome.domains_written,
            cleared = outcome.keys_cleared,
            "saved domain theme assignments"
        );
        Ok(outcome)
    }

    /// Resolved assignments for every current domain, in directory order.
    pub fn assignments(&self) -> Result<Vec<ThemeAssignment>, CoreError> {
        let domains = self.domains.list_all()?;
        if domains.is_empty() {
            return Ok(Vec::new());
        }
        let defaults = self.load_defaults()?;
        domains
            .iter()
            .map(|d| self.assignment(&d.id, &defaults))
            .collect()
    }

    /// Resolved assignment for one domain, if it is currently configured.
    pub fn assignment_for(&self, id: &DomainId) -> Result<Option<ThemeAssignment>, CoreError> {
        let known = self.domains.list_all()?.iter().any(|d| &d.id == id);
        if !known {
            return Ok(None);
        }
        let defaults = self.load_defaults()?;
        self.assignment(id, &defaults).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryDomainDirectory, InMemorySettingsStore, InMemoryThemeDirectory,
    };
    use crate::{Theme, ThemeDefaults};
    use std::sync::Arc;

    type TestService = ThemeSwitchService<
        Arc<InMemorySettingsStore>,
        Arc<InMemoryDomainDirectory>,
        Arc<InMemoryThemeDirectory>,
        ThemeDefaults,
    >;

    struct Fixture {
        store: Arc<InMemorySettingsStore>,
        domains: Arc<InMemoryDomainDirectory>,
        themes: Arc<InMemoryThemeDirectory>,
        svc: TestService,
    }

    fn domain(id: &str, hostname: &str) -> Domain {
        Domain::new(DomainId::new(id).unwrap(), hostname)
    }

    fn fixture(domains: Vec<Domain>) -> Fixture {
        let store = Arc::new(InMemorySettingsStore::new());
        let dir = Arc::new(InMemoryDomainDirectory::with_domains(domains));
        let themes = Arc::new(InMemoryThemeDirectory::with_themes(vec![
            Theme::new("bartik", "Bartik"),
            Theme::new("stark", "Stark"),
        ]));
        let svc = ThemeSwitchService::new(
            store.clone(),
            dir.clone(),
            themes.clone(),
            ThemeDefaults::new("stark", "stark"),
        );
        Fixture {
            store,
            domains: dir,
            themes,
            svc,
        }
    }

    fn values(pairs: &[(&str, &str)]) -> FormValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn selected(view: &SettingsView) -> Vec<(String, String)> {
        view.groups()
            .iter()
            .flat_map(|g| g.fields())
            .map(|f| (f.name.clone(), f.default_value.as_str().to_string()))
            .collect()
    }

    #[test]
    fn render_without_domains_is_empty_notice() {
        let fx = fixture(Vec::new());
        let view = fx.svc.render().unwrap();
        assert!(view.is_empty());
        assert!(view.groups().is_empty());
    }

    #[test]
    fn render_emits_one_group_per_domain_in_directory_order() {
        let fx = fixture(vec![
            domain("zeta", "zeta.example"),
            domain("alpha", "alpha.example"),
            domain("mid", "mid.example"),
        ]);
        let view = fx.svc.render().unwrap();
        let ids: Vec<&str> = view.groups().iter().map(|g| g.domain_id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
        for group in view.groups() {
            assert_eq!(group.fields().len(), 2);
            assert_eq!(group.site.options.len(), 2);
        }
    }

    #[test]
    fn render_example_domain_with_defaults() {
        let fx = fixture(vec![domain("example_com", "example.com")]);
        let view = fx.svc.render().unwrap();
        let groups = view.groups();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].title.contains("example.com"));
        assert_eq!(groups[0].site.default_value.as_str(), "stark");
        assert_eq!(groups[0].admin.default_value.as_str(), "stark");
    }

    #[test]
    fn stored_value_wins_over_default() {
        let fx = fixture(vec![domain("example_com", "example.com")]);
        fx.store.insert("example_com_site", "bartik");
        let view = fx.svc.render().unwrap();
        assert_eq!(view.groups()[0].site.default_value.as_str(), "bartik");
        assert_eq!(view.groups()[0].admin.default_value.as_str(), "stark");
    }

    #[test]
    fn submit_then_render_round_trips() {
        let fx = fixture(vec![domain("example_com", "example.com")]);
        let submitted = values(&[("example_com_site", "bartik"), ("example_com_admin", "stark")]);
        let outcome = fx.svc.submit(&submitted).unwrap();
        assert_eq!(outcome.domains_written, 1);
        assert_eq!(outcome.keys_cleared, 0);

        assert_eq!(fx.store.value("example_com_site").as_deref(), Some("bartik"));
        assert_eq!(fx.store.value("example_com_admin").as_deref(), Some("stark"));

        let view = fx.svc.render().unwrap();
        assert_eq!(
            selected(&view),
            vec![
                ("example_com_site".to_string(), "bartik".to_string()),
                ("example_com_admin".to_string(), "stark".to_string()),
            ]
        );
    }

    #[test]
    fn submitting_twice_matches_submitting_once() {
        let fx = fixture(vec![domain("a", "a.example"), domain("b", "b.example")]);
        let submitted = values(&[
            ("a_site", "bartik"),
            ("a_admin", "stark"),
            ("b_site", "stark"),
            ("b_admin", "bartik"),
        ]);
        fx.svc.submit(&submitted).unwrap();
        let once = fx.store.snapshot();
        fx.svc.submit(&submitted).unwrap();
        assert_eq!(fx.store.snapshot(), once);
        assert_eq!(fx.store.save_count(), 2);
    }

    #[test]
    fn submit_without_domains_does_not_touch_store() {
        let fx = fixture(Vec::new());
        let outcome = fx
            .svc
            .submit(&values(&[("example_com_site", "bartik")]))
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::default());
        assert!(fx.store.snapshot().is_empty());
        assert_eq!(fx.store.save_count(), 0);
    }

    #[test]
    fn missing_value_clears_override_and_falls_back() {
        let fx = fixture(vec![domain("example_com", "example.com")]);
        fx.store.insert("example_com_admin", "bartik");
        let outcome = fx
            .svc
            .submit(&values(&[("example_com_site", "bartik")]))
            .unwrap();
        assert_eq!(outcome.keys_cleared, 1);
        assert_eq!(fx.store.value("example_com_admin"), None);

        let view = fx.svc.render().unwrap();
        assert_eq!(view.groups()[0].admin.default_value.as_str(), "stark");
    }

    #[test]
    fn unknown_theme_is_stored_verbatim() {
        let fx = fixture(vec![domain("example_com", "example.com")]);
        fx.svc
            .submit(&values(&[("example_com_site", "no_such_theme"), ("example_com_admin", "")]))
            .unwrap();
        assert_eq!(
            fx.store.value("example_com_site").as_deref(),
            Some("no_such_theme")
        );
        assert_eq!(fx.store.value("example_com_admin").as_deref(), Some(""));

        let view = fx.svc.render().unwrap();
        assert!(!view.groups()[0].site.default_is_offered());
    }

    #[test]
    fn submit_uses_directory_snapshot_at_submit_time() {
        let fx = fixture(vec![domain("old", "old.example")]);
        let _ = fx.svc.render().unwrap();
        fx.domains.remove(&DomainId::new("old").unwrap());
        fx.domains.push(domain("new", "new.example"));

        fx.svc
            .submit(&values(&[
                ("old_site", "bartik"),
                ("old_admin", "bartik"),
                ("new_site", "bartik"),
                ("new_admin", "stark"),
            ]))
            .unwrap();
        assert_eq!(fx.store.value("old_site"), None);
        assert_eq!(fx.store.value("new_site").as_deref(), Some("bartik"));
    }

    #[test]
    fn stale_keys_survive_and_stay_hidden() {
        let fx = fixture(vec![domain("live", "live.example")]);
        fx.store.insert("gone_site", "bartik");
        fx.svc
            .submit(&values(&[("live_site", "stark"), ("live_admin", "stark")]))
            .unwrap();
        assert_eq!(fx.store.value("gone_site").as_deref(), Some("bartik"));
        let assignments = fx.svc.assignments().unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].domain_id.as_str(), "live");
    }

    #[test]
    fn assignment_for_resolves_known_domains_only() {
        let fx = fixture(vec![domain("example_com", "example.com")]);
        fx.store.insert("example_com_site", "bartik");
        let got = fx
            .svc
            .assignment_for(&DomainId::new("example_com").unwrap())
            .unwrap()
            .expect("known domain");
        assert_eq!(got.site_theme_id.as_str(), "bartik");
        assert_eq!(got.admin_theme_id.as_str(), "stark");

        let missing = fx
            .svc
            .assignment_for(&DomainId::new("other").unwrap())
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn store_failures_propagate() {
        let fx = fixture(vec![domain("example_com", "example.com")]);
        fx.store.fail_next("disk full");
        let err = fx
            .svc
            .submit(&values(&[("example_com_site", "bartik")]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Store(_)));
        assert!(fx.store.snapshot().is_empty());

        fx.store.fail_next("unreadable");
        assert!(matches!(fx.svc.render(), Err(CoreError::Store(_))));
    }

    #[test]
    fn directory_failures_propagate_without_saving() {
        let fx = fixture(vec![domain("example_com", "example.com")]);
        let submitted = values(&[("example_com_site", "bartik"), ("example_com_admin", "stark")]);

        fx.domains.fail_next("domain storage offline");
        assert!(matches!(fx.svc.render(), Err(CoreError::Directory(_))));

        fx.domains.fail_next("domain storage offline");
        assert!(matches!(
            fx.svc.submit(&submitted),
            Err(CoreError::Directory(_))
        ));
        assert_eq!(fx.store.save_count(), 0);
        assert!(fx.store.snapshot().is_empty());

        fx.themes.fail_next("theme registry offline");
        assert!(matches!(fx.svc.render(), Err(CoreError::Directory(_))));

        fx.domains.fail_next("domain storage offline");
        assert!(matches!(fx.svc.assignments(), Err(CoreError::Directory(_))));

        fx.domains.fail_next("domain storage offline");
        assert!(matches!(
            fx.svc.assignment_for(&DomainId::new("example_com").unwrap()),
            Err(CoreError::Directory(_))
        ));

        // Failures are one-shot; the next render succeeds.
        assert_eq!(fx.svc.render().unwrap().groups().len(), 1);
    }
}
