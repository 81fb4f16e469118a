//! Typed description of the settings form, independent of how it is drawn.

use serde::Serialize;

use crate::{DomainId, Theme, ThemeId, ThemeSlot};

/// Form id of the editable settings form.
pub const FORM_ID: &str = "domain_theme_switch_config_form";
/// Permissions screen, anchored at this module's section.
pub const PERMISSIONS_PATH: &str = "/admin/people/permissions#module-domain_theme_switch";
/// Domain listing screen where new domains are created.
pub const DOMAIN_ADMIN_PATH: &str = "/admin/config/domain";
/// Status message shown after a successful save.
pub const SAVED_MESSAGE: &str = "The configuration options have been saved.";

/// Rendered settings form: either the empty notice or one group per domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SettingsView {
    /// No domains exist; nothing can be edited or submitted.
    Empty { message: Markup },
    Editable(EditableForm),
}

impl SettingsView {
    pub(crate) fn empty() -> Self {
        SettingsView::Empty {
            message: Markup {
                text: "Zero domain records found. Please @link to create the domain.".into(),
                link: Link::new("click here", DOMAIN_ADMIN_PATH),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SettingsView::Empty { .. })
    }

    pub fn groups(&self) -> &[FieldGroup] {
        match self {
            SettingsView::Empty { .. } => &[],
            SettingsView::Editable(form) => &form.groups,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EditableForm {
    pub form_id: &'static str,
    pub groups: Vec<FieldGroup>,
    pub submit_label: &'static str,
}

impl EditableForm {
    pub(crate) fn new(groups: Vec<FieldGroup>) -> Self {
        Self {
            form_id: FORM_ID,
            groups,
            submit_label: "Save configuration",
        }
    }
}

/// Fieldset for one domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldGroup {
    pub domain_id: DomainId,
    pub title: String,
    pub site: SelectField,
    pub admin: SelectField,
}

impl FieldGroup {
    pub(crate) fn new(
        domain_id: &DomainId,
        hostname: &str,
        options: &[SelectOption],
        site: ThemeId,
        admin: ThemeId,
    ) -> Self {
        let admin_hint = Markup {
            text: "Change permission to allow domain admin theme @link.".into(),
            link: Link::new("change permission", PERMISSIONS_PATH),
        };
        Self {
            domain_id: domain_id.clone(),
            title: format!("Select Theme for \"{}\"", hostname),
            site: SelectField::new(
                domain_id,
                ThemeSlot::Site,
                "Site theme for domain",
                options,
                site,
                None,
            ),
            admin: SelectField::new(
                domain_id,
                ThemeSlot::Admin,
                "Admin theme for domain",
                options,
                admin,
                Some(admin_hint),
            ),
        }
    }

    pub fn fields(&self) -> [&SelectField; 2] {
        [&self.site, &self.admin]
    }
}

/// Dropdown of installed themes with a preselected value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectField {
    /// Submitted value key, `<domainId>_site` or `<domainId>_admin`.
    pub name: String,
    pub title: &'static str,
    pub options: Vec<SelectOption>,
    /// May name a theme missing from `options` (stale or uninstalled).
    pub default_value: ThemeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<Markup>,
}

impl SelectField {
    fn new(
        domain_id: &DomainId,
        slot: ThemeSlot,
        title: &'static str,
        options: &[SelectOption],
        default_value: ThemeId,
        suffix: Option<Markup>,
    ) -> Self {
        Self {
            name: slot.key_for(domain_id),
            title,
            options: options.to_vec(),
            default_value,
            suffix,
        }
    }

    /// Whether the preselected theme is one of the offered options.
    pub fn default_is_offered(&self) -> bool {
        self.options.iter().any(|o| o.value == self.default_value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: ThemeId,
    pub label: String,
}

impl From<&Theme> for SelectOption {
    fn from(theme: &Theme) -> Self {
        Self {
            value: theme.id.clone(),
            label: theme.display_name.clone(),
        }
    }
}

/// Static text with one embedded hyperlink; `@link` marks its position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Markup {
    pub text: String,
    pub link: Link,
}

impl Markup {
    /// Text with the link substituted as an HTML anchor.
    pub fn to_html(&self) -> String {
        let anchor = format!("<a href=\"{}\">{}</a>", self.link.href, self.link.text);
        self.text.replace("@link", &anchor)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Link {
    pub text: String,
    pub href: String,
}

impl Link {
    fn new(text: &str, href: &str) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }
}
