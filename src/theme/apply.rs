//! Turning a resolved theme into changes on the document root.
//!
//! [`plan_application`] only computes the diff; a [`StyleTarget`] performs it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::record::{ColorMode, ThemeRecord};

/// What is currently on the root element because of a theme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedTheme {
    pub slug: Option<String>,
    pub class: Option<String>,
    pub properties: BTreeMap<String, String>,
}

/// Changes needed to go from one applied theme to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemePatch {
    pub class_to_remove: Option<String>,
    pub class_to_add: Option<String>,
    pub properties_to_set: BTreeMap<String, String>,
    pub properties_to_clear: Vec<String>,
}

impl ThemePatch {
    pub fn is_empty(&self) -> bool {
        self.class_to_remove.is_none()
            && self.class_to_add.is_none()
            && self.properties_to_set.is_empty()
            && self.properties_to_clear.is_empty()
    }

    pub fn apply_to<T: StyleTarget + ?Sized>(&self, target: &mut T) {
        if let Some(class) = &self.class_to_remove {
            target.remove_class(class);
        }
        for name in &self.properties_to_clear {
            target.remove_property(name);
        }
        if let Some(class) = &self.class_to_add {
            target.add_class(class);
        }
        for (name, value) in &self.properties_to_set {
            target.set_property(name, value);
        }
    }
}

/// `accent` and `--accent` both address the `--accent` custom property.
pub fn normalize_property(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        name.to_string()
    } else {
        format!("--{}", name)
    }
}

/// Variables a theme contributes for `color_mode`, names normalized.
pub fn theme_properties(theme: &ThemeRecord, color_mode: ColorMode) -> BTreeMap<String, String> {
    theme
        .css_variables
        .for_mode(color_mode)
        .iter()
        .map(|(name, value)| (normalize_property(name), value.clone()))
        .collect()
}

/// Compute the patch from `previous` to `theme`, and the resulting applied state.
pub fn plan_application(
    previous: Option<&AppliedTheme>,
    theme: Option<&ThemeRecord>,
    color_mode: ColorMode,
) -> (ThemePatch, AppliedTheme) {
    let empty = AppliedTheme::default();
    let previous = previous.unwrap_or(&empty);

    let next = match theme {
        Some(theme) => AppliedTheme {
            slug: Some(theme.slug.clone()),
            class: Some(theme.css_class()),
            properties: theme_properties(theme, color_mode),
        },
        None => AppliedTheme::default(),
    };

    let mut patch = ThemePatch::default();
    if previous.class != next.class {
        patch.class_to_remove = previous.class.clone();
        patch.class_to_add = next.class.clone();
    }

    patch.properties_to_clear = previous
        .properties
        .keys()
        .filter(|name| !next.properties.contains_key(*name))
        .cloned()
        .collect();

    patch.properties_to_set = next
        .properties
        .iter()
        .filter(|(name, value)| previous.properties.get(*name) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    (patch, next)
}

/// The document root, or anything standing in for it.
pub trait StyleTarget {
    fn add_class(&mut self, class: &str);
    fn remove_class(&mut self, class: &str);
    fn set_property(&mut self, name: &str, value: &str);
    fn remove_property(&mut self, name: &str);
}

/// In-memory root element. Renders to an inline style or a `:root` block
/// for server-rendered first paint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootStyle {
    pub classes: BTreeSet<String>,
    pub properties: BTreeMap<String, String>,
}

impl RootStyle {
    pub fn inline_style(&self) -> String {
        self.properties
            .iter()
            .map(|(name, value)| format!("{}: {};", name, value))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn class_attr(&self) -> String {
        self.classes.iter().cloned().collect::<Vec<_>>().join(" ")
    }

    pub fn to_css(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in &self.properties {
            css.push_str(&format!("  {}: {};\n", name, value));
        }
        css.push('}');
        css
    }
}

impl StyleTarget for RootStyle {
    fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }

    fn set_property(&mut self, name: &str, value: &str) {
        self.properties.insert(name.to_string(), value.to_string());
    }

    fn remove_property(&mut self, name: &str) {
        self.properties.remove(name);
    }
}

/// A style target plus the theme keys currently applied to it.
#[derive(Debug, Default)]
pub struct ThemeHost<T> {
    target: T,
    applied: AppliedTheme,
}

impl<T: StyleTarget> ThemeHost<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            applied: AppliedTheme::default(),
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn applied(&self) -> &AppliedTheme {
        &self.applied
    }

    /// Bring the target in line with `theme`. Returns the patch that was applied.
    pub fn sync(&mut self, theme: Option<&ThemeRecord>, color_mode: ColorMode) -> ThemePatch {
        let (patch, next) = plan_application(Some(&self.applied), theme, color_mode);
        patch.apply_to(&mut self.target);
        self.applied = next;
        patch
    }

    /// Apply a previously persisted snapshot, e.g. before network data arrives.
    pub fn restore(&mut self, snapshot: AppliedTheme) {
        let (patch, _) = plan_application(Some(&self.applied), None, ColorMode::Light);
        patch.apply_to(&mut self.target);

        let mut restore = ThemePatch {
            class_to_add: snapshot.class.clone(),
            ..ThemePatch::default()
        };
        restore.properties_to_set = snapshot.properties.clone();
        restore.apply_to(&mut self.target);
        self.applied = snapshot;
    }
}
