//! Appearance detection and diagram theme options.

use serde::Serialize;

use crate::page::RootElement;

/// Root class that marks dark mode.
const DARK_CLASS: &str = "dark";

/// Light or dark visual mode of the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    /// Dark mode (root carries the `dark` class).
    Dark,
    /// Anything else.
    Default,
}

impl Appearance {
    /// Derive the appearance from a root element.
    #[must_use]
    pub fn of(root: &RootElement) -> Self {
        if root.has_class(DARK_CLASS) {
            Self::Dark
        } else {
            Self::Default
        }
    }

    /// Diagram library theme name.
    #[must_use]
    pub fn theme(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Default => "default",
        }
    }
}

/// Custom property read for a palette entry, with per-appearance fallbacks.
struct Swatch {
    property: &'static str,
    dark: &'static str,
    light: &'static str,
}

impl Swatch {
    const fn new(property: &'static str, dark: &'static str, light: &'static str) -> Self {
        Self {
            property,
            dark,
            light,
        }
    }

    fn resolve(&self, root: &RootElement, appearance: Appearance) -> String {
        let fallback = match appearance {
            Appearance::Dark => self.dark,
            Appearance::Default => self.light,
        };
        root.property(self.property).unwrap_or(fallback).to_owned()
    }
}

const BG: Swatch = Swatch::new("--mm-bg", "#0b0f14", "#ffffff");
const TEXT: Swatch = Swatch::new("--mm-text", "#e5e7eb", "#1f2937");
const BORDER: Swatch = Swatch::new("--mm-border", "#6b7280", "#9ca3af");
const PRIMARY: Swatch = Swatch::new("--mm-primary", "#60a5fa", "#2563eb");
const SECONDARY: Swatch = Swatch::new("--mm-secondary", "#34d399", "#10b981");
const SURFACE: Swatch = Swatch::new("--mm-surface", "#111827", "#f3f4f6");
const MUTED_TEXT: Swatch = Swatch::new("--mm-muted-text", "#cbd5e1", "#374151");

/// Palette handed to the diagram library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeVariables {
    pub background: String,
    pub text_color: String,
    pub primary_text_color: String,
    pub line_color: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub cluster_bkg: String,
    pub cluster_border: String,
    pub edge_label_background: String,
    pub label_text_color: String,
    pub title_color: String,
}

impl ThemeVariables {
    /// Read the palette from the root's custom properties.
    ///
    /// Unset or blank properties fall back to the built-in colour for
    /// `appearance`.
    #[must_use]
    pub fn resolve(root: &RootElement, appearance: Appearance) -> Self {
        let pick = |swatch: &Swatch| swatch.resolve(root, appearance);
        Self {
            background: pick(&BG),
            text_color: pick(&TEXT),
            primary_text_color: pick(&TEXT),
            line_color: pick(&BORDER),
            primary_color: pick(&PRIMARY),
            secondary_color: pick(&SECONDARY),
            cluster_bkg: pick(&SURFACE),
            cluster_border: pick(&BORDER),
            edge_label_background: pick(&BG),
            label_text_color: pick(&MUTED_TEXT),
            title_color: pick(&TEXT),
        }
    }
}

/// Options passed to the diagram library's `initialize`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOptions {
    /// Always `false`: rendering is driven explicitly.
    pub start_on_load: bool,
    /// Always `"loose"`.
    pub security_level: &'static str,
    /// Theme derived from the appearance.
    pub theme: Appearance,
    /// Palette.
    pub theme_variables: ThemeVariables,
}

impl InitOptions {
    /// Build options for the current state of `root`.
    #[must_use]
    pub fn from_root(root: &RootElement) -> Self {
        let appearance = Appearance::of(root);
        Self {
            start_on_load: false,
            security_level: "loose",
            theme: appearance,
            theme_variables: ThemeVariables::resolve(root, appearance),
        }
    }

    /// Serialize as compact JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        // Only strings and bools; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
