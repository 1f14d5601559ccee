//! Configuration management for shelf.
//!
//! Parses `shelf.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `site.base`
//! - `diagrams.kroki_url`

mod expand;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
    /// Override built site directory watched by the diagram controller.
    pub site_dir: Option<PathBuf>,
    /// Override appearance file.
    pub appearance_file: Option<PathBuf>,
    /// Override theme config output file.
    pub theme_file: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "shelf.toml";

/// Default diagram placeholder selector.
const DEFAULT_SELECTOR: &str = ".mermaid";

/// Default Kroki request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site metadata.
    pub site: SiteConfig,
    /// Top navigation bar.
    pub nav: Vec<NavItem>,
    /// Sidebar definitions (paths are relative strings from TOML).
    #[serde(rename = "sidebar")]
    sidebars: Vec<SidebarConfigRaw>,
    /// Diagram rendering configuration (optional section).
    /// When present, `kroki_url` is required.
    diagrams: Option<DiagramsConfigRaw>,
    /// Output configuration.
    output: OutputConfigRaw,

    /// Resolved sidebars in declaration order (set after loading).
    #[serde(skip)]
    pub sidebars_resolved: Vec<SidebarConfig>,
    /// Resolved diagrams configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Resolved output configuration (set after loading).
    #[serde(skip)]
    pub output_resolved: OutputConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Site metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site title shown in the navigation bar and page titles.
    pub title: String,
    /// Meta description.
    pub description: String,
    /// Document language.
    pub lang: String,
    /// Base URL path the site is deployed under.
    pub base: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Documentation".to_owned(),
            description: String::new(),
            lang: "en-US".to_owned(),
            base: "/".to_owned(),
        }
    }
}

/// Top navigation entry.
///
/// Either a link or a dropdown of nested items, never both.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NavItem {
    /// Label shown in the navigation bar.
    pub text: String,
    /// Link target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Dropdown entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<NavItem>,
    /// Path prefix that marks this entry active.
    #[serde(
        default,
        rename(serialize = "activeMatch"),
        skip_serializing_if = "Option::is_none"
    )]
    pub active_match: Option<String>,
}

/// Raw sidebar definition as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SidebarConfigRaw {
    path: String,
    title: Option<String>,
    outlines: Option<Vec<String>>,
    file: Option<String>,
}

/// Where a sidebar's entries come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarSource {
    /// Outline files transformed into sidebar groups, concatenated in order.
    Outlines(Vec<PathBuf>),
    /// Hand-authored sidebar file, emitted as-is.
    Authored(PathBuf),
}

/// Resolved sidebar definition with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarConfig {
    /// URL path prefix the sidebar applies to (e.g., "/mca/").
    pub path: String,
    /// Title of the collapsed group wrapping the transformed outline.
    pub title: Option<String>,
    /// Entry source.
    pub source: SidebarSource,
}

/// Raw diagrams configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DiagramsConfigRaw {
    kroki_url: Option<String>,
    selector: Option<String>,
    site_dir: Option<String>,
    appearance_file: Option<String>,
    timeout_secs: Option<u64>,
}

/// Resolved diagram controller configuration with absolute paths.
#[derive(Debug)]
pub struct DiagramsConfig {
    /// Kroki server URL for diagram rendering.
    pub kroki_url: Option<String>,
    /// Placeholder selector (class selector, e.g. ".mermaid").
    pub selector: String,
    /// Built site directory holding rendered pages.
    pub site_dir: PathBuf,
    /// File describing the page root element (class list and custom properties).
    pub appearance_file: PathBuf,
    /// HTTP timeout for Kroki requests.
    pub timeout: Duration,
}

impl DiagramsConfig {
    fn with_base(base: &Path) -> Self {
        Self {
            kroki_url: None,
            selector: DEFAULT_SELECTOR.to_owned(),
            site_dir: base.join("docs/.vitepress/dist"),
            appearance_file: base.join("appearance.toml"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self::with_base(Path::new("."))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    theme_file: Option<String>,
}

/// Resolved output configuration.
#[derive(Debug)]
pub struct OutputConfig {
    /// Destination of the generated theme config JSON.
    pub theme_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            theme_file: PathBuf::from("docs/.vitepress/shelf.json"),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.kroki_url`").
        field: String,
        /// Error message (e.g., "${`KROKI_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Class name of a single class selector such as `.mermaid`.
///
/// Returns `None` for anything else, including compound selectors.
#[must_use]
pub fn selector_class(selector: &str) -> Option<&str> {
    selector.strip_prefix('.').filter(|name| {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `shelf.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams_resolved.kroki_url = Some(kroki_url.clone());
        }
        if let Some(site_dir) = &settings.site_dir {
            self.diagrams_resolved.site_dir.clone_from(site_dir);
        }
        if let Some(appearance_file) = &settings.appearance_file {
            self.diagrams_resolved
                .appearance_file
                .clone_from(appearance_file);
        }
        if let Some(theme_file) = &settings.theme_file {
            self.output_resolved.theme_file.clone_from(theme_file);
        }
    }

    /// Look up a resolved sidebar by its URL path prefix.
    #[must_use]
    pub fn sidebar(&self, path: &str) -> Option<&SidebarConfig> {
        self.sidebars_resolved.iter().find(|s| s.path == path)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfig::default(),
            nav: Vec::new(),
            sidebars: Vec::new(),
            diagrams: None,
            output: OutputConfigRaw::default(),
            sidebars_resolved: Vec::new(),
            diagrams_resolved: DiagramsConfig::with_base(base),
            output_resolved: OutputConfig {
                theme_file: base.join("docs/.vitepress/shelf.json"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_site()?;
        validate_nav(&self.nav, "nav")?;
        self.validate_sidebars()?;
        self.validate_diagrams()?;
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.site.title, "site.title")?;
        let base = &self.site.base;
        if !base.starts_with('/') || !base.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "site.base must start and end with '/', got {base:?}"
            )));
        }
        Ok(())
    }

    fn validate_sidebars(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for sidebar in &self.sidebars_resolved {
            if !sidebar.path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "sidebar path must start with '/', got {:?}",
                    sidebar.path
                )));
            }
            if !seen.insert(sidebar.path.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate sidebar path {:?}",
                    sidebar.path
                )));
            }
            if let SidebarSource::Outlines(files) = &sidebar.source
                && files.is_empty()
            {
                return Err(ConfigError::Validation(format!(
                    "sidebar {:?} lists no outline files",
                    sidebar.path
                )));
            }
        }
        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        const MAX_TIMEOUT_SECS: u64 = 300;

        let diagrams = &self.diagrams_resolved;
        if let Some(ref kroki_url) = diagrams.kroki_url {
            require_non_empty(kroki_url, "diagrams.kroki_url")?;
            require_http_url(kroki_url, "diagrams.kroki_url")?;
        }

        if selector_class(&diagrams.selector).is_none() {
            return Err(ConfigError::Validation(format!(
                "diagrams.selector must be a class selector like \".mermaid\", got {:?}",
                diagrams.selector
            )));
        }

        let secs = diagrams.timeout.as_secs();
        if secs == 0 || secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "diagrams.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}"
            )));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.site.base = expand::expand_env(&self.site.base, "site.base")?;

        if let Some(ref mut diagrams) = self.diagrams
            && let Some(ref url) = diagrams.kroki_url
        {
            diagrams.kroki_url = Some(expand::expand_env(url, "diagrams.kroki_url")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    ///
    /// Validates that `kroki_url` is provided when `[diagrams]` section exists
    /// and that every sidebar names exactly one source.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.sidebars_resolved = self
            .sidebars
            .iter()
            .map(|raw| resolve_sidebar(raw, config_dir))
            .collect::<Result<_, _>>()?;

        self.diagrams_resolved = match &self.diagrams {
            Some(diagrams) => {
                let kroki_url = diagrams.kroki_url.clone().ok_or_else(|| {
                    ConfigError::Validation(
                        "[diagrams] section requires kroki_url to be set".to_owned(),
                    )
                })?;
                DiagramsConfig {
                    kroki_url: Some(kroki_url),
                    selector: diagrams
                        .selector
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SELECTOR.to_owned()),
                    site_dir: resolve(diagrams.site_dir.as_deref(), "docs/.vitepress/dist"),
                    appearance_file: resolve(
                        diagrams.appearance_file.as_deref(),
                        "appearance.toml",
                    ),
                    timeout: Duration::from_secs(
                        diagrams.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
                    ),
                }
            }
            None => DiagramsConfig::with_base(config_dir),
        };

        self.output_resolved = OutputConfig {
            theme_file: resolve(
                self.output.theme_file.as_deref(),
                "docs/.vitepress/shelf.json",
            ),
        };

        Ok(())
    }
}

fn resolve_sidebar(raw: &SidebarConfigRaw, config_dir: &Path) -> Result<SidebarConfig, ConfigError> {
    let source = match (&raw.outlines, &raw.file) {
        (Some(outlines), None) => {
            SidebarSource::Outlines(outlines.iter().map(|f| config_dir.join(f)).collect())
        }
        (None, Some(file)) => SidebarSource::Authored(config_dir.join(file)),
        (Some(_), Some(_)) => {
            return Err(ConfigError::Validation(format!(
                "sidebar {:?} sets both outlines and file",
                raw.path
            )));
        }
        (None, None) => {
            return Err(ConfigError::Validation(format!(
                "sidebar {:?} requires either outlines or file",
                raw.path
            )));
        }
    };

    Ok(SidebarConfig {
        path: raw.path.clone(),
        title: raw.title.clone(),
        source,
    })
}

fn validate_nav(items: &[NavItem], field: &str) -> Result<(), ConfigError> {
    for (index, item) in items.iter().enumerate() {
        let here = format!("{field}[{index}]");
        require_non_empty(&item.text, &format!("{here}.text"))?;
        match (&item.link, item.items.is_empty()) {
            (Some(_), true) => {}
            (None, false) => validate_nav(&item.items, &format!("{here}.items"))?,
            (Some(_), false) => {
                return Err(ConfigError::Validation(format!(
                    "{here} sets both link and items"
                )));
            }
            (None, true) => {
                return Err(ConfigError::Validation(format!(
                    "{here} requires either link or items"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(toml: &str) -> Result<Config, ConfigError> {
        let mut config: Config = toml::from_str(toml)?;
        config.expand_env_vars()?;
        config.resolve_paths(Path::new("/project"))?;
        config.validate()?;
        Ok(config)
    }

    fn assert_validation_error(toml: &str, expected_substrings: &[&str]) {
        let err = parse(toml).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "expected validation error, got {err:?}"
        );
        let message = err.to_string();
        for expected in expected_substrings {
            assert!(
                message.contains(expected),
                "{message:?} should contain {expected:?}"
            );
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));

        assert_eq!(config.site.title, "Documentation");
        assert_eq!(config.site.base, "/");
        assert!(config.nav.is_empty());
        assert!(config.sidebars_resolved.is_empty());
        assert!(config.diagrams_resolved.kroki_url.is_none());
        assert_eq!(config.diagrams_resolved.selector, ".mermaid");
        assert_eq!(
            config.diagrams_resolved.site_dir,
            PathBuf::from("/test/docs/.vitepress/dist")
        );
        assert_eq!(
            config.output_resolved.theme_file,
            PathBuf::from("/test/docs/.vitepress/shelf.json")
        );
    }

    #[test]
    fn test_validate_default_config_passes() {
        assert!(Config::default_with_base(Path::new("/test")).validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = parse("").unwrap();
        assert_eq!(config.site, SiteConfig::default());
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_site_config() {
        let config = parse(
            r#"
[site]
title = "Sujith's Library"
description = "Notes"
lang = "en-IN"
base = "/library/"
"#,
        )
        .unwrap();

        assert_eq!(
            config.site,
            SiteConfig {
                title: "Sujith's Library".to_owned(),
                description: "Notes".to_owned(),
                lang: "en-IN".to_owned(),
                base: "/library/".to_owned(),
            }
        );
    }

    #[test]
    fn test_parse_nav_with_dropdown() {
        let config = parse(
            r#"
[[nav]]
text = "MCA"
link = "/mca/"
active_match = "/mca/"

[[nav]]
text = "More"
items = [{ text = "Projects", link = "/projects/" }]
"#,
        )
        .unwrap();

        assert_eq!(config.nav.len(), 2);
        assert_eq!(config.nav[0].active_match.as_deref(), Some("/mca/"));
        assert_eq!(config.nav[1].items[0].text, "Projects");
    }

    #[test]
    fn test_nav_serializes_active_match_in_camel_case() {
        let item = NavItem {
            text: "MCA".to_owned(),
            link: Some("/mca/".to_owned()),
            items: Vec::new(),
            active_match: Some("/mca/".to_owned()),
        };
        let rendered = toml::to_string(&item).unwrap();
        assert!(rendered.contains("activeMatch"));
        assert!(!rendered.contains("items"));
    }

    #[test]
    fn test_nav_item_requires_link_or_items() {
        assert_validation_error(
            r#"
[[nav]]
text = "Empty"
"#,
            &["nav[0]", "either link or items"],
        );
    }

    #[test]
    fn test_nav_item_rejects_link_and_items() {
        assert_validation_error(
            r#"
[[nav]]
text = "Both"
link = "/x/"
items = [{ text = "Y", link = "/y/" }]
"#,
            &["nav[0]", "both link and items"],
        );
    }

    #[test]
    fn test_nested_nav_item_is_validated() {
        assert_validation_error(
            r#"
[[nav]]
text = "More"
items = [{ text = "" , link = "/y/" }]
"#,
            &["nav[0].items[0].text"],
        );
    }

    #[test]
    fn test_resolve_sidebar_sources() {
        let config = parse(
            r#"
[[sidebar]]
path = "/mca/"
title = "MCA Material"
outlines = ["data/cn.yaml", "data/java.yaml"]

[[sidebar]]
path = "/software-modeling/"
file = "data/software-modeling.yaml"
"#,
        )
        .unwrap();

        assert_eq!(
            config.sidebars_resolved,
            vec![
                SidebarConfig {
                    path: "/mca/".to_owned(),
                    title: Some("MCA Material".to_owned()),
                    source: SidebarSource::Outlines(vec![
                        PathBuf::from("/project/data/cn.yaml"),
                        PathBuf::from("/project/data/java.yaml"),
                    ]),
                },
                SidebarConfig {
                    path: "/software-modeling/".to_owned(),
                    title: None,
                    source: SidebarSource::Authored(PathBuf::from(
                        "/project/data/software-modeling.yaml"
                    )),
                },
            ]
        );
        assert!(config.sidebar("/mca/").is_some());
        assert!(config.sidebar("/nope/").is_none());
    }

    #[test]
    fn test_sidebar_requires_a_source() {
        assert_validation_error(
            r#"
[[sidebar]]
path = "/mca/"
"#,
            &["/mca/", "either outlines or file"],
        );
    }

    #[test]
    fn test_sidebar_rejects_two_sources() {
        assert_validation_error(
            r#"
[[sidebar]]
path = "/mca/"
outlines = ["a.yaml"]
file = "b.yaml"
"#,
            &["both outlines and file"],
        );
    }

    #[test]
    fn test_sidebar_rejects_empty_outline_list() {
        assert_validation_error(
            r#"
[[sidebar]]
path = "/mca/"
outlines = []
"#,
            &["no outline files"],
        );
    }

    #[test]
    fn test_sidebar_rejects_duplicate_path() {
        assert_validation_error(
            r#"
[[sidebar]]
path = "/mca/"
outlines = ["a.yaml"]

[[sidebar]]
path = "/mca/"
file = "b.yaml"
"#,
            &["duplicate sidebar path"],
        );
    }

    #[test]
    fn test_sidebar_path_must_be_absolute() {
        assert_validation_error(
            r#"
[[sidebar]]
path = "mca/"
outlines = ["a.yaml"]
"#,
            &["must start with '/'"],
        );
    }

    #[test]
    fn test_site_base_must_be_slash_delimited() {
        assert_validation_error(
            r#"
[site]
base = "/library"
"#,
            &["site.base"],
        );
    }

    #[test]
    fn test_site_title_cannot_be_empty() {
        assert_validation_error(
            r#"
[site]
title = "  "
"#,
            &["site.title cannot be empty"],
        );
    }

    #[test]
    fn test_diagrams_section_requires_kroki_url() {
        assert_validation_error(
            r#"
[diagrams]
selector = ".mermaid"
"#,
            &["kroki_url"],
        );
    }

    #[test]
    fn test_diagrams_section_resolves_paths() {
        let config = parse(
            r#"
[diagrams]
kroki_url = "https://kroki.io"
site_dir = "dist"
appearance_file = "state/appearance.toml"
timeout_secs = 10
"#,
        )
        .unwrap();

        let diagrams = &config.diagrams_resolved;
        assert_eq!(diagrams.kroki_url.as_deref(), Some("https://kroki.io"));
        assert_eq!(diagrams.selector, ".mermaid");
        assert_eq!(diagrams.site_dir, PathBuf::from("/project/dist"));
        assert_eq!(
            diagrams.appearance_file,
            PathBuf::from("/project/state/appearance.toml")
        );
        assert_eq!(diagrams.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_diagrams_kroki_url_invalid_scheme() {
        assert_validation_error(
            r#"
[diagrams]
kroki_url = "ftp://kroki.io"
"#,
            &["diagrams.kroki_url", "http://"],
        );
    }

    #[test]
    fn test_diagrams_selector_must_be_class() {
        assert_validation_error(
            r#"
[diagrams]
kroki_url = "https://kroki.io"
selector = "pre code"
"#,
            &["diagrams.selector"],
        );
    }

    #[test]
    fn test_diagrams_timeout_bounds() {
        assert_validation_error(
            r#"
[diagrams]
kroki_url = "https://kroki.io"
timeout_secs = 0
"#,
            &["timeout_secs"],
        );
        assert_validation_error(
            r#"
[diagrams]
kroki_url = "https://kroki.io"
timeout_secs = 301
"#,
            &["timeout_secs"],
        );
    }

    #[test]
    fn test_selector_class() {
        assert_eq!(selector_class(".mermaid"), Some("mermaid"));
        assert_eq!(selector_class(".diagram_src-2"), Some("diagram_src-2"));
        assert_eq!(selector_class("mermaid"), None);
        assert_eq!(selector_class("."), None);
        assert_eq!(selector_class(".a .b"), None);
        assert_eq!(selector_class("#app"), None);
    }

    #[test]
    fn test_output_theme_file_resolved() {
        let config = parse(
            r#"
[output]
theme_file = "site/theme.json"
"#,
        )
        .unwrap();
        assert_eq!(
            config.output_resolved.theme_file,
            PathBuf::from("/project/site/theme.json")
        );
    }

    #[test]
    fn test_apply_cli_settings_overrides() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings {
            kroki_url: Some("http://localhost:8000".to_owned()),
            site_dir: Some(PathBuf::from("/srv/site")),
            appearance_file: Some(PathBuf::from("/tmp/look.toml")),
            theme_file: Some(PathBuf::from("/tmp/theme.json")),
        });

        assert_eq!(
            config.diagrams_resolved.kroki_url.as_deref(),
            Some("http://localhost:8000")
        );
        assert_eq!(config.diagrams_resolved.site_dir, PathBuf::from("/srv/site"));
        assert_eq!(
            config.diagrams_resolved.appearance_file,
            PathBuf::from("/tmp/look.toml")
        );
        assert_eq!(
            config.output_resolved.theme_file,
            PathBuf::from("/tmp/theme.json")
        );
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings::default());

        assert!(config.diagrams_resolved.kroki_url.is_none());
        assert_eq!(
            config.diagrams_resolved.site_dir,
            PathBuf::from("/test/docs/.vitepress/dist")
        );
    }

    #[test]
    fn test_expand_env_vars_kroki_url() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("SHELF_CFG_KROKI", "http://kroki.local");
        }

        let config = parse(
            r#"
[diagrams]
kroki_url = "${SHELF_CFG_KROKI}"
"#,
        )
        .unwrap();

        assert_eq!(
            config.diagrams_resolved.kroki_url.as_deref(),
            Some("http://kroki.local")
        );

        unsafe {
            std::env::remove_var("SHELF_CFG_KROKI");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("SHELF_CFG_MISSING");
        }

        let err = parse(
            r#"
[diagrams]
kroki_url = "${SHELF_CFG_MISSING}"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
    }

    #[test]
    fn test_load_from_file_sets_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[site]
title = "Library"

[[sidebar]]
path = "/leetcode/"
title = "LeetCode"
outlines = ["data/interview.yaml"]
"#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path()), None).unwrap();

        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.site.title, "Library");
        assert_eq!(
            config.sidebars_resolved[0].source,
            SidebarSource::Outlines(vec![dir.path().join("data/interview.yaml")])
        );
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[site\ntitle = ").unwrap();

        let err = Config::load(Some(path.as_path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_rejects_invalid_cli_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();

        let err = Config::load(
            Some(path.as_path()),
            Some(&CliSettings {
                kroki_url: Some("kroki.io".to_owned()),
                ..CliSettings::default()
            }),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
