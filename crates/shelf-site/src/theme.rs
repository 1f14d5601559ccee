//! Theme config assembly.
//!
//! Gathers site metadata, the navigation bar and every configured sidebar
//! into the single JSON document the documentation framework's theme reads.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::ser::SerializeMap;
use shelf_config::{Config, NavItem, SidebarConfig, SidebarSource, SiteConfig};

use crate::outline::{OutlineError, load_outlines};
use crate::sidebar::{AuthoredSidebarError, SidebarNode, load_authored_sidebar, transform};

/// Error building or writing the theme config.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// An outline failed to load or validate.
    #[error("sidebar {sidebar}: {source}")]
    Outline {
        /// Sidebar path prefix.
        sidebar: String,
        /// Underlying error.
        #[source]
        source: OutlineError,
    },
    /// An authored sidebar failed to load or validate.
    #[error("sidebar {sidebar}: {source}")]
    Authored {
        /// Sidebar path prefix.
        sidebar: String,
        /// Underlying error.
        #[source]
        source: AuthoredSidebarError,
    },
    /// No sidebar is configured for the requested path.
    #[error("no sidebar configured for {0}")]
    UnknownSidebar(String),
    /// Output could not be serialized.
    #[error("failed to serialize theme config: {0}")]
    Json(#[from] serde_json::Error),
    /// Output could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Output file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Sidebars keyed by URL path prefix, in configuration order.
///
/// Serializes as a JSON object whose key order matches the configuration,
/// since the framework picks the first prefix that matches a page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SidebarMap(Vec<(String, Vec<SidebarNode>)>);

impl SidebarMap {
    /// Sidebar registered for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[SidebarNode]> {
        self.0
            .iter()
            .find(|(key, _)| key == path)
            .map(|(_, nodes)| nodes.as_slice())
    }

    /// Iterate over `(path, sidebar)` pairs in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SidebarNode])> {
        self.0
            .iter()
            .map(|(key, nodes)| (key.as_str(), nodes.as_slice()))
    }

    /// Number of sidebars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no sidebar is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, path: String, nodes: Vec<SidebarNode>) {
        self.0.push((path, nodes));
    }
}

impl Serialize for SidebarMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (path, nodes) in &self.0 {
            map.serialize_entry(path, nodes)?;
        }
        map.end()
    }
}

/// Theme configuration consumed by the documentation framework.
#[derive(Debug, Serialize)]
pub struct ThemeConfig {
    /// Site metadata (flattened into the top level).
    #[serde(flatten)]
    pub site: SiteConfig,
    /// Navigation bar.
    pub nav: Vec<NavItem>,
    /// Sidebars by path prefix.
    pub sidebar: SidebarMap,
}

impl ThemeConfig {
    /// Build the theme config from a loaded [`Config`].
    ///
    /// Reads every outline and authored sidebar file the config names.
    ///
    /// # Errors
    ///
    /// Fails on the first sidebar that cannot be built; a malformed outline
    /// never yields a partial sidebar.
    pub fn from_config(config: &Config) -> Result<Self, SiteError> {
        let mut sidebar = SidebarMap::default();
        for sidebar_config in &config.sidebars_resolved {
            let nodes = build_sidebar(sidebar_config)?;
            sidebar.push(sidebar_config.path.clone(), nodes);
        }

        Ok(Self {
            site: config.site.clone(),
            nav: config.nav.clone(),
            sidebar,
        })
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SiteError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the config as JSON to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Write`] if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), SiteError> {
        let json = self.to_json()?;
        let write_err = |source| SiteError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, json + "\n").map_err(write_err)?;
        tracing::info!(path = %path.display(), sidebars = self.sidebar.len(), "Wrote theme config");
        Ok(())
    }
}

/// Build the sidebar for one configured path prefix.
///
/// Outline sources are transformed; authored sources are used as-is. When a
/// title is configured the result is wrapped in a single collapsed group
/// carrying that title.
///
/// # Errors
///
/// Returns an error naming the sidebar if any of its files fails to load.
pub fn build_sidebar(config: &SidebarConfig) -> Result<Vec<SidebarNode>, SiteError> {
    let nodes = match &config.source {
        SidebarSource::Outlines(files) => {
            let outline = load_outlines(files).map_err(|source| SiteError::Outline {
                sidebar: config.path.clone(),
                source,
            })?;
            transform(&outline)
        }
        SidebarSource::Authored(file) => {
            load_authored_sidebar(file).map_err(|source| SiteError::Authored {
                sidebar: config.path.clone(),
                source,
            })?
        }
    };

    tracing::debug!(sidebar = %config.path, top_level = nodes.len(), "Built sidebar");

    Ok(match &config.title {
        Some(title) => vec![SidebarNode::group(title.as_str(), nodes)],
        None => nodes,
    })
}

/// Build the sidebar registered for `path` in `config`.
///
/// # Errors
///
/// Returns [`SiteError::UnknownSidebar`] if no sidebar uses that path.
pub fn sidebar_for(config: &Config, path: &str) -> Result<Vec<SidebarNode>, SiteError> {
    let sidebar = config
        .sidebar(path)
        .ok_or_else(|| SiteError::UnknownSidebar(path.to_owned()))?;
    build_sidebar(sidebar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn load_config(dir: &Path, toml: &str) -> Config {
        let path = write(dir, "shelf.toml", toml);
        Config::load(Some(path.as_path()), None).unwrap()
    }

    #[test]
    fn test_titled_sidebar_wraps_outline() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "mca.yaml",
            "- title: Java\n  items:\n    - label: Constructor\n      link: /mca/java/u1/a13\n",
        );
        let config = load_config(
            dir.path(),
            r#"
[[sidebar]]
path = "/mca/"
title = "MCA Material"
outlines = ["mca.yaml"]
"#,
        );

        let sidebar = sidebar_for(&config, "/mca/").unwrap();

        assert_eq!(
            serde_json::to_value(&sidebar).unwrap(),
            json!([{
                "text": "MCA Material",
                "collapsed": true,
                "items": [{
                    "text": "Java",
                    "collapsed": true,
                    "items": [{"text": "Constructor", "link": "/mca/java/u1/a13"}]
                }]
            }])
        );
    }

    #[test]
    fn test_untitled_sidebar_is_transform_output() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yaml", "- title: A\n  items: []\n");
        write(dir.path(), "b.yaml", "- label: B\n  link: /b\n");
        let config = load_config(
            dir.path(),
            r#"
[[sidebar]]
path = "/x/"
outlines = ["a.yaml", "b.yaml"]
"#,
        );

        let sidebar = sidebar_for(&config, "/x/").unwrap();

        assert_eq!(
            sidebar,
            vec![
                SidebarNode::group("A", Vec::new()),
                SidebarNode::entry("B", "/b"),
            ]
        );
    }

    #[test]
    fn test_unknown_sidebar_path() {
        let config = Config::default();
        let err = sidebar_for(&config, "/nope/").unwrap_err();
        assert!(matches!(err, SiteError::UnknownSidebar(path) if path == "/nope/"));
    }

    #[test]
    fn test_malformed_outline_fails_whole_build() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.yaml", "- label: Ok\n  link: /ok\n");
        write(dir.path(), "bad.yaml", "- title: Broken\n  items:\n    - label: No link\n");
        let config = load_config(
            dir.path(),
            r#"
[[sidebar]]
path = "/good/"
outlines = ["good.yaml"]

[[sidebar]]
path = "/bad/"
outlines = ["bad.yaml"]
"#,
        );

        let err = ThemeConfig::from_config(&config).unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("sidebar /bad/:"), "{message}");
        assert!(message.contains("bad.yaml"), "{message}");
    }

    #[test]
    fn test_theme_config_json_shape_and_key_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "z.yaml", "- label: Z\n  link: /z/\n");
        write(
            dir.path(),
            "modeling.yaml",
            "- text: Software Modeling\n  items:\n    - text: Introduction\n      link: /software-modeling/\n",
        );
        let config = load_config(
            dir.path(),
            r#"
[site]
title = "Library"
description = "Notes"

[[nav]]
text = "Home"
link = "/"

[[sidebar]]
path = "/zeta/"
outlines = ["z.yaml"]

[[sidebar]]
path = "/software-modeling/"
file = "modeling.yaml"
"#,
        );

        let theme = ThemeConfig::from_config(&config).unwrap();
        let json = theme.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "Library",
                "description": "Notes",
                "lang": "en-US",
                "base": "/",
                "nav": [{"text": "Home", "link": "/"}],
                "sidebar": {
                    "/zeta/": [{"text": "Z", "link": "/z/"}],
                    "/software-modeling/": [{
                        "text": "Software Modeling",
                        "items": [{"text": "Introduction", "link": "/software-modeling/"}]
                    }]
                }
            })
        );
        let zeta = json.find("\"/zeta/\"").unwrap();
        let modeling = json.find("\"/software-modeling/\"").unwrap();
        assert!(zeta < modeling, "sidebar keys must keep config order");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let theme = ThemeConfig {
            site: SiteConfig::default(),
            nav: Vec::new(),
            sidebar: SidebarMap::default(),
        };
        let out = dir.path().join("nested/out/theme.json");

        theme.write(&out).unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("\"sidebar\": {}"));
        assert!(written.ends_with('\n'));
    }

    #[test]
    fn test_sidebar_map_lookup() {
        let mut map = SidebarMap::default();
        map.push("/a/".to_owned(), vec![SidebarNode::entry("A", "/a/")]);

        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());
        assert_eq!(map.get("/a/").map(<[SidebarNode]>::len), Some(1));
        assert!(map.get("/b/").is_none());
        assert_eq!(map.iter().map(|(path, _)| path).collect::<Vec<_>>(), ["/a/"]);
    }
}
