//! Kroki-backed diagram library.
//!
//! [`KrokiLoader`] probes the Kroki service and hands out a [`KrokiLibrary`]
//! that renders Mermaid placeholders in a built site directory:
//! - placeholders are found in every `**/*.html` page
//! - diagrams are rendered to SVG via HTTP POST, in parallel on the rayon pool
//! - the active theme is injected as a Mermaid `%%{init}%%` directive
//! - pages whose diagrams already match the active theme are left untouched

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rayon::prelude::*;
use ureq::Agent;

use crate::appearance::InitOptions;
use crate::html_embed::{Placeholder, diagram_hash, find_placeholders, rendered_markup, splice};
use crate::library::{DiagramError, DiagramLibrary, LibraryLoader, LoadError, RenderSummary};

/// Create HTTP agent with the specified timeout.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Loads a [`KrokiLibrary`] after checking the service is up.
#[derive(Debug, Clone)]
pub struct KrokiLoader {
    kroki_url: String,
    site_dir: PathBuf,
    timeout: Duration,
}

impl KrokiLoader {
    /// Create a loader for `kroki_url` rendering pages under `site_dir`.
    pub fn new(kroki_url: impl Into<String>, site_dir: impl Into<PathBuf>) -> Self {
        Self {
            kroki_url: kroki_url.into().trim_end_matches('/').to_owned(),
            site_dir: site_dir.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set HTTP timeout for Kroki requests.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl LibraryLoader for KrokiLoader {
    async fn load(&self) -> Result<Arc<dyn DiagramLibrary>, LoadError> {
        let agent = create_agent(self.timeout);
        let url = format!("{}/health", self.kroki_url);

        let probe_agent = agent.clone();
        tokio::task::spawn_blocking(move || probe(&probe_agent, &url))
            .await
            .map_err(|e| LoadError::Aborted(e.to_string()))??;

        tracing::info!(kroki_url = %self.kroki_url, "Diagram service is available");

        Ok(Arc::new(KrokiLibrary {
            agent,
            kroki_url: self.kroki_url.clone(),
            site_dir: self.site_dir.clone(),
            options: Mutex::new(None),
        }))
    }
}

fn probe(agent: &Agent, url: &str) -> Result<(), LoadError> {
    let response = agent.get(url).call().map_err(|e| LoadError::Unreachable {
        url: url.to_owned(),
        message: e.to_string(),
    })?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(LoadError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
        })
    }
}

/// Mermaid renderer backed by a Kroki server.
pub struct KrokiLibrary {
    agent: Agent,
    kroki_url: String,
    site_dir: PathBuf,
    options: Mutex<Option<InitOptions>>,
}

#[async_trait]
impl DiagramLibrary for KrokiLibrary {
    async fn initialize(&self, options: InitOptions) -> Result<(), DiagramError> {
        tracing::debug!(theme = options.theme.theme(), "Initializing diagram theme");
        *self.options.lock().unwrap_or_else(PoisonError::into_inner) = Some(options);
        Ok(())
    }

    async fn render(&self, selector: &str) -> Result<RenderSummary, DiagramError> {
        let class = class_selector(selector)?.to_owned();
        let options = self
            .options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DiagramError::NotInitialized)?;

        let job = RenderJob {
            agent: self.agent.clone(),
            endpoint: format!("{}/mermaid/svg", self.kroki_url),
            site_dir: self.site_dir.clone(),
            class,
            options,
        };
        let summary = tokio::task::spawn_blocking(move || job.run())
            .await
            .map_err(|e| DiagramError::Task(e.to_string()))??;

        tracing::info!(
            rendered = summary.rendered,
            up_to_date = summary.up_to_date,
            failed = summary.failed,
            pages_updated = summary.pages_updated,
            "Rendered diagrams"
        );
        Ok(summary)
    }
}

/// Extract the class name from a `.class` selector.
fn class_selector(selector: &str) -> Result<&str, DiagramError> {
    shelf_config::selector_class(selector)
        .ok_or_else(|| DiagramError::InvalidSelector(selector.to_owned()))
}

/// One render pass over the site, run on a blocking thread.
struct RenderJob {
    agent: Agent,
    endpoint: String,
    site_dir: PathBuf,
    class: String,
    options: InitOptions,
}

/// Result of rendering the diagrams of one page.
#[derive(Default)]
struct PageOutcome {
    updated: bool,
    rendered: usize,
    up_to_date: usize,
    failed: usize,
}

impl RenderJob {
    fn run(&self) -> Result<RenderSummary, DiagramError> {
        let pages = html_pages(&self.site_dir);
        let options_json = self.options.to_json();
        let directive = format!("%%{{init: {options_json}}}%%\n");

        let outcomes = pages
            .par_iter()
            .map(|page| self.render_page(page, &options_json, &directive))
            .collect::<Result<Vec<_>, _>>()?;

        let mut summary = RenderSummary {
            pages: pages.len(),
            ..RenderSummary::default()
        };
        for outcome in outcomes {
            summary.pages_updated += usize::from(outcome.updated);
            summary.rendered += outcome.rendered;
            summary.up_to_date += outcome.up_to_date;
            summary.failed += outcome.failed;
        }
        Ok(summary)
    }

    fn render_page(
        &self,
        page: &Path,
        options_json: &str,
        directive: &str,
    ) -> Result<PageOutcome, DiagramError> {
        let io_err = |source| DiagramError::Io {
            path: page.to_path_buf(),
            source,
        };
        let html = std::fs::read_to_string(page).map_err(io_err)?;

        let mut outcome = PageOutcome::default();
        let stale: Vec<(Placeholder, String)> = find_placeholders(&html, &self.class)
            .into_iter()
            .filter_map(|placeholder| {
                let hash = diagram_hash(options_json, &placeholder.source);
                if placeholder.is_current(&hash) {
                    outcome.up_to_date += 1;
                    None
                } else {
                    Some((placeholder, hash))
                }
            })
            .collect();
        if stale.is_empty() {
            return Ok(outcome);
        }

        let theme = self.options.theme.theme();
        let results: Vec<_> = stale
            .par_iter()
            .map(|(placeholder, hash)| {
                let body = format!("{directive}{}", placeholder.source);
                self.request_svg(&body).map(|svg| {
                    (
                        placeholder.range.clone(),
                        rendered_markup(placeholder, hash, theme, &svg),
                    )
                })
            })
            .collect();

        let mut replacements = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(replacement) => replacements.push(replacement),
                Err(message) => {
                    outcome.failed += 1;
                    tracing::warn!(page = %page.display(), error = %message, "Diagram render failed; placeholder kept");
                }
            }
        }
        if replacements.is_empty() {
            return Ok(outcome);
        }

        outcome.rendered = replacements.len();
        std::fs::write(page, splice(&html, replacements)).map_err(io_err)?;
        outcome.updated = true;
        Ok(outcome)
    }

    /// POST diagram source to Kroki, returning the SVG or an error message.
    fn request_svg(&self, body: &str) -> Result<String, String> {
        let response = self
            .agent
            .post(&self.endpoint)
            .header("Content-Type", "text/plain")
            .send(body.as_bytes())
            .map_err(|e| format!("HTTP error: {e}"))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(format!("HTTP {status}: {}", error_body.trim()));
        }

        body.read_to_string().map_err(|e| format!("I/O error: {e}"))
    }
}

/// All `*.html` files under `site_dir`, sorted.
fn html_pages(site_dir: &Path) -> Vec<PathBuf> {
    let pattern = Path::new(&glob::Pattern::escape(&site_dir.to_string_lossy())).join("**/*.html");
    let Ok(entries) = glob::glob(&pattern.to_string_lossy()) else {
        return Vec::new();
    };

    let mut pages: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
    pages.sort();
    pages
}
