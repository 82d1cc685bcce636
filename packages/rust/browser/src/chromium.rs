//! Chromium-backed session using chromiumoxide.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use rosterscrape_shared::{BrowserConfig, Result, RosterError, WaitPolicy};

use crate::{BrowserSession, NavigationResult};

/// Env var that overrides Chromium discovery.
const CHROMIUM_PATH_ENV: &str = "ROSTERSCRAPE_CHROMIUM_PATH";

/// How long the DOM must stay unmutated for `NetworkIdle` to resolve.
const DOM_QUIET_MS: u64 = 500;

/// Find the Chromium binary path.
pub fn find_chromium(config: &BrowserConfig) -> Option<PathBuf> {
    // 1. Explicit config value
    if let Some(p) = &config.chrome_path {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Env override
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// A single Chromium tab driven over CDP.
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launch Chromium and open a blank tab.
    #[instrument(skip_all, fields(headless = config.headless))]
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let chrome_path = find_chromium(config).ok_or_else(|| {
            RosterError::Browser(format!(
                "Chromium not found. Install Chrome/Chromium or set {CHROMIUM_PATH_ENV}."
            ))
        })?;

        let mut builder = CdpBrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !config.headless {
            builder = builder.with_head();
        }
        let cdp_config = builder
            .build()
            .map_err(|e| RosterError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| RosterError::Browser(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RosterError::Browser(format!("failed to open tab: {e}")))?;

        info!("chromium session ready");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    /// Evaluate a script in the page and deserialize its return value.
    async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| RosterError::Browser(format!("script evaluation failed: {e}")))?
            .into_value()
            .map_err(|e| RosterError::Browser(format!("unexpected script result: {e}")))
    }

    async fn load(&self, url: &str, policy: WaitPolicy) -> Result<()> {
        match policy {
            WaitPolicy::Load => {
                self.page
                    .goto(url)
                    .await
                    .map_err(|e| RosterError::Navigation(format!("{url}: {e}")))?;
            }
            WaitPolicy::DomContentLoaded => {
                self.page
                    .execute(NavigateParams::new(url))
                    .await
                    .map_err(|e| RosterError::Navigation(format!("{url}: {e}")))?;
                self.evaluate::<serde_json::Value>(DOM_CONTENT_LOADED_JS)
                    .await
                    .map_err(|e| RosterError::Navigation(format!("{url}: {e}")))?;
            }
            WaitPolicy::NetworkIdle => {
                self.page
                    .goto(url)
                    .await
                    .map_err(|e| RosterError::Navigation(format!("{url}: {e}")))?;
                self.evaluate::<serde_json::Value>(&dom_quiet_js(DOM_QUIET_MS))
                    .await
                    .map_err(|e| RosterError::Navigation(format!("{url}: {e}")))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(
        &self,
        url: &str,
        policy: WaitPolicy,
        timeout: Duration,
    ) -> Result<NavigationResult> {
        let start = Instant::now();

        tokio::time::timeout(timeout, self.load(url, policy))
            .await
            .map_err(|_| {
                RosterError::Navigation(format!(
                    "{url}: timed out after {}ms",
                    timeout.as_millis()
                ))
            })??;

        let final_url = self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());
        let load_time_ms = start.elapsed().as_millis() as u64;
        debug!(%final_url, load_time_ms, ?policy, "navigation complete");

        Ok(NavigationResult {
            final_url,
            load_time_ms,
        })
    }

    async fn content(&self) -> Result<String> {
        self.evaluate("document.documentElement.outerHTML").await
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        self.evaluate(&click_js(selector)).await
    }

    async fn scroll_to_end(&self, selector: &str) -> Result<bool> {
        self.evaluate(&scroll_to_end_js(selector)).await
    }

    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        let result = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| RosterError::Browser(format!("failed to close browser: {e}")));
        let _ = browser.wait().await;
        self.handler.abort();
        result
    }
}

// ---------------------------------------------------------------------------
// In-page scripts
// ---------------------------------------------------------------------------

const DOM_CONTENT_LOADED_JS: &str = r#"new Promise(resolve => {
    if (document.readyState !== 'loading') { resolve(true); return; }
    document.addEventListener('DOMContentLoaded', () => resolve(true), { once: true });
})"#;

/// Resolves once no DOM mutation has been observed for `quiet_ms`.
fn dom_quiet_js(quiet_ms: u64) -> String {
    format!(
        r#"new Promise(resolve => {{
            let timer;
            const done = () => {{ obs.disconnect(); resolve(true); }};
            const obs = new MutationObserver(() => {{
                clearTimeout(timer);
                timer = setTimeout(done, {quiet_ms});
            }});
            obs.observe(document.documentElement, {{ childList: true, subtree: true, characterData: true }});
            timer = setTimeout(done, {quiet_ms});
        }})"#
    )
}

fn click_js(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.click();
            return true;
        }})()"#,
        sel = js_string(selector)
    )
}

fn scroll_to_end_js(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.scrollTop = el.scrollHeight;
            let parent = el.parentElement;
            while (parent) {{
                if (parent.scrollHeight > parent.clientHeight) {{
                    parent.scrollTop = parent.scrollHeight;
                }}
                parent = parent.parentElement;
            }}
            return true;
        }})()"#,
        sel = js_string(selector)
    )
}

/// Quote a Rust string as a JS string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_quoted_into_scripts() {
        let script = click_js(r##"a[href="#our-team-top"]"##);
        assert!(script.contains(r##"document.querySelector("a[href=\"#our-team-top\"]")"##));

        let script = scroll_to_end_js("html > body:nth-child(2)");
        assert!(script.contains(r#""html > body:nth-child(2)""#));
        assert!(script.contains("parent.scrollHeight > parent.clientHeight"));
    }

    #[test]
    fn find_chromium_prefers_existing_config_path() {
        let config = BrowserConfig {
            headless: true,
            chrome_path: Some("/definitely/not/here/chrome".into()),
        };
        // A missing configured path falls through to discovery instead of being returned.
        if let Some(found) = find_chromium(&config) {
            assert_ne!(found, PathBuf::from("/definitely/not/here/chrome"));
        }
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn chromium_clicks_and_scrolls_rendered_page() {
        let server = wiremock::MockServer::start().await;

        let page = r#"<html><body>
            <div id="grid"><img class="headshot" src="data:," onclick="
                const m = document.createElement('div');
                m.id = 'modal';
                m.style = 'height:50px;overflow:auto';
                m.innerHTML = '<div>Name</div><div>Alice</div>';
                document.body.appendChild(m);
            "></div>
        </body></html>"#;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(page),
            )
            .mount(&server)
            .await;

        let session = ChromiumSession::launch(&BrowserConfig::default())
            .await
            .expect("launch chromium");

        let nav = session
            .navigate(&server.uri(), WaitPolicy::Load, Duration::from_secs(20))
            .await
            .expect("navigate");
        assert!(nav.final_url.starts_with("http://127.0.0.1"));

        assert!(!session.content().await.expect("content").contains("Alice"));
        assert!(session.click("img.headshot").await.expect("click"));
        assert!(session.content().await.expect("content").contains("Alice"));
        assert!(session.scroll_to_end("#modal").await.expect("scroll"));
        assert!(!session.click("#nothing-here").await.expect("click"));

        session.close().await.expect("close");
    }
}
