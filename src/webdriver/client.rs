// src/webdriver/client.rs
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::process::{Child, Command};

use crate::utils::error::BrowserError;
use crate::webdriver::models::{SessionValue, WdResponse, WireElement, WireError};
use crate::webdriver::{Browser, ElementHandle, Locator};

const STARTUP_PROBES: u32 = 50;
const STARTUP_PROBE_INTERVAL: Duration = Duration::from_millis(200);
const PRESENCE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// W3C WebDriver client over plain HTTP.
///
/// Speaks the protocol directly with a driver process (geckodriver) rather
/// than going through a higher-level automation framework, which keeps the
/// capability surface exactly as narrow as the [`Browser`] trait.
pub struct WebDriverClient {
    http: reqwest::Client,
    base: String,
    session_id: String,
    // Held only so a driver we launched ourselves is reaped with the client.
    _driver: Option<Child>,
}

fn map_wire_error(err: WireError) -> BrowserError {
    match err.error.as_str() {
        "no such element" => BrowserError::NoSuchElement(err.message),
        "stale element reference" => BrowserError::Stale(err.message),
        "element click intercepted" => BrowserError::ClickIntercepted(err.message),
        "invalid session id" | "session not created" => BrowserError::Session(err.message),
        _ => BrowserError::Protocol {
            error: err.error,
            message: err.message,
        },
    }
}

impl WebDriverClient {
    /// Launches a driver binary listening on the port of `base_url`, with its
    /// stdout/stderr redirected to `log_path`.
    pub async fn launch_driver(
        cmd: &Path,
        base_url: &str,
        log_path: &Path,
    ) -> Result<Child, BrowserError> {
        let port = base_url
            .rsplit(':')
            .next()
            .and_then(|p| p.trim_end_matches('/').parse::<u16>().ok())
            .ok_or_else(|| {
                BrowserError::Session(format!("cannot derive a driver port from {base_url}"))
            })?;

        let log = std::fs::File::create(log_path)
            .map_err(|e| BrowserError::Session(format!("cannot create driver log: {e}")))?;
        let err_log = log
            .try_clone()
            .map_err(|e| BrowserError::Session(format!("cannot clone driver log handle: {e}")))?;

        let child = Command::new(cmd)
            .arg(format!("--port={port}"))
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(err_log))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::Session(format!("failed to launch driver: {e}")))?;

        tracing::info!(port, driver = %cmd.display(), log = %log_path.display(), "driver process launched");
        Ok(child)
    }

    /// Connects to a WebDriver server and opens a Firefox session.
    ///
    /// Pass the child from [`launch_driver`](Self::launch_driver) as `driver`
    /// to tie its lifetime to the client; `None` targets an already running
    /// server.
    pub async fn connect(
        base_url: &str,
        headless: bool,
        driver: Option<Child>,
    ) -> Result<Self, BrowserError> {
        let http = reqwest::Client::builder().build()?;
        let base = base_url.trim_end_matches('/').to_string();

        // A freshly launched driver needs a moment to start listening.
        let mut ready = false;
        for _ in 0..STARTUP_PROBES {
            match http.get(format!("{base}/status")).send().await {
                Ok(resp) if resp.status().is_success() => {
                    ready = true;
                    break;
                }
                _ => tokio::time::sleep(STARTUP_PROBE_INTERVAL).await,
            }
        }
        if !ready {
            return Err(BrowserError::Session(format!(
                "WebDriver server at {base} did not become ready"
            )));
        }

        let mut firefox_args: Vec<&str> = Vec::new();
        if headless {
            firefox_args.push("-headless");
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": { "args": firefox_args }
                }
            }
        });

        let response = http
            .post(format!("{base}/session"))
            .json(&capabilities)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<WdResponse<WireError>>().await {
                Ok(payload) => map_wire_error(payload.value),
                Err(_) => BrowserError::Http(status),
            });
        }
        let session: WdResponse<SessionValue> = response.json().await?;
        tracing::info!(session = %session.value.session_id, "WebDriver session created");

        Ok(Self {
            http,
            base,
            session_id: session.value.session_id,
            _driver: driver,
        })
    }

    fn spath(&self, rest: &str) -> String {
        format!("/session/{}{}", self.session_id, rest)
    }

    /// Sends one command and unwraps the response envelope, mapping protocol
    /// error payloads onto the [`BrowserError`] taxonomy.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, BrowserError> {
        let url = format!("{}{}", self.base, path);
        let mut request = self.http.request(method.clone(), url);
        if method == Method::POST {
            // The protocol requires a JSON body on every POST, even an empty one.
            request = request.json(&body.unwrap_or_else(|| json!({})));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<WdResponse<WireError>>().await {
                Ok(payload) => map_wire_error(payload.value),
                Err(_) => BrowserError::Http(status),
            });
        }
        Ok(response.json::<WdResponse<T>>().await?.value)
    }

    async fn click_element(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.execute::<serde_json::Value>(
            Method::POST,
            &self.spath(&format!("/element/{}/click", element.0)),
            None,
        )
        .await
        .map(|_| ())
    }
}

impl Browser for WebDriverClient {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.execute::<serde_json::Value>(Method::POST, &self.spath("/url"), Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn set_implicit_wait(&self, timeout: Duration) -> Result<(), BrowserError> {
        self.execute::<serde_json::Value>(
            Method::POST,
            &self.spath("/timeouts"),
            Some(json!({ "implicit": timeout.as_millis() as u64 })),
        )
        .await
        .map(|_| ())
    }

    async fn is_visible(&self, css: &str) -> Result<bool, BrowserError> {
        let element = match self.find(css).await {
            Ok(element) => element,
            Err(err) if err.is_transient() => return Ok(false),
            Err(err) => return Err(err),
        };
        match self
            .execute::<bool>(
                Method::GET,
                &self.spath(&format!("/element/{}/displayed", element.0)),
                None,
            )
            .await
        {
            Ok(displayed) => Ok(displayed),
            Err(err) if err.is_transient() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn click(&self, target: Locator<'_>) -> Result<(), BrowserError> {
        match target {
            // Resolving fresh per call lets a retrying caller pick up a
            // re-rendered element.
            Locator::Css(css) => {
                let element = self.find(css).await?;
                self.click_element(&element).await
            }
            Locator::Handle(element) => self.click_element(element).await,
        }
    }

    async fn input_text(&self, css: &str, text: &str) -> Result<(), BrowserError> {
        let element = self.find(css).await?;
        self.execute::<serde_json::Value>(
            Method::POST,
            &self.spath(&format!("/element/{}/value", element.0)),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn select_by_label(&self, css: &str, label: &str) -> Result<(), BrowserError> {
        // WebDriver has no select-option command; scan the option children
        // and click the one whose visible text matches.
        let select = self.find(css).await?;
        let options: Vec<WireElement> = self
            .execute(
                Method::POST,
                &self.spath(&format!("/element/{}/elements", select.0)),
                Some(json!({ "using": "css selector", "value": "option" })),
            )
            .await?;

        for option in options {
            let text: String = self
                .execute(
                    Method::GET,
                    &self.spath(&format!("/element/{}/text", option.id)),
                    None,
                )
                .await?;
            if text.trim() == label {
                return self.click_element(&ElementHandle(option.id)).await;
            }
        }
        Err(BrowserError::NoSuchElement(format!(
            "option with label {label:?} in {css}"
        )))
    }

    async fn find(&self, css: &str) -> Result<ElementHandle, BrowserError> {
        let element: WireElement = self
            .execute(
                Method::POST,
                &self.spath("/element"),
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        Ok(ElementHandle(element.id))
    }

    async fn find_all(&self, css: &str) -> Result<Vec<ElementHandle>, BrowserError> {
        let elements: Vec<WireElement> = self
            .execute(
                Method::POST,
                &self.spath("/elements"),
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        Ok(elements.into_iter().map(|e| ElementHandle(e.id)).collect())
    }

    async fn find_in(
        &self,
        scope: &ElementHandle,
        css: &str,
    ) -> Result<ElementHandle, BrowserError> {
        let element: WireElement = self
            .execute(
                Method::POST,
                &self.spath(&format!("/element/{}/element", scope.0)),
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        Ok(ElementHandle(element.id))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        self.execute(
            Method::GET,
            &self.spath(&format!("/element/{}/text", element.0)),
            None,
        )
        .await
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        self.execute(
            Method::GET,
            &self.spath(&format!("/element/{}/attribute/{}", element.0, name)),
            None,
        )
        .await
    }

    async fn screenshot(&self, element: &ElementHandle) -> Result<Vec<u8>, BrowserError> {
        let encoded: String = self
            .execute(
                Method::GET,
                &self.spath(&format!("/element/{}/screenshot", element.0)),
                None,
            )
            .await?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| BrowserError::Decode(format!("screenshot payload: {e}")))
    }

    async fn wait_until_present(
        &self,
        element: &ElementHandle,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self
                .execute::<String>(
                    Method::GET,
                    &self.spath(&format!("/element/{}/name", element.0)),
                    None,
                )
                .await
            {
                Ok(_) => return Ok(()),
                Err(err) if err.is_transient() && Instant::now() < deadline => {
                    tokio::time::sleep(PRESENCE_POLL_INTERVAL).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.execute::<serde_json::Value>(Method::DELETE, &self.spath(""), None)
            .await
            .map(|_| ())?;
        tracing::info!(session = %self.session_id, "WebDriver session closed");
        Ok(())
    }
}
