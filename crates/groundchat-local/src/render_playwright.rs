use groundchat_core::{Error, PageRenderer, Result};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::Settings;

/// Launches headless Chromium (container-safe flags), waits for `<body>`, prints its innerText.
///
/// stdout is JSON-only. The browser is closed in `finally` on every path.
const JS: &str = r#"
const fs = require('fs');

function ok(obj) { process.stdout.write(JSON.stringify(obj)); }
function bad(code, message) { ok({ ok: false, error: { code, message } }); }

async function main() {
  let arg = '';
  try { arg = fs.readFileSync(0, 'utf8'); } catch (_) {}
  let req;
  try { req = JSON.parse(arg); } catch (e) { return bad('invalid_params', 'bad JSON args'); }

  let pw;
  try { pw = require('playwright'); } catch (e) {
    return bad('not_configured',
      'Playwright is not installed for Node.js. Install it with `npm i -g playwright` and `npx playwright install chromium`.');
  }

  const url = String(req.url || '').trim();
  if (!url) return bad('invalid_params', 'url must be non-empty');
  const timeoutMs = Number(req.timeout_ms || 10000);

  let browser;
  try {
    browser = await pw.chromium.launch({
      headless: true,
      args: ['--no-sandbox', '--disable-setuid-sandbox', '--disable-dev-shm-usage', '--disable-gpu'],
    });
    const page = await browser.newPage();
    await page.goto(url, { waitUntil: 'domcontentloaded', timeout: timeoutMs });
    await page.waitForSelector('body', { state: 'attached', timeout: timeoutMs });
    const text = await page.innerText('body');
    ok({ ok: true, text: text || '' });
  } catch (e) {
    bad('render_failed', String(e && e.message ? e.message : e));
  } finally {
    try { if (browser) await browser.close(); } catch (_) {}
  }
}

main().catch((e) => bad('render_failed', String(e && e.message ? e.message : e)));
"#;

fn node_path_candidates() -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    if let Some(home) = std::env::var_os("HOME").map(std::path::PathBuf::from) {
        out.push(
            home.join(".npm-global")
                .join("lib")
                .join("node_modules")
                .to_string_lossy()
                .to_string(),
        );
    }
    out.push("/opt/homebrew/lib/node_modules".to_string());
    out.push("/usr/local/lib/node_modules".to_string());
    out.push("/usr/lib/node_modules".to_string());
    out
}

fn node_path_has_playwright(np: &str) -> bool {
    np.split(':')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|p| std::path::Path::new(p).join("playwright").is_dir())
}

/// NODE_PATH to hand the child so a global Playwright install is found.
fn detect_node_path(explicit: Option<&str>) -> Option<String> {
    if let Some(v) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(v.to_string());
    }
    let existing = std::env::var("NODE_PATH").unwrap_or_default();
    if node_path_has_playwright(&existing) {
        return None;
    }
    let found = node_path_candidates()
        .into_iter()
        .find(|root| std::path::Path::new(root).join("playwright").is_dir())?;
    if existing.trim().is_empty() {
        Some(found)
    } else {
        Some(format!("{existing}:{found}"))
    }
}

/// Owns the Node/Chromium child for one render; killed on drop, whatever the exit path.
struct BrowserProcess {
    child: tokio::process::Child,
}

impl BrowserProcess {
    fn spawn(node_bin: &str, node_path: Option<&str>) -> Result<Self> {
        let mut cmd = tokio::process::Command::new(node_bin);
        if let Some(np) = detect_node_path(node_path) {
            cmd.env("NODE_PATH", np);
        }
        let child = cmd
            .arg("-e")
            .arg(JS)
            .kill_on_drop(true)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::NotConfigured(format!(
                    "browser render requires Node.js (`{node_bin}`) and the Playwright npm package: {e}"
                ))
            })?;
        tracing::debug!(pid = ?child.id(), "browser process started");
        Ok(Self { child })
    }
}

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.start_kill();
            tracing::debug!("browser process killed on release");
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaywrightRenderer {
    node_bin: String,
    node_path: Option<String>,
    disabled: bool,
    /// Extra wall-clock allowance on top of the page timeout (browser launch, navigation).
    launch_grace: Duration,
}

impl PlaywrightRenderer {
    pub fn new(node_bin: impl Into<String>) -> Self {
        Self {
            node_bin: node_bin.into(),
            node_path: None,
            disabled: false,
            launch_grace: Duration::from_secs(15),
        }
    }

    pub fn from_settings(s: &Settings) -> Self {
        Self {
            node_path: s.node_path.clone(),
            disabled: s.render_disabled,
            ..Self::new(s.node_bin.clone())
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    async fn run(&self, url: &str, timeout: Duration) -> Result<serde_json::Value> {
        let args_json = serde_json::json!({
            "url": url,
            "timeout_ms": timeout.as_millis() as u64,
        })
        .to_string();

        let mut proc = BrowserProcess::spawn(&self.node_bin, self.node_path.as_deref())?;

        if let Some(mut stdin) = proc.child.stdin.take() {
            // EOF lets the script's readFileSync(0) return.
            let _ = stdin.write_all(args_json.as_bytes()).await;
            let _ = stdin.shutdown().await;
        }
        let mut stdout = proc
            .child
            .stdout
            .take()
            .ok_or_else(|| Error::Render("missing stdout pipe".to_string()))?;
        let mut stderr = proc
            .child
            .stderr
            .take()
            .ok_or_else(|| Error::Render("missing stderr pipe".to_string()))?;

        let hard_timeout = timeout.saturating_mul(2).saturating_add(self.launch_grace);
        let collect = async {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let (r_out, r_err) =
                tokio::join!(stdout.read_to_end(&mut out), stderr.read_to_end(&mut err));
            r_out.map_err(|e| Error::Render(e.to_string()))?;
            r_err.map_err(|e| Error::Render(e.to_string()))?;
            let status = proc
                .child
                .wait()
                .await
                .map_err(|e| Error::Render(e.to_string()))?;
            Ok::<_, Error>((status, out, err))
        };
        let (status, out, err) = match tokio::time::timeout(hard_timeout, collect).await {
            Ok(r) => r?,
            Err(_) => {
                return Err(Error::Render(format!(
                    "browser render hard timeout after {}ms",
                    hard_timeout.as_millis()
                )))
            }
        };

        let stdout = String::from_utf8_lossy(&out).trim().to_string();
        serde_json::from_str(&stdout).map_err(|e| {
            let stderr = String::from_utf8_lossy(&err).trim().to_string();
            Error::Render(format!(
                "browser driver returned invalid JSON ({status}): {e}. stderr: {stderr}"
            ))
        })
    }
}

#[async_trait::async_trait]
impl PageRenderer for PlaywrightRenderer {
    fn name(&self) -> &'static str {
        "playwright"
    }

    async fn render_text(&self, url: &str, timeout: Duration) -> Result<String> {
        if self.disabled {
            return Err(Error::NotConfigured(
                "browser render disabled (GROUNDCHAT_RENDER_DISABLE)".to_string(),
            ));
        }
        let t0 = std::time::Instant::now();
        let v = self.run(url, timeout).await?;
        tracing::debug!(url, elapsed_ms = t0.elapsed().as_millis() as u64, "browser render done");

        if v.get("ok").and_then(|x| x.as_bool()) != Some(true) {
            let code = v
                .pointer("/error/code")
                .and_then(|x| x.as_str())
                .unwrap_or("render_failed");
            let message = v
                .pointer("/error/message")
                .and_then(|x| x.as_str())
                .unwrap_or("browser render failed")
                .to_string();
            return Err(match code {
                "not_configured" => Error::NotConfigured(message),
                "invalid_params" => Error::InvalidUrl(message),
                _ => Error::Render(message),
            });
        }

        let text = v
            .get("text")
            .and_then(|x| x.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(Error::NoVisibleText(url.to_string()));
        }
        Ok(text)
    }
}
