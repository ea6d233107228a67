//! Declarative browser identity and interaction pacing.
//!
//! Backends consume these values; nothing here touches a browser.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Navigator and WebGL properties reported to page scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub platform: String,
    pub languages: Vec<String>,
    pub plugins: Vec<String>,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    pub hardware_concurrency: u32,
    pub device_memory_gb: u32,
}

/// Everything a session presents to the target site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationProfile {
    pub user_agent: String,
    pub viewport: Viewport,
    pub accept_language: String,
    pub headers: Vec<(String, String)>,
    pub fingerprint: Fingerprint,
}

struct DesktopTemplate {
    user_agent: &'static str,
    platform: &'static str,
    webgl_vendor: &'static str,
    webgl_renderer: &'static str,
}

static DESKTOP_TEMPLATES: [DesktopTemplate; 4] = [
    DesktopTemplate {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        platform: "Win32",
        webgl_vendor: "Google Inc. (NVIDIA)",
        webgl_renderer: "ANGLE (NVIDIA, NVIDIA GeForce RTX 3060 Direct3D11 vs_5_0 ps_5_0, D3D11)",
    },
    DesktopTemplate {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        platform: "Win32",
        webgl_vendor: "Google Inc. (Intel)",
        webgl_renderer: "ANGLE (Intel, Intel(R) UHD Graphics 630 Direct3D11 vs_5_0 ps_5_0, D3D11)",
    },
    DesktopTemplate {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        platform: "MacIntel",
        webgl_vendor: "Apple Inc.",
        webgl_renderer: "Apple M1",
    },
    DesktopTemplate {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        platform: "Linux x86_64",
        webgl_vendor: "Google Inc. (Mesa)",
        webgl_renderer: "ANGLE (Mesa, llvmpipe (LLVM 15.0.7 256 bits), OpenGL 4.5)",
    },
];

static VIEWPORTS: [Viewport; 4] = [
    Viewport { width: 1920, height: 1080 },
    Viewport { width: 1536, height: 864 },
    Viewport { width: 1440, height: 900 },
    Viewport { width: 1366, height: 768 },
];

static CHROME_PLUGINS: [&str; 3] = ["PDF Viewer", "Chrome PDF Viewer", "Chromium PDF Viewer"];

impl PresentationProfile {
    /// A realistic desktop Chrome profile picked at random.
    pub fn randomized<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let template = DESKTOP_TEMPLATES
            .choose(rng)
            .unwrap_or(&DESKTOP_TEMPLATES[0]);
        let viewport = *VIEWPORTS.choose(rng).unwrap_or(&VIEWPORTS[0]);
        let hardware_concurrency = *[4_u32, 8, 12, 16].choose(rng).unwrap_or(&8);
        let device_memory_gb = *[4_u32, 8].choose(rng).unwrap_or(&8);
        let accept_language = "en-US,en;q=0.9".to_string();

        let headers = vec![
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                    .to_string(),
            ),
            ("Accept-Language".to_string(), accept_language.clone()),
            ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
            ("Sec-Fetch-Dest".to_string(), "document".to_string()),
            ("Sec-Fetch-Mode".to_string(), "navigate".to_string()),
            ("Sec-Fetch-Site".to_string(), "none".to_string()),
        ];

        Self {
            user_agent: template.user_agent.to_string(),
            viewport,
            accept_language,
            headers,
            fingerprint: Fingerprint {
                platform: template.platform.to_string(),
                languages: vec!["en-US".to_string(), "en".to_string()],
                plugins: CHROME_PLUGINS.iter().map(ToString::to_string).collect(),
                webgl_vendor: template.webgl_vendor.to_string(),
                webgl_renderer: template.webgl_renderer.to_string(),
                hardware_concurrency,
                device_memory_gb,
            },
        }
    }

    /// HTTP headers to send with every navigation, user agent included.
    #[must_use]
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("User-Agent".to_string(), self.user_agent.clone())];
        pairs.extend(self.headers.iter().cloned());
        pairs
    }

    /// Init script installed before any page script runs.
    ///
    /// Renders the fingerprint as data and applies it with a fixed template,
    /// so swapping profiles never changes the script's logic.
    #[must_use]
    pub fn stealth_script(&self) -> String {
        let fingerprint = serde_json::to_string(&self.fingerprint).unwrap_or_else(|_| "{}".into());
        format!(
            r"(() => {{
  const fp = {fingerprint};
  const define = (obj, key, value) => {{
    try {{ Object.defineProperty(obj, key, {{ get: () => value, configurable: true }}); }} catch (_) {{}}
  }};
  define(Navigator.prototype, 'webdriver', undefined);
  define(Navigator.prototype, 'platform', fp.platform);
  define(Navigator.prototype, 'languages', fp.languages);
  define(Navigator.prototype, 'hardwareConcurrency', fp.hardwareConcurrency);
  define(Navigator.prototype, 'deviceMemory', fp.deviceMemoryGb);
  define(Navigator.prototype, 'plugins', fp.plugins.map((name) => ({{ name, filename: 'internal-pdf-viewer' }})));
  window.chrome = window.chrome || {{ runtime: {{}} }};
  const patchGl = (proto) => {{
    const original = proto.getParameter;
    proto.getParameter = function (param) {{
      if (param === 37445) return fp.webglVendor;
      if (param === 37446) return fp.webglRenderer;
      return original.call(this, param);
    }};
  }};
  if (window.WebGLRenderingContext) patchGl(WebGLRenderingContext.prototype);
  if (window.WebGL2RenderingContext) patchGl(WebGL2RenderingContext.prototype);
}})();"
        )
    }
}

/// One timed action performed after navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionStep {
    Scroll { dy: i32 },
    MouseMove { dx: i32, dy: i32 },
    Pause { millis: u64 },
}

/// Ordered interaction steps executed by a browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionScript {
    pub steps: Vec<InteractionStep>,
}

impl InteractionScript {
    /// A short randomized sequence of pauses, mouse moves and scrolls.
    pub fn human_like<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut steps = vec![InteractionStep::Pause {
            millis: rng.random_range(800..1_800),
        }];
        for _ in 0..rng.random_range(3..6) {
            steps.push(InteractionStep::MouseMove {
                dx: rng.random_range(-240..240),
                dy: rng.random_range(-120..120),
            });
            steps.push(InteractionStep::Pause {
                millis: rng.random_range(150..600),
            });
            steps.push(InteractionStep::Scroll {
                dy: rng.random_range(180..520),
            });
            steps.push(InteractionStep::Pause {
                millis: rng.random_range(300..1_100),
            });
        }
        Self { steps }
    }

    /// Sum of all pauses.
    #[must_use]
    pub fn total_pause_millis(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| match step {
                InteractionStep::Pause { millis } => *millis,
                _ => 0,
            })
            .sum()
    }
}
