//! Heuristic user-agent parsing for report headers.

use std::fmt;

/// Browser, engine and OS named by a user-agent string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgent {
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
}

impl UserAgent {
    pub fn parse(ua: &str) -> Self {
        let (browser, browser_version) = detect_browser(ua);
        let (engine, engine_version) = detect_engine(ua, browser.as_deref());
        let (os, os_version) = detect_os(ua);

        Self {
            browser: browser.map(str::to_string),
            browser_version: browser_version.map(major),
            engine: engine.map(str::to_string),
            engine_version,
            os: os.map(str::to_string),
            os_version,
        }
    }
}

/// `Chrome 120 (Blink 120.0.6099.71) on Mac OS 10.15.7`, with `?` for
/// anything that was not recognised.
impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |value: &Option<String>| value.clone().unwrap_or_else(|| "?".to_string());
        write!(
            f,
            "{} {} ({} {}) on {} {}",
            part(&self.browser),
            part(&self.browser_version),
            part(&self.engine),
            part(&self.engine_version),
            part(&self.os),
            part(&self.os_version),
        )
    }
}

/// Version that follows `token` (e.g. `Chrome/` -> `120.0.1`).
fn version_after<'a>(ua: &'a str, token: &str) -> Option<&'a str> {
    let start = ua.find(token)? + token.len();
    let rest = &ua[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '_'))
        .unwrap_or(rest.len());
    let version = &rest[..end];
    (!version.is_empty()).then_some(version)
}

fn major(version: &str) -> String {
    version.split('.').next().unwrap_or(version).to_string()
}

fn detect_browser(ua: &str) -> (Option<&'static str>, Option<&str>) {
    const BROWSERS: &[(&str, &str)] = &[
        ("Edg/", "Edge"),
        ("Edge/", "Edge"),
        ("OPR/", "Opera"),
        ("SamsungBrowser/", "Samsung Browser"),
        ("Firefox/", "Firefox"),
        ("HeadlessChrome/", "Chrome Headless"),
        ("Chrome/", "Chrome"),
        ("CriOS/", "Chrome"),
        ("Electron/", "Electron"),
    ];

    for (token, name) in BROWSERS {
        if let Some(version) = version_after(ua, token) {
            return (Some(*name), Some(version));
        }
    }

    if ua.contains("Safari/") {
        return (Some("Safari"), version_after(ua, "Version/"));
    }
    if ua.contains("Trident/") || ua.contains("MSIE ") {
        let version = version_after(ua, "rv:").or_else(|| version_after(ua, "MSIE "));
        return (Some("IE"), version);
    }
    if ua.contains("jsdom/") {
        return (Some("jsdom"), version_after(ua, "jsdom/"));
    }
    (None, None)
}

fn detect_engine(ua: &str, browser: Option<&str>) -> (Option<&'static str>, Option<String>) {
    match browser {
        Some("Chrome" | "Chrome Headless" | "Edge" | "Opera" | "Samsung Browser" | "Electron")
            if ua.contains("Chrome/") =>
        {
            return (Some("Blink"), version_after(ua, "Chrome/").map(str::to_string));
        }
        _ => {}
    }

    if ua.contains("Gecko/") && ua.contains("Firefox/") {
        return (Some("Gecko"), version_after(ua, "rv:").map(str::to_string));
    }
    if let Some(version) = version_after(ua, "AppleWebKit/") {
        return (Some("WebKit"), Some(version.to_string()));
    }
    if let Some(version) = version_after(ua, "Trident/") {
        return (Some("Trident"), Some(version.to_string()));
    }
    (None, None)
}

fn detect_os(ua: &str) -> (Option<&'static str>, Option<String>) {
    let dotted = |v: &str| v.replace('_', ".");

    if let Some(version) = version_after(ua, "Windows NT ") {
        let name = match version {
            "10.0" => "10",
            "6.3" => "8.1",
            "6.2" => "8",
            "6.1" => "7",
            other => other,
        };
        return (Some("Windows"), Some(name.to_string()));
    }
    if let Some(version) = version_after(ua, "iPhone OS ").or_else(|| version_after(ua, "CPU OS ")) {
        return (Some("iOS"), Some(dotted(version)));
    }
    if let Some(version) = version_after(ua, "Mac OS X ") {
        return (Some("Mac OS"), Some(dotted(version)));
    }
    if ua.contains("Macintosh") {
        return (Some("Mac OS"), None);
    }
    if let Some(version) = version_after(ua, "Android ") {
        return (Some("Android"), Some(version.to_string()));
    }
    if ua.contains("CrOS") {
        return (Some("Chromium OS"), None);
    }
    if ua.contains("Ubuntu") {
        return (Some("Ubuntu"), None);
    }
    if ua.contains("Linux") {
        return (Some("Linux"), None);
    }
    (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.71 Safari/537.36";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const SAFARI_IOS: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const EDGE_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.61";

    #[test]
    fn test_chrome_on_mac() {
        let ua = UserAgent::parse(CHROME_MAC);
        assert_eq!(ua.browser.as_deref(), Some("Chrome"));
        assert_eq!(ua.browser_version.as_deref(), Some("120"));
        assert_eq!(ua.engine.as_deref(), Some("Blink"));
        assert_eq!(ua.os.as_deref(), Some("Mac OS"));
        assert_eq!(ua.os_version.as_deref(), Some("10.15.7"));
    }

    #[test]
    fn test_firefox_on_linux() {
        let ua = UserAgent::parse(FIREFOX_LINUX);
        assert_eq!(ua.browser.as_deref(), Some("Firefox"));
        assert_eq!(ua.browser_version.as_deref(), Some("121"));
        assert_eq!(ua.engine.as_deref(), Some("Gecko"));
        assert_eq!(ua.engine_version.as_deref(), Some("121.0"));
        assert_eq!(ua.os.as_deref(), Some("Linux"));
    }

    #[test]
    fn test_safari_on_ios() {
        let ua = UserAgent::parse(SAFARI_IOS);
        assert_eq!(ua.browser.as_deref(), Some("Safari"));
        assert_eq!(ua.browser_version.as_deref(), Some("17"));
        assert_eq!(ua.engine.as_deref(), Some("WebKit"));
        assert_eq!(ua.os.as_deref(), Some("iOS"));
        assert_eq!(ua.os_version.as_deref(), Some("17.1"));
    }

    #[test]
    fn test_edge_on_windows() {
        let ua = UserAgent::parse(EDGE_WINDOWS);
        assert_eq!(ua.browser.as_deref(), Some("Edge"));
        assert_eq!(ua.engine.as_deref(), Some("Blink"));
        assert_eq!(ua.os.as_deref(), Some("Windows"));
        assert_eq!(ua.os_version.as_deref(), Some("10"));
    }

    #[test]
    fn test_unknown_parts_render_as_question_marks() {
        let ua = UserAgent::parse("");
        assert_eq!(ua, UserAgent::default());
        assert_eq!(ua.to_string(), "? ? (? ?) on ? ?");
    }

    #[test]
    fn test_display() {
        let ua = UserAgent::parse(FIREFOX_LINUX);
        assert_eq!(ua.to_string(), "Firefox 121 (Gecko 121.0) on Linux ?");
    }
}
