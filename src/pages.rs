//! Interstitial pages served by the proxy.
//!
//! The pages are compiled into the binary and parameterized by plain token
//! substitution: each template carries bracketed tokens (`[TypoHost]`,
//! `[OriginPage]`, ...) that are replaced before the page is served.

const WARNING_HTML: &str = include_str!("../assets/warning.html");
const REDIRECT_HTML: &str = include_str!("../assets/redirect.html");
const PHISHING_HTML: &str = include_str!("../assets/phishing.html");
const WEAK_PASSWORD_HTML: &str = include_str!("../assets/weak_password.html");
const ACK_HTML: &str = include_str!("../assets/ack.html");

/// Typosquat warning interstitial.
///
/// `typo_host` is the flagged destination, `origin_page` the known host it
/// imitates. The page links to the control endpoints for trusting the host
/// or remembering the redirect.
pub fn warning(typo_host: &str, origin_page: &str) -> String {
    WARNING_HTML
        .replace("[TypoHost]", typo_host)
        .replace("[OriginPage]", origin_page)
}

/// Redirect page for a remembered typo hostname.
///
/// `redirect_url` is the full URL the meta-refresh sends the browser to.
pub fn redirect(redirect_url: &str) -> String {
    REDIRECT_HTML.replace("[RedirectHost]", redirect_url)
}

/// Credential-reuse interstitial.
pub fn phishing(phishing_host: &str, cre_used_host: &str, username: &str, token: &str) -> String {
    PHISHING_HTML
        .replace("[PhishingHost]", phishing_host)
        .replace("[CreUsedHost]", cre_used_host)
        .replace("[Username]", username)
        .replace("[Uuid]", token)
}

/// Weak-password interstitial.
pub fn weak_password(host: &str, reason: &str, username: &str) -> String {
    WEAK_PASSWORD_HTML
        .replace("[Host]", host)
        .replace("[Reason]", reason)
        .replace("[Username]", username)
}

/// Acknowledgement page served after a control-endpoint action.
pub fn ack(action: &str, host: &str) -> String {
    ACK_HTML
        .replace("[Action]", action)
        .replace("[Host]", host)
}
