//! Plain-HTTP request pipeline.
//!
//! Every proxied request walks the same gates, in the order the decision
//! has to be made:
//!
//! 1. **Control endpoints** - the interstitial pages link back into the
//!    proxy under `/__typoshield/`; these requests never leave the proxy.
//! 2. **Remembered typos** - hosts the user chose to always redirect are
//!    answered with the redirect page.
//! 3. **Typosquat gate** - flagged HTML navigations get the warning page
//!    (or 403 in block mode); flagged subresource requests get a plain 403.
//! 4. **Login screening** - form submissions carrying a username and
//!    password are vetted for weak passwords and credential reuse.
//! 5. **Forwarding** - everything that survives is passed to the upstream
//!    server unchanged.

use super::error::{ProxyError, ProxyResult};
use crate::config::FlaggedMode;
use crate::detect::{
    login_fields, search_host, LoginFields, PasswordPolicy, PhishingCheck, PhishingVerdict,
    TypoVerdict, TyposquatCheck,
};
use crate::pages;
use crate::store::{Credential, WebsiteStore};
use crate::telemetry::{
    AuditEvent, AuditLogger, ControlKind, FlaggedAction, ForwardReason, LearnSource,
};
use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::body::Body;
use hyper::header::{ACCEPT, CONTENT_TYPE, HOST, ORIGIN, REFERER};
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, info};
use url::form_urlencoded;
use uuid::Uuid;

/// Path prefix for the proxy's own control endpoints.
pub const CONTROL_PREFIX: &str = "/__typoshield/";

/// Add a host to the known-good registry.
pub const TRUST_PATH: &str = "/__typoshield/trust";

/// Remember a typo hostname with its redirect target.
pub const REDIRECT_PATH: &str = "/__typoshield/redirect";

/// Exempt a (host, username) pair from credential screening.
pub const IGNORE_CREDENTIAL_PATH: &str = "/__typoshield/ignore-credential";

/// Boxed error type used by proxied bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type flowing through the proxy in both directions.
pub type ProxyBody = BoxBody<Bytes, BoxError>;

/// Shared state for all connection tasks.
pub struct ProxyState {
    store: Arc<WebsiteStore>,
    typosquat: TyposquatCheck,
    phishing: PhishingCheck,
    passwords: PasswordPolicy,
    flagged_mode: FlaggedMode,
    auto_learn: bool,
    check_passwords: bool,
    audit: Arc<AuditLogger>,
}

impl ProxyState {
    /// Assemble the shared state for the request pipeline.
    pub fn new(
        store: Arc<WebsiteStore>,
        flagged_mode: FlaggedMode,
        auto_learn: bool,
        check_passwords: bool,
        passwords: PasswordPolicy,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            store,
            typosquat: TyposquatCheck::new(),
            phishing: PhishingCheck::new(),
            passwords,
            flagged_mode,
            auto_learn,
            check_passwords,
            audit,
        }
    }

    /// The registry behind this proxy.
    pub fn store(&self) -> &WebsiteStore {
        &self.store
    }

    /// The typosquat engine.
    pub fn typosquat(&self) -> &TyposquatCheck {
        &self.typosquat
    }

    /// The audit logger.
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Whether clean hosts are learned automatically.
    pub fn auto_learn(&self) -> bool {
        self.auto_learn
    }
}

/// Route a single proxied request.
pub async fn proxy_request<B>(
    req: Request<B>,
    state: Arc<ProxyState>,
) -> ProxyResult<Response<ProxyBody>>
where
    B: Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    if req.method() == Method::CONNECT {
        super::tunnel::handle_connect(req, state).await
    } else {
        handle_http(req, state).await
    }
}

/// The plain-HTTP pipeline described in the module docs.
pub async fn handle_http<B>(
    req: Request<B>,
    state: Arc<ProxyState>,
) -> ProxyResult<Response<ProxyBody>>
where
    B: Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    let host = request_host(&req)
        .ok_or_else(|| ProxyError::InvalidRequest("missing host in request".into()))?
        .to_lowercase();

    debug!("HTTP proxy request for {} {}", host, req.uri().path());

    // Control endpoints are matched on path alone so the interstitial
    // links work regardless of which hostname carries them.
    if req.uri().path().starts_with(CONTROL_PREFIX) {
        return handle_control(&req, &state);
    }

    // Remembered typo: never forward, send the user where they meant to go.
    if let Some(directed) = state.store.typo_redirect(&host) {
        state.audit.log(AuditEvent::TypoRedirect {
            host: host.clone(),
            directed: directed.clone(),
        });
        return Ok(html_response(pages::redirect(&format!(
            "https://{}/",
            directed
        ))));
    }

    let search = search_host(
        header_str(&req, ORIGIN.as_str()),
        header_str(&req, REFERER.as_str()),
        &host,
    )
    .to_lowercase();
    let wants_html = accepts_html(&req);

    let verdict = state
        .typosquat
        .evaluate(&host, &search, &state.store.known_hosts());

    if let TypoVerdict::Typo { matched, rule } = verdict {
        let warn = wants_html && state.flagged_mode == FlaggedMode::Warn;
        info!(
            "Flagged {} as typo of {} ({}): {}",
            host,
            matched,
            rule,
            if warn { "warning" } else { "blocking" }
        );
        state.audit.log(AuditEvent::TypoFlag {
            host: host.clone(),
            matched: matched.clone(),
            rule: rule.to_string(),
            action: if warn {
                FlaggedAction::Warned
            } else {
                FlaggedAction::Blocked
            },
        });

        return Ok(if warn {
            html_response(pages::warning(&host, &matched))
        } else {
            forbidden_response(&format!(
                "typoshield blocked {}: one edit away from {}",
                host, matched
            ))
        });
    }

    // Clean HTML navigations grow the registry.
    if wants_html
        && state.auto_learn
        && !state.store.is_typo_host(&search)
        && state.store.add_known_host(&search)
    {
        info!("Learned host {} from navigation", search);
        state.audit.log(AuditEvent::HostLearned {
            host: search.clone(),
            source: LearnSource::Navigation,
        });
    }

    let req = match screen_login(req, &host, &state).await? {
        ScreenOutcome::Intercept(response) => return Ok(response),
        ScreenOutcome::Proceed(req) => req,
    };

    let reason = if state.store.is_known_host(&host) {
        ForwardReason::KnownHost
    } else if search != host && state.store.is_known_host(&search) {
        ForwardReason::ContextSafe
    } else {
        ForwardReason::NotSuspicious
    };
    state.audit.log(AuditEvent::RequestForward {
        host: host.clone(),
        reason,
    });

    forward_http(req).await
}

/// What login screening decided to do with a request.
enum ScreenOutcome {
    /// Not a login, or the login is fine: forward this request.
    Proceed(Request<ProxyBody>),
    /// The login was intercepted with this response.
    Intercept(Response<ProxyBody>),
}

/// Vet form submissions that carry a username and a password.
///
/// Non-form requests pass through untouched. Form bodies are buffered so
/// the fields can be inspected and the request rebuilt for forwarding.
async fn screen_login<B>(
    req: Request<B>,
    host: &str,
    state: &ProxyState,
) -> ProxyResult<ScreenOutcome>
where
    B: Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    let is_form_post = req.method() == Method::POST
        && header_str(&req, CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if !is_form_post {
        return Ok(ScreenOutcome::Proceed(req.map(boxed)));
    }

    let (parts, body) = req.into_parts();
    let bytes = body
        .collect()
        .await
        .map_err(|e| {
            let e: BoxError = e.into();
            ProxyError::InvalidRequest(format!("failed to read form body: {}", e))
        })?
        .to_bytes();

    let params: Vec<(String, String)> = form_urlencoded::parse(&bytes).into_owned().collect();

    if let Some(login) = login_fields(&params) {
        if let Some(response) = vet_login(host, &login, state) {
            return Ok(ScreenOutcome::Intercept(response));
        }
    }

    let req = Request::from_parts(parts, full_body(bytes));
    Ok(ScreenOutcome::Proceed(req))
}

/// Run the password and credential checks; `Some` means intercept.
fn vet_login(host: &str, login: &LoginFields, state: &ProxyState) -> Option<Response<ProxyBody>> {
    if !state.phishing.is_ignored(host, &login.username) {
        if state.check_passwords {
            if let Err(reason) = state.passwords.evaluate(&login.password) {
                info!("Weak password for {} on {}: {}", login.username, host, reason);
                state.audit.log(AuditEvent::WeakPassword {
                    host: host.to_string(),
                    username: login.username.clone(),
                    reason: reason.to_string(),
                });
                return Some(html_response(pages::weak_password(
                    host,
                    reason,
                    &login.username,
                )));
            }
        }

        if let PhishingVerdict::CredentialReuse { credential_host } =
            state.phishing.evaluate(host, login, &state.store)
        {
            let token = Uuid::new_v4().simple().to_string();
            info!(
                "Credential reuse: {} on {} matches {}",
                login.username, host, credential_host
            );
            state.audit.log(AuditEvent::PhishingFlag {
                host: host.to_string(),
                credential_host: credential_host.clone(),
                username: login.username.clone(),
            });
            return Some(html_response(pages::phishing(
                host,
                &credential_host,
                &login.username,
                &token,
            )));
        }
    }

    // A clean login on a known-good host becomes the reference credential
    // for future reuse checks.
    if state.store.is_known_host(host)
        && state
            .store
            .add_credential(host, Credential::new(&login.username, &login.password))
    {
        state.audit.log(AuditEvent::CredentialStored {
            host: host.to_string(),
            username: login.username.clone(),
        });
    }

    None
}

/// Serve the in-band control endpoints.
fn handle_control<B>(req: &Request<B>, state: &ProxyState) -> ProxyResult<Response<ProxyBody>> {
    let params: Vec<(String, String)> =
        form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
            .into_owned()
            .collect();
    // Hostnames fold to lowercase; usernames keep their case.
    let param = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };
    let host_param = |name: &str| param(name).map(|v| v.to_lowercase());

    match req.uri().path() {
        TRUST_PATH => {
            let host = host_param("host")
                .ok_or_else(|| ProxyError::InvalidRequest("trust: missing host".into()))?;

            let added = state.store.add_known_host(&host);
            state.audit.log(AuditEvent::ControlAction {
                action: ControlKind::Trust,
                host: host.clone(),
            });
            if added {
                info!("Trusted host {} via control endpoint", host);
                state.audit.log(AuditEvent::HostLearned {
                    host: host.clone(),
                    source: LearnSource::ControlEndpoint,
                });
            }

            let action = if added {
                "Added to trusted hosts"
            } else {
                "Already present in the registry"
            };
            Ok(html_response(pages::ack(action, &host)))
        }
        REDIRECT_PATH => {
            let typo = host_param("typo")
                .ok_or_else(|| ProxyError::InvalidRequest("redirect: missing typo".into()))?;
            let origin = host_param("origin")
                .ok_or_else(|| ProxyError::InvalidRequest("redirect: missing origin".into()))?;

            let added = state.store.add_typo_host(&typo, &origin);
            if added {
                info!("Remembered typo redirect {} -> {}", typo, origin);
                state.audit.log(AuditEvent::ControlAction {
                    action: ControlKind::Redirect,
                    host: typo.clone(),
                });
            }

            let action = if added {
                "Remembered the redirect"
            } else {
                "No redirect recorded"
            };
            Ok(html_response(pages::ack(action, &typo)))
        }
        IGNORE_CREDENTIAL_PATH => {
            let host = host_param("host")
                .ok_or_else(|| ProxyError::InvalidRequest("ignore-credential: missing host".into()))?;
            let user = param("user")
                .ok_or_else(|| ProxyError::InvalidRequest("ignore-credential: missing user".into()))?;

            state.phishing.ignore(&host, &user);
            state.audit.log(AuditEvent::ControlAction {
                action: ControlKind::IgnoreCredential,
                host: host.clone(),
            });

            Ok(html_response(pages::ack(
                "Credential checks disabled for this site and username",
                &host,
            )))
        }
        other => Ok(not_found_response(&format!(
            "unknown control endpoint: {}",
            other
        ))),
    }
}

/// Forward a request to the upstream server.
async fn forward_http(req: Request<ProxyBody>) -> ProxyResult<Response<ProxyBody>> {
    use hyper_util::client::legacy::Client;
    use hyper_util::rt::TokioExecutor;

    let addr = req.uri().authority().map(|a| a.to_string());

    let client: Client<_, ProxyBody> = Client::builder(TokioExecutor::new()).build_http();

    let response = client
        .request(req)
        .await
        .map_err(|e| ProxyError::UpstreamConnect {
            addr: addr.unwrap_or_else(|| "upstream".to_string()),
            message: e.to_string(),
        })?;

    Ok(response.map(boxed))
}

/// Destination hostname: the absolute-form URI's host, else the Host
/// header with any port stripped.
fn request_host<B>(req: &Request<B>) -> Option<String> {
    if let Some(host) = req.uri().host() {
        return Some(host.to_string());
    }
    req.headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(h).to_string())
}

/// A header value as a string, if present and valid UTF-8.
fn header_str<'a, B>(req: &'a Request<B>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// True when the request is an HTML navigation.
fn accepts_html<B>(req: &Request<B>) -> bool {
    header_str(req, ACCEPT.as_str()).is_some_and(|accept| accept.contains("text/html"))
}

/// Box any compatible body into the proxy's body type.
fn boxed<B>(body: B) -> ProxyBody
where
    B: Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    body.map_err(Into::into).boxed()
}

/// A body with the given content.
fn full_body(content: impl Into<Bytes>) -> ProxyBody {
    boxed(Full::new(content.into()))
}

/// An empty body.
pub(super) fn empty_body() -> ProxyBody {
    boxed(Empty::<Bytes>::new())
}

/// A `200 OK` HTML response (interstitials, control pages).
fn html_response(body: String) -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(full_body(body))
        .unwrap()
}

/// A `403 Forbidden` plain-text response.
pub(super) fn forbidden_response(message: &str) -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header(CONTENT_TYPE, "text/plain")
        .body(full_body(message.to_string()))
        .unwrap()
}

/// A `404 Not Found` plain-text response.
fn not_found_response(message: &str) -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONTENT_TYPE, "text/plain")
        .body(full_body(message.to_string()))
        .unwrap()
}
