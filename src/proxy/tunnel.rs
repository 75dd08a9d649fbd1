//! HTTP CONNECT handling for HTTPS destinations.
//!
//! For HTTPS only the hostname is visible, at CONNECT time. That is enough
//! for the typosquat gate, but not enough to inject an interstitial into
//! the encrypted stream, so flagged destinations fail closed with `403`
//! and everything else gets a blind bidirectional tunnel:
//!
//! 1. Client sends: `CONNECT www.example.com:443 HTTP/1.1`
//! 2. The hostname is evaluated against the registry
//! 3. If flagged (or a remembered typo): `403 Forbidden`
//! 4. Otherwise: `200 Connection Established`, then bytes are copied
//!    between client and upstream until either side closes

use super::error::{ProxyError, ProxyResult};
use super::handler::{empty_body, forbidden_response, BoxError, ProxyBody, ProxyState};
use crate::detect::TypoVerdict;
use crate::telemetry::{AuditEvent, FlaggedAction, ForwardReason, LearnSource};
use bytes::Bytes;
use hyper::body::Body;
use hyper::upgrade::Upgraded;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Handle an HTTP CONNECT request.
///
/// Evaluates the target hostname and either refuses the tunnel or
/// establishes it.
pub async fn handle_connect<B>(
    req: Request<B>,
    state: Arc<ProxyState>,
) -> ProxyResult<Response<ProxyBody>>
where
    B: Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    let target = req
        .uri()
        .authority()
        .ok_or_else(|| ProxyError::InvalidRequest("missing authority in CONNECT request".into()))?
        .to_string();

    let (host, port) = parse_host_port(&target)?;
    let host = host.to_lowercase();

    debug!("CONNECT request to {}:{}", host, port);

    // A remembered typo cannot be redirected inside TLS; refuse it and
    // point at the real site in the reason text.
    if let Some(directed) = state.store().typo_redirect(&host) {
        state.audit().log(AuditEvent::TypoFlag {
            host: host.clone(),
            matched: directed.clone(),
            rule: "remembered_typo".to_string(),
            action: FlaggedAction::Blocked,
        });
        return Ok(forbidden_response(&format!(
            "typoshield blocked {}: remembered typo of {}",
            host, directed
        )));
    }

    // CONNECT carries no page context, so the destination is evaluated
    // on its own.
    let verdict = state
        .typosquat()
        .evaluate(&host, &host, &state.store().known_hosts());

    if let TypoVerdict::Typo { matched, rule } = verdict {
        info!("Refusing CONNECT to {}: one edit from {}", host, matched);
        state.audit().log(AuditEvent::TypoFlag {
            host: host.clone(),
            matched: matched.clone(),
            rule: rule.to_string(),
            action: FlaggedAction::Blocked,
        });
        return Ok(forbidden_response(&format!(
            "typoshield blocked {}: one edit away from {}",
            host, matched
        )));
    }

    if state.auto_learn() && state.store().add_known_host(&host) {
        info!("Learned host {} from tunnel", host);
        state.audit().log(AuditEvent::HostLearned {
            host: host.clone(),
            source: LearnSource::Tunnel,
        });
    }

    let reason = if state.store().is_known_host(&host) {
        ForwardReason::KnownHost
    } else {
        ForwardReason::NotSuspicious
    };
    state.audit().log(AuditEvent::RequestForward {
        host: host.clone(),
        reason,
    });

    establish_tunnel(req, host, port).await
}

/// Answer `200 Connection Established` and splice the upgraded stream to
/// the upstream server in a background task.
async fn establish_tunnel<B>(
    req: Request<B>,
    host: String,
    port: u16,
) -> ProxyResult<Response<ProxyBody>>
where
    B: Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    tokio::spawn(async move {
        match hyper::upgrade::on(req).await {
            Ok(upgraded) => {
                if let Err(e) = tunnel_connection(upgraded, &host, port).await {
                    // Connection resets are routine here.
                    debug!("Tunnel ended for {}:{}: {}", host, port, e);
                }
            }
            Err(e) => {
                warn!("HTTP upgrade failed for {}:{}: {}", host, port, e);
            }
        }
    });

    Ok(Response::builder()
        .status(StatusCode::OK)
        .body(empty_body())
        .unwrap())
}

/// Copy bytes between the client and the upstream server until either
/// side closes.
async fn tunnel_connection(upgraded: Upgraded, host: &str, port: u16) -> ProxyResult<()> {
    let upstream_addr = format!("{}:{}", host, port);
    let mut upstream =
        TcpStream::connect(&upstream_addr)
            .await
            .map_err(|e| ProxyError::UpstreamConnect {
                addr: upstream_addr.clone(),
                message: e.to_string(),
            })?;

    debug!("Connected to upstream {}", upstream_addr);

    let mut client = TokioIo::new(upgraded);
    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((to_upstream, to_client)) => {
            debug!(
                "Tunnel closed for {}: {} bytes up, {} bytes down",
                upstream_addr, to_upstream, to_client
            );
        }
        Err(e) => {
            debug!("Tunnel error for {}: {}", upstream_addr, e);
        }
    }

    Ok(())
}

/// Parse host:port from a CONNECT authority.
///
/// Examples:
/// - `www.example.com:443` -> ("www.example.com", 443)
/// - `www.example.com` -> ("www.example.com", 443) (default port)
/// - `[::1]:443` -> ("::1", 443)
fn parse_host_port(authority: &str) -> ProxyResult<(String, u16)> {
    if let Some((host, port_str)) = authority.rsplit_once(':') {
        // IPv6 addresses like [::1]:443 keep their colons inside brackets.
        if host.starts_with('[') && host.ends_with(']') {
            let port = port_str
                .parse::<u16>()
                .map_err(|_| ProxyError::InvalidRequest(format!("invalid port: {}", port_str)))?;
            return Ok((host[1..host.len() - 1].to_string(), port));
        }

        let port = port_str
            .parse::<u16>()
            .map_err(|_| ProxyError::InvalidRequest(format!("invalid port: {}", port_str)))?;
        Ok((host.to_string(), port))
    } else {
        // No port specified - default to 443 for CONNECT
        Ok((authority.to_string(), 443))
    }
}
