//! Caller metadata recorded on new sessions.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use warden_core::session::ClientMetadata;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Client IP and user agent of the current request.
///
/// The IP is the first `X-Forwarded-For` entry when present, else the socket
/// peer address when the server was started with connect info, else absent.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo(pub ClientMetadata);

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let ip = forwarded_for(&parts.headers).or(peer);
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok());

        Ok(ClientInfo(ClientMetadata::new(ip.as_deref(), user_agent)))
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> ClientMetadata {
        let (mut parts, ()) = request.into_parts();
        let ClientInfo(client) = ClientInfo::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        client
    }

    #[tokio::test]
    async fn first_forwarded_address_wins() {
        let mut request = Request::builder()
            .header(X_FORWARDED_FOR, " 203.0.113.9 , 10.0.0.1")
            .header(USER_AGENT, "curl/8.5")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let client = extract(request).await;
        assert_eq!(client.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(client.user_agent.as_deref(), Some("curl/8.5"));
    }

    #[tokio::test]
    async fn falls_back_to_peer_address() {
        let mut request = Request::builder().body(()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));

        let client = extract(request).await;
        assert_eq!(client.ip.as_deref(), Some("192.0.2.1"));
        assert!(client.user_agent.is_none());
    }

    #[tokio::test]
    async fn absent_without_header_or_peer() {
        let client = extract(Request::builder().body(()).unwrap()).await;
        assert!(client.ip.is_none());
    }
}
