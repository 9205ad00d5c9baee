//! HttpDispatcher against a loopback HTTP responder.

use bmnp_types::{
    PortEnvelope, PortProvisioningRequest, SegmentationId, SnmpAccessProtocol, SwitchBinding,
    SwitchCredentials,
};
use bmnpd::{
    classify, ControllerConfig, Dispatcher, HttpDispatcher, PortOperation, ProvisioningOutcome,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves one canned response and returns the raw request it received.
async fn respond_once(response: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/sdn/v2.0", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];

        // Read headers, then as much body as content-length announces.
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= end + 4 + body_len {
                    break;
                }
            }
        }

        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8(raw).unwrap()
    });

    (base_url, handle)
}

fn dispatcher(base_url: &str) -> HttpDispatcher {
    let mut config = ControllerConfig::new(base_url);
    config.timeout_secs = 5;
    config.connect_timeout_secs = 2;
    HttpDispatcher::new(&config).unwrap()
}

fn request() -> PortProvisioningRequest {
    PortProvisioningRequest::new("p-42")
        .with_binding(SwitchBinding::new(
            "Ten-GigabitEthernet1/0/35",
            "44:31:92:61:89:d2".parse().unwrap(),
        ))
        .with_segmentation_id(SegmentationId::new(1001).unwrap())
}

#[tokio::test]
async fn test_create_posts_envelope() {
    let (base_url, server) = respond_once("HTTP/1.1 204 No Content\r\n\r\n").await;

    let response = dispatcher(&base_url)
        .dispatch(PortOperation::Create, &request())
        .await
        .unwrap();
    assert_eq!(response.status_code, 204);
    assert_eq!(response.body, None);
    assert_eq!(classify(&Ok(response)), ProvisioningOutcome::Success);

    let raw = server.await.unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("POST /sdn/v2.0/ports HTTP/1.1"));
    assert!(head.to_ascii_lowercase().contains("accept: application/json"));

    let envelope: PortEnvelope = serde_json::from_str(body).unwrap();
    assert_eq!(envelope.port, request());
}

#[tokio::test]
async fn test_controller_body_carries_no_switch_credentials() {
    let (base_url, server) = respond_once("HTTP/1.1 204 No Content\r\n\r\n").await;

    let mut req = request().with_credentials(SwitchCredentials {
        ip_address: "10.0.0.5".to_string(),
        access_protocol: SnmpAccessProtocol::SnmpV3,
        write_community: Some("private".to_string()),
        security_name: Some("admin".to_string()),
        auth_protocol: Some("sha".to_string()),
        auth_key: Some("authsecret".to_string()),
        priv_protocol: Some("aes".to_string()),
        priv_key: Some("privsecret".to_string()),
    });
    req.switch_bindings[0].ifindex = Some(35);

    dispatcher(&base_url)
        .dispatch(PortOperation::Create, &req)
        .await
        .unwrap();

    let raw = server.await.unwrap();
    let (_, body) = raw.split_once("\r\n\r\n").unwrap();
    let value: serde_json::Value = serde_json::from_str(body).unwrap();
    assert!(value["port"].get("credentials").is_none());
    assert!(value["port"]["switchports"][0].get("ifindex").is_none());
    assert!(!body.contains("privsecret"));
    assert!(!body.contains("authsecret"));
    assert!(!body.contains("private"));
    assert_eq!(value["port"]["id"], "p-42");
}

#[tokio::test]
async fn test_bind_uses_put() {
    let (base_url, server) = respond_once(
        "HTTP/1.1 203 Non-Authoritative Information\r\ncontent-length: 0\r\n\r\n",
    )
    .await;

    let response = dispatcher(&base_url)
        .dispatch(PortOperation::Bind, &request())
        .await
        .unwrap();
    assert_eq!(classify(&Ok(response)), ProvisioningOutcome::BindFailure);

    let raw = server.await.unwrap();
    assert!(raw.starts_with("PUT /sdn/v2.0/ports/p-42/bind HTTP/1.1"));
}

#[tokio::test]
async fn test_service_unavailable_exposes_retry_after() {
    let (base_url, server) = respond_once(
        "HTTP/1.1 503 Service Unavailable\r\nRetry-After: 10\r\ncontent-length: 2\r\n\r\n{}",
    )
    .await;

    let response = dispatcher(&base_url)
        .dispatch(PortOperation::Delete, &request())
        .await
        .unwrap();
    assert_eq!(response.status_code, 503);
    assert_eq!(response.reason.as_deref(), Some("Service Unavailable"));
    assert_eq!(response.retry_after(), Some(Duration::from_secs(10)));
    assert_eq!(response.body.as_deref(), Some("{}"));
    assert_eq!(
        classify(&Ok(response)),
        ProvisioningOutcome::ConnectionFailed(
            " Connection has failed: 503 Server Error: Service Unavailable".to_string()
        )
    );

    let raw = server.await.unwrap();
    assert!(raw.starts_with("DELETE /sdn/v2.0/ports/p-42 HTTP/1.1"));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Nothing listens on port 1
    let result = dispatcher("http://127.0.0.1:1")
        .dispatch(PortOperation::Create, &request())
        .await;

    let err = result.as_ref().unwrap_err();
    assert!(!err.to_string().is_empty());
    match classify(&result) {
        ProvisioningOutcome::ConnectionFailed(message) => {
            assert!(message.starts_with(" Connection has failed: "));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
