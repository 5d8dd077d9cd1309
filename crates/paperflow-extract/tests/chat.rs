//! Chat client against a local one-shot HTTP server.

use paperflow_core::ItemError;
use paperflow_extract::{ChatClient, Completion, LlmConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves one canned response per entry, returns the raw requests.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/v1", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut sock, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut sock).await);
            let reply = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            sock.shutdown().await.unwrap();
        }
        requests
    });
    (base, handle)
}

async fn read_request(sock: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = sock.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let len = text[..head_end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn client(base_url: String, max_retries: u32) -> ChatClient {
    ChatClient::new(LlmConfig {
        base_url,
        api_key: Some("sk-test".to_string()),
        model: "test-model".to_string(),
        max_retries,
        ..LlmConfig::default()
    })
}

#[test]
fn model_name_comes_from_config() {
    assert_eq!(client("http://127.0.0.1:9".to_string(), 0).model(), "test-model");
}

#[tokio::test]
async fn sends_prompt_and_returns_content() {
    let (base, server) = serve(vec![(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"{\"summary\":\"ok\"}"}}]}"#,
    )])
    .await;

    let reply = client(base, 0).complete("sys", "paper text").await.unwrap();
    assert_eq!(reply, r#"{"summary":"ok"}"#);

    let requests = server.await.unwrap();
    let req = &requests[0];
    assert!(req.starts_with("POST /v1/chat/completions"));
    assert!(req.to_ascii_lowercase().contains("authorization: bearer sk-test"));
    assert!(req.contains(r#""model":"test-model""#));
    assert!(req.contains(r#""temperature":0.0"#));
    assert!(req.contains(r#""content":"paper text""#));
}

#[tokio::test]
async fn client_error_not_retried() {
    let (base, server) = serve(vec![(400, r#"{"error":"context too long"}"#)]).await;

    let err = client(base, 3).complete("sys", "x").await.unwrap_err();
    match err {
        ItemError::Http(e) => {
            assert_eq!(e.status, Some(400));
            assert!(e.message.contains("context too long"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(server.await.unwrap().len(), 1);
}

#[tokio::test]
async fn rate_limit_retried() {
    let (base, server) = serve(vec![
        (429, r#"{"error":"slow down"}"#),
        (200, r#"{"choices":[{"message":{"content":"done"}}]}"#),
    ])
    .await;

    let reply = client(base, 2).complete("sys", "x").await.unwrap();
    assert_eq!(reply, "done");
    assert_eq!(server.await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_choices_is_parse_error() {
    let (base, _server) = serve(vec![(200, r#"{"choices":[]}"#)]).await;
    let err = client(base, 0).complete("sys", "x").await.unwrap_err();
    assert!(matches!(err, ItemError::Parse(_)));
}
