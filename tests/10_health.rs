mod common;

use anyhow::Result;
use reqwest::StatusCode;

use common::TestServer;

#[tokio::test]
async fn health_and_home() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server.get_json("/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");

    let (status, body) = server.get_json("/").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "clientdb");
    assert!(body["endpoints"]["clients"].is_string());

    Ok(())
}

#[tokio::test]
async fn cors_mirrors_origin_and_exposes_count() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client
        .get(server.url("/api/clients"))
        .header("Origin", "http://localhost:5173")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://localhost:5173");
    assert_eq!(headers["access-control-allow-credentials"], "true");
    let exposed = headers["access-control-expose-headers"].to_str()?.to_ascii_lowercase();
    assert!(exposed.contains("x-total-count"), "exposed headers: {}", exposed);

    Ok(())
}
