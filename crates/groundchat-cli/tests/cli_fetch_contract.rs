mod common;

use axum::{http::header, routing::get, Router};

async fn run_fetch(args: &[&str]) -> std::process::Output {
    let bin = assert_cmd::cargo::cargo_bin!("groundchat");
    let mut cmd = tokio::process::Command::new(bin);
    common::hermetic(&mut cmd)
        .arg("fetch")
        .args(args)
        .output()
        .await
        .expect("run groundchat fetch")
}

fn pages() -> Router {
    Router::new()
        .route(
            "/article",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    "<html><body><h1>Title</h1><script>track()</script><p>Body text</p></body></html>",
                )
            }),
        )
        .route(
            "/app",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    "<html><body><div id=root></div><script>render()</script></body></html>",
                )
            }),
        )
}

#[tokio::test]
async fn static_page_is_served_by_the_static_tier() {
    let addr = common::serve(pages()).await;
    let out = run_fetch(&[&format!("http://{addr}/article")]).await;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stdout));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse fetch json");
    assert_eq!(v["kind"].as_str(), Some("fetch"));
    assert_eq!(v["tier"].as_str(), Some("static"));
    assert_eq!(v["status"].as_u64(), Some(200));
    assert_eq!(v["text"].as_str(), Some("Title\nBody text"));
}

#[tokio::test]
async fn script_only_page_needs_the_browser_tier() {
    let addr = common::serve(pages()).await;
    let out = run_fetch(&[&format!("http://{addr}/app")]).await;
    assert!(!out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse fetch json");
    assert_eq!(v["ok"].as_bool(), Some(false));
    assert_eq!(v["error"]["code"].as_str(), Some("not_configured"));
}

#[tokio::test]
async fn static_mode_reports_no_visible_text() {
    let addr = common::serve(pages()).await;
    let out = run_fetch(&[&format!("http://{addr}/app"), "--mode", "static"]).await;
    assert!(!out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse fetch json");
    assert_eq!(v["error"]["code"].as_str(), Some("no_visible_text"));
}

#[tokio::test]
async fn unknown_mode_is_rejected() {
    let out = run_fetch(&["http://127.0.0.1:9/", "--mode", "turbo"]).await;
    assert!(!out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse fetch json");
    assert_eq!(v["error"]["code"].as_str(), Some("not_supported"));
}
