mod common;

use common::{MockServer, Reply};
use rawhttp::base::neterror::NetError;
use rawhttp::{fetch_with_redirects, Client, OrderedHeaderMap, URLRequestContext};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_keep_alive_reuses_connection() {
    let server = MockServer::start(|_| Reply::ok("hello")).await;
    let context = URLRequestContext::new();
    let headers = OrderedHeaderMap::new();

    for _ in 0..3 {
        let body = fetch_with_redirects(&context, &server.url("/"), 5, &headers).await.unwrap();
        assert_eq!(&body[..], b"hello");
    }

    let pool = context.socket_pool();
    assert_eq!(pool.dial_count(), 1);
    assert_eq!(pool.reuse_count(), 2);
    assert_eq!(pool.idle_socket_count(), 1);
    assert_eq!(server.accept_count(), 1);
}

#[tokio::test]
async fn test_connection_close_forces_new_dial() {
    let server = MockServer::start(|_| {
        Reply::response("200 OK", &[("Connection", "close")], b"bye").close()
    })
    .await;
    let context = URLRequestContext::new();
    let headers = OrderedHeaderMap::new();

    fetch_with_redirects(&context, &server.url("/"), 5, &headers).await.unwrap();
    assert_eq!(context.socket_pool().idle_socket_count(), 0);
    fetch_with_redirects(&context, &server.url("/"), 5, &headers).await.unwrap();

    assert_eq!(context.socket_pool().dial_count(), 2);
    assert_eq!(context.socket_pool().discard_count(), 2);
    assert_eq!(server.accept_count(), 2);
}

#[tokio::test]
async fn test_not_modified_with_connection_close_discards_socket() {
    let server = MockServer::start(|req| {
        if req.index == 0 {
            Reply::response("200 OK", &[("ETag", "\"c1\"")], b"kept body")
        } else {
            Reply::raw("HTTP/1.1 304 Not Modified\r\nConnection: close\r\n\r\n").close()
        }
    })
    .await;
    let context = URLRequestContext::new();
    let url = server.url("/");
    let headers = OrderedHeaderMap::new();

    fetch_with_redirects(&context, &url, 5, &headers).await.unwrap();
    assert_eq!(context.socket_pool().idle_socket_count(), 1);

    let body = fetch_with_redirects(&context, &url, 5, &headers).await.unwrap();
    assert_eq!(&body[..], b"kept body");
    assert_eq!(context.socket_pool().idle_socket_count(), 0);
    assert_eq!(context.socket_pool().reuse_count(), 1);
    assert_eq!(context.socket_pool().discard_count(), 1);
}

#[tokio::test]
async fn test_http10_without_keep_alive_is_not_pooled() {
    let server = MockServer::start(|_| {
        Reply::raw("HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nok").close()
    })
    .await;
    let context = URLRequestContext::new();

    let body = fetch_with_redirects(&context, &server.url("/"), 5, &OrderedHeaderMap::new())
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");
    assert_eq!(context.socket_pool().idle_socket_count(), 0);
}

#[tokio::test]
async fn test_close_delimited_body_discards_socket() {
    let server =
        MockServer::start(|_| Reply::raw("HTTP/1.1 200 OK\r\n\r\nuntil the end").close()).await;
    let context = URLRequestContext::new();

    let body = fetch_with_redirects(&context, &server.url("/"), 5, &OrderedHeaderMap::new())
        .await
        .unwrap();
    assert_eq!(&body[..], b"until the end");
    assert_eq!(context.socket_pool().idle_socket_count(), 0);
    assert_eq!(context.socket_pool().discard_count(), 1);
}

#[tokio::test]
async fn test_leftover_bytes_discard_socket() {
    let server = MockServer::start(|_| {
        Reply::raw("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nokGARBAGE")
    })
    .await;
    let context = URLRequestContext::new();
    let headers = OrderedHeaderMap::new();

    let body = fetch_with_redirects(&context, &server.url("/"), 5, &headers).await.unwrap();
    assert_eq!(&body[..], b"ok");
    fetch_with_redirects(&context, &server.url("/"), 5, &headers).await.unwrap();
    assert_eq!(context.socket_pool().dial_count(), 2);
}

#[tokio::test]
async fn test_concurrent_requests_get_distinct_sockets() {
    let server = MockServer::start(|_| Reply::ok("slow").delay(Duration::from_millis(100))).await;
    let context = Arc::new(URLRequestContext::new());

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let context = context.clone();
            let url = server.url(&format!("/item/{i}"));
            tokio::spawn(async move {
                fetch_with_redirects(&context, &url, 5, &OrderedHeaderMap::new()).await
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(&task.await.unwrap().unwrap()[..], b"slow");
    }

    assert_eq!(server.accept_count(), 4);
    assert_eq!(context.socket_pool().dial_count(), 4);
    assert_eq!(context.socket_pool().idle_socket_count(), 4);
}

#[tokio::test]
async fn test_idle_cap_per_origin() {
    let server = MockServer::start(|_| Reply::ok("x").delay(Duration::from_millis(50))).await;
    let client = Client::builder().max_idle_per_origin(2).build().unwrap();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            let url = server.url("/");
            tokio::spawn(async move { client.get(url).send().await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let pool = client.context().socket_pool();
    assert_eq!(pool.idle_socket_count(), 2);
    assert_eq!(pool.discard_count(), 2);
}

#[tokio::test]
async fn test_stale_reused_socket_is_retried_once() {
    // Second request on the first connection gets no answer.
    let server = MockServer::start(|req| match req.index {
        0 => Reply::ok("first"),
        1 => Reply::hangup(),
        _ => Reply::ok("second"),
    })
    .await;
    let context = URLRequestContext::new();
    let headers = OrderedHeaderMap::new();

    let first = fetch_with_redirects(&context, &server.url("/"), 5, &headers).await.unwrap();
    let second = fetch_with_redirects(&context, &server.url("/"), 5, &headers).await.unwrap();

    assert_eq!(&first[..], b"first");
    assert_eq!(&second[..], b"second");
    assert_eq!(server.request_count(), 3);
    assert_eq!(server.accept_count(), 2);
    assert_eq!(context.socket_pool().dial_count(), 2);
}

#[tokio::test]
async fn test_fresh_socket_failure_is_not_retried() {
    let server = MockServer::start(|_| Reply::hangup()).await;
    let context = URLRequestContext::new();

    let err = fetch_with_redirects(&context, &server.url("/"), 5, &OrderedHeaderMap::new())
        .await
        .unwrap_err();
    assert!(
        matches!(err, NetError::EmptyResponse | NetError::ConnectionReset),
        "unexpected error: {err:?}"
    );
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn test_idle_socket_closed_by_server_is_skipped() {
    // Server closes right after a keep-alive response.
    let server = MockServer::start(|_| Reply::ok("once").close()).await;
    let context = URLRequestContext::new();
    let headers = OrderedHeaderMap::new();

    fetch_with_redirects(&context, &server.url("/"), 5, &headers).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let body = fetch_with_redirects(&context, &server.url("/"), 5, &headers).await.unwrap();

    assert_eq!(&body[..], b"once");
    assert_eq!(server.request_count(), 2);
    assert_eq!(context.socket_pool().dial_count(), 2);
}
