//! Fetch a URL, following redirects, and fetch it again to show cache
//! revalidation and connection reuse.
//!
//! ```text
//! RUST_LOG=rawhttp=debug cargo run --example fetch -- https://example.com [config.json]
//! ```

use rawhttp::{Client, OrderedHeaderMap, URLRequestContextConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rawhttp=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "https://example.com/".to_string());
    let config = match args.next() {
        Some(path) => URLRequestContextConfig::from_file(path)?,
        None => URLRequestContextConfig::default(),
    };
    let max_redirects = config.max_redirects;

    let client = Client::builder().config(config).build()?;
    let headers = OrderedHeaderMap::new().with("User-Agent", "rawhttp-demo/0.1")?;

    let body = client.fetch_with_redirects(&url, max_redirects, &headers).await?;
    println!("first fetch: {} bytes", body.len());

    // Second round goes out with If-None-Match / If-Modified-Since.
    let again = client.fetch_with_redirects(&url, max_redirects, &headers).await?;
    println!("second fetch: {} bytes (identical: {})", again.len(), again == body);

    let pool = client.context().socket_pool();
    println!(
        "connections dialed: {}, reused: {}, idle now: {}",
        pool.dial_count(),
        pool.reuse_count(),
        pool.idle_socket_count()
    );

    let preview = String::from_utf8_lossy(&body[..body.len().min(200)]);
    println!("{preview}");
    Ok(())
}
