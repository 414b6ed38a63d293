//! Keep-alive HTTP endpoint.
//!
//! Some hosts suspend idle processes unless something answers HTTP
//! probes. This serves a fixed 200 response to any request; it carries
//! no application state.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

const RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK";

/// Accept probe connections forever, answering each with a fixed 200.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Keep-alive endpoint listening on port {}", port);

    loop {
        let (mut stream, peer) = listener.accept().await?;
        tokio::spawn(async move {
            let mut buffer = [0u8; 512];
            // Drain whatever request line arrives; content is irrelevant.
            let _ = stream.read(&mut buffer).await;
            if let Err(e) = stream.write_all(RESPONSE).await {
                debug!("Keep-alive reply to {} failed: {}", peer, e);
            }
            let _ = stream.shutdown().await;
        });
    }
}
