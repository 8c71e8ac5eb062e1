//! Local HTTP server standing in for the audio CDN
//!
//! Routes:
//! - `/audio.wav`: the configured bytes
//! - `/empty.wav`: 200 with an empty body
//! - `/stall.wav`: 200, one chunk, then no further data
//! - anything else: 404

use axum::{body::Body, http::header, routing::get, Router};
use futures::stream::{self, StreamExt};
use std::net::SocketAddr;

pub struct SourceServer {
    addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl SourceServer {
    /// Serve `audio` on an ephemeral port
    pub async fn start(audio: Vec<u8>) -> Self {
        let app = Router::new()
            .route(
                "/audio.wav",
                get(move || {
                    let audio = audio.clone();
                    async move { ([(header::CONTENT_TYPE, "audio/wav")], audio) }
                }),
            )
            .route("/empty.wav", get(|| async { Vec::<u8>::new() }))
            .route("/stall.wav", get(|| async { stalled_body() }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    pub fn audio_url(&self) -> String {
        self.url("audio.wav")
    }
}

/// First bytes of a WAV header, then the connection stays open without data
fn stalled_body() -> Body {
    let first = stream::once(async { Ok::<Vec<u8>, std::io::Error>(b"RIFF\0\0\0\0WAVE".to_vec()) });
    Body::from_stream(first.chain(stream::pending()))
}

impl Drop for SourceServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
