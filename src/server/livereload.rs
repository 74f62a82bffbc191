// src/server/livereload.rs

//! Live-reload channel between the pipeline and connected browsers.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

/// Path of the server-sent-events endpoint browsers subscribe to.
pub const EVENTS_PATH: &str = "/__livereload";

/// Path of the client script injected into HTML pages.
pub const SCRIPT_PATH: &str = "/__livereload.js";

/// Client side: reload the page on every `reload` event.
pub const CLIENT_SCRIPT: &str = r#"(function () {
  var source = new EventSource("/__livereload");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
})();
"#;

/// Tag inserted before `</body>` of served HTML pages.
pub const SCRIPT_TAG: &str = r#"<script src="/__livereload.js"></script>"#;

/// Cloneable sender half of the reload broadcast.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<()>,
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self { tx }
    }

    /// Ask every connected client to refresh. Returns the number of clients
    /// notified; zero subscribers is not an error.
    pub fn reload(&self) -> usize {
        let clients = self.tx.send(()).unwrap_or(0);
        debug!(clients, "live reload broadcast");
        clients
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// SSE response streaming one `reload` event per broadcast.
    pub fn event_stream(&self) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
        // Lagged receivers just skip ahead; a reload is a reload.
        let stream = BroadcastStream::new(self.subscribe())
            .filter_map(|msg| msg.ok().map(|()| Ok(Event::default().event("reload").data("reload"))));
        Sse::new(stream).keep_alive(KeepAlive::default())
    }
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert the client script tag before the last `</body>`, or append it.
pub fn inject_script(html: &str) -> String {
    match html.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + SCRIPT_TAG.len());
            out.push_str(&html[..idx]);
            out.push_str(SCRIPT_TAG);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{SCRIPT_TAG}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_goes_before_closing_body() {
        let out = inject_script("<html><body><p>x</p></body></html>");
        assert_eq!(
            out,
            "<html><body><p>x</p><script src=\"/__livereload.js\"></script></body></html>"
        );
        assert!(inject_script("<p>fragment</p>").ends_with(SCRIPT_TAG));
    }

    #[tokio::test]
    async fn reload_reaches_every_subscriber() {
        let lr = LiveReload::new();
        assert_eq!(lr.reload(), 0);

        let mut a = lr.subscribe();
        let mut b = lr.subscribe();
        assert_eq!(lr.reload(), 2);
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }
}
