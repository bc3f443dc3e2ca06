//! Correlated script calls to the embedding host.
//!
//! Every call gets a fresh id and a slot in the pending table. The host
//! answers with a [`HostCompletion`] carrying that id; [`HostCompleter::complete`]
//! is the only place replies are routed.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// One script invocation handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRequest {
    pub id: Uuid,
    pub script: String,
    pub payload: String,
}

/// The host's answer to a [`HostRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCompletion {
    pub id: Uuid,
    #[serde(flatten)]
    pub outcome: HostOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOutcome {
    Response(String),
    Error(String),
}

impl HostCompletion {
    pub fn response(id: Uuid, payload: impl Into<String>) -> Self {
        Self {
            id,
            outcome: HostOutcome::Response(payload.into()),
        }
    }

    pub fn error(id: Uuid, message: impl Into<String>) -> Self {
        Self {
            id,
            outcome: HostOutcome::Error(message.into()),
        }
    }
}

/// Delivers requests to the host. Replies come back separately through a
/// [`HostCompleter`].
pub trait HostTransport: Send + Sync {
    fn send(&self, request: &HostRequest) -> Result<()>;
}

/// Writes each request as one JSON line, e.g. to stdout for a host process
/// driving this one over pipes.
pub struct JsonLinesTransport<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> HostTransport for JsonLinesTransport<W> {
    fn send(&self, request: &HostRequest) -> Result<()> {
        let line = serde_json::to_string(request)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}

type Reply = std::result::Result<String, String>;

/// Routes host replies to whoever is awaiting them. Cheap to clone.
#[derive(Clone, Default)]
pub struct HostCompleter {
    pending: Arc<Mutex<HashMap<Uuid, oneshot::Sender<Reply>>>>,
}

impl HostCompleter {
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, oneshot::Sender<Reply>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, id: Uuid, tx: oneshot::Sender<Reply>) {
        self.lock().insert(id, tx);
    }

    fn forget(&self, id: Uuid) {
        self.lock().remove(&id);
    }

    /// Resolve the pending request named by `completion.id`.
    pub fn complete(&self, completion: HostCompletion) -> Result<()> {
        let Some(tx) = self.lock().remove(&completion.id) else {
            warn!("Host completion for unknown request {}", completion.id);
            return Err(AppError::UnknownCorrelation(completion.id));
        };

        let reply = match completion.outcome {
            HostOutcome::Response(payload) => Ok(payload),
            HostOutcome::Error(message) => Err(message),
        };

        if tx.send(reply).is_err() {
            debug!("Requester for {} stopped waiting", completion.id);
        }
        Ok(())
    }

    /// Decode one JSON completion as sent by the host and resolve it.
    pub fn complete_json(&self, text: &str) -> Result<()> {
        let completion: HostCompletion = serde_json::from_str(text)?;
        self.complete(completion)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }
}

/// Clears a request's table entry however the call ends, including when the
/// caller stops awaiting it.
struct PendingSlot<'a> {
    completer: &'a HostCompleter,
    id: Uuid,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.completer.forget(self.id);
    }
}

/// Issues script calls through a transport and awaits their replies.
pub struct HostDispatcher<T> {
    transport: T,
    completer: HostCompleter,
}

impl<T: HostTransport> HostDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            completer: HostCompleter::default(),
        }
    }

    /// Handle for feeding host replies back in.
    pub fn completer(&self) -> HostCompleter {
        self.completer.clone()
    }

    /// Run `script` on the host with `payload` and wait for its answer.
    ///
    /// There is no timeout: the call lasts until the host replies.
    pub async fn perform_script(&self, script: &str, payload: String) -> Result<String> {
        let request = HostRequest {
            id: Uuid::new_v4(),
            script: script.to_string(),
            payload,
        };
        let (tx, rx) = oneshot::channel();
        self.completer.register(request.id, tx);
        let _pending = PendingSlot {
            completer: &self.completer,
            id: request.id,
        };

        debug!("Host request {} -> '{}'", request.id, request.script);
        self.transport.send(&request)?;

        match rx.await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(message)) => Err(AppError::Host(message)),
            Err(_) => Err(AppError::host(format!(
                "Request {} was dropped without a reply",
                request.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    /// Forwards requests to the test body so it can answer them.
    struct ChannelTransport(mpsc::UnboundedSender<HostRequest>);

    impl HostTransport for ChannelTransport {
        fn send(&self, request: &HostRequest) -> Result<()> {
            self.0
                .send(request.clone())
                .map_err(|_| AppError::HostUnavailable("channel closed".into()))
        }
    }

    struct FailingTransport;

    impl HostTransport for FailingTransport {
        fn send(&self, _request: &HostRequest) -> Result<()> {
            Err(AppError::HostUnavailable("no host".into()))
        }
    }

    #[tokio::test]
    async fn test_reply_reaches_caller() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = HostDispatcher::new(ChannelTransport(tx));
        let completer = dispatcher.completer();

        tokio::spawn(async move {
            let request = rx.recv().await.unwrap();
            assert_eq!(request.script, "js * fetchData");
            completer
                .complete(HostCompletion::response(request.id, format!("echo:{}", request.payload)))
                .unwrap();
        });

        let reply = dispatcher.perform_script("js * fetchData", "ping".into()).await.unwrap();
        assert_eq!(reply, "echo:ping");
        assert_eq!(dispatcher.completer().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_order_replies_are_matched_by_id() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = HostDispatcher::new(ChannelTransport(tx));
        let completer = dispatcher.completer();

        tokio::spawn(async move {
            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            completer
                .complete(HostCompletion::response(second.id, second.payload.clone()))
                .unwrap();
            completer
                .complete(HostCompletion::response(first.id, first.payload.clone()))
                .unwrap();
        });

        let (a, b) = tokio::join!(
            dispatcher.perform_script("s", "a".into()),
            dispatcher.perform_script("s", "b".into())
        );
        assert_eq!(a.unwrap(), "a");
        assert_eq!(b.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_host_error_is_surfaced() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = HostDispatcher::new(ChannelTransport(tx));
        let completer = dispatcher.completer();

        tokio::spawn(async move {
            let request = rx.recv().await.unwrap();
            completer
                .complete(HostCompletion::error(request.id, "Script not found"))
                .unwrap();
        });

        let err = dispatcher.perform_script("missing", String::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Host(ref m) if m == "Script not found"));
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_nothing_pending() {
        let dispatcher = HostDispatcher::new(FailingTransport);
        let err = dispatcher.perform_script("s", String::new()).await.unwrap_err();
        assert!(matches!(err, AppError::HostUnavailable(_)));
        assert_eq!(dispatcher.completer().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_call_leaves_nothing_pending() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = HostDispatcher::new(ChannelTransport(tx));

        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            dispatcher.perform_script("s", "never answered".into()),
        )
        .await;
        assert!(waited.is_err());
        assert_eq!(dispatcher.completer().pending_count(), 0);

        // a reply that shows up afterwards has nobody to go to
        let request = rx.recv().await.unwrap();
        let err = dispatcher
            .completer()
            .complete(HostCompletion::response(request.id, "late"))
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownCorrelation(_)));
    }

    #[test]
    fn test_unknown_completion_is_rejected() {
        let completer = HostCompleter::default();
        let id = Uuid::new_v4();
        let err = completer.complete(HostCompletion::response(id, "late")).unwrap_err();
        assert!(matches!(err, AppError::UnknownCorrelation(got) if got == id));
    }

    #[test]
    fn test_completion_json_shape() {
        let id = Uuid::nil();
        let json = serde_json::to_string(&HostCompletion::response(id, "{}")).unwrap();
        assert_eq!(json, r#"{"id":"00000000-0000-0000-0000-000000000000","response":"{}"}"#);

        let parsed: HostCompletion =
            serde_json::from_str(r#"{"id":"00000000-0000-0000-0000-000000000000","error":"boom"}"#).unwrap();
        assert_eq!(parsed.outcome, HostOutcome::Error("boom".into()));
    }

    #[test]
    fn test_json_lines_transport_writes_one_line_per_request() {
        let transport = JsonLinesTransport::new(Vec::new());
        let request = HostRequest {
            id: Uuid::nil(),
            script: "js * print".into(),
            payload: "<html></html>".into(),
        };
        transport.send(&request).unwrap();
        transport.send(&request).unwrap();

        let written = transport.writer.into_inner().unwrap();
        let text = String::from_utf8(written).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let decoded: HostRequest = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(decoded, request);
    }
}
