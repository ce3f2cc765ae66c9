use anyhow::Result;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::host::storage::document_storage::DocumentStorage;

use super::{router::Router, HostEvent, Outcome, OutboundMessage, Request, Response};

/// Serves front-end requests one at a time. A request is always answered before the next one is
/// read, so store updates never interleave.
pub struct IpcServer<S: DocumentStorage> {
    router: Router<S>,
    shutdown: CancellationToken,
}

impl<S: DocumentStorage> IpcServer<S> {
    pub fn new(router: Router<S>, shutdown: CancellationToken) -> Self {
        Self { router, shutdown }
    }

    /// Executes the server loop until the front-end closes `input` or shutdown is requested.
    /// Either way the shutdown token is cancelled on exit, so the rest of the host stops as well.
    pub async fn run(
        mut self,
        input: impl AsyncBufRead + Unpin,
        mut output: impl AsyncWrite + Unpin,
        mut events: mpsc::UnboundedReceiver<HostEvent>,
    ) -> Result<Router<S>> {
        let mut lines = input.lines();
        let result = loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, closing front-end channel");
                    break Ok(());
                }
                Some(event) = events.recv() => {
                    debug!("Sending event {:?}", event);
                    if let Err(e) = write_message(&mut output, &OutboundMessage::Event(event)).await {
                        break Err(e);
                    }
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let response = self.handle_line(&line).await;
                        if let Err(e) = write_message(&mut output, &OutboundMessage::Response(response)).await {
                            break Err(e);
                        }
                    }
                    Ok(None) => {
                        info!("Front-end closed the channel");
                        break Ok(());
                    }
                    Err(e) => break Err(e.into()),
                }
            }
        };

        self.shutdown.cancel();
        result.inspect_err(|e| error!("Front-end channel failed {e:?}"))?;
        Ok(self.router)
    }

    async fn handle_line(&mut self, line: &str) -> Response {
        let request = match serde_json::from_str::<Request>(line) {
            Ok(request) => request,
            Err(e) => {
                error!("Malformed request {line}: {e}");
                return Response {
                    id: None,
                    outcome: Outcome::Err(format!("malformed request: {e}")),
                };
            }
        };

        let span = info_span!("request", id = request.id, channel = %request.channel);
        let outcome = match self
            .router
            .dispatch(&request.channel, request.payload)
            .instrument(span)
            .await
        {
            Ok(value) => Outcome::Ok(value),
            Err(e) => {
                error!("Request {} on {} failed: {e}", request.id, request.channel);
                Outcome::Err(e.to_string())
            }
        };

        Response {
            id: Some(request.id),
            outcome,
        }
    }
}

async fn write_message(
    output: &mut (impl AsyncWrite + Unpin),
    message: &OutboundMessage,
) -> Result<()> {
    let mut buffer = serde_json::to_vec(message)?;
    buffer.push(b'\n');
    output.write_all(&buffer).await?;
    output.flush().await?;
    Ok(())
}
