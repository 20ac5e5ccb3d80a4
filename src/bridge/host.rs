//! [`Host`] implementation that forwards calls to the host shim.
//!
//! Each capability becomes an outbound `host/<capability>` request. The
//! bridge then reads lines until the matching reply arrives; anything else
//! the shim sends in the meantime is parked in a deferred queue and
//! handled by the server once the session is over.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, warn};

use crate::bridge::protocol::{
    parse_message, IncomingMessage, JsonRpcReply, OutgoingNotification, OutgoingRequest,
    RequestId, HOST_NOT_FOUND,
};
use crate::bridge::transport::LineTransport;
use crate::host::{
    DataFile, DocumentHandle, Host, HostError, HostResult, OccurrenceId, Transform, Urn,
};

/// Largest deviation from unit length or perpendicularity the host accepts.
const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Host capabilities reached over the bridge transport.
pub struct RpcHost<'t, R, W> {
    transport: &'t mut LineTransport<R, W>,
    next_id: &'t mut i64,
    deferred: &'t mut VecDeque<String>,
    timeout: Duration,
}

impl<'t, R, W> RpcHost<'t, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Borrows the transport for the duration of one session.
    ///
    /// `next_id` is the connection-wide counter for outbound request IDs;
    /// unrelated inbound lines are pushed onto `deferred`.
    pub fn new(
        transport: &'t mut LineTransport<R, W>,
        next_id: &'t mut i64,
        deferred: &'t mut VecDeque<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            next_id,
            deferred,
            timeout,
        }
    }

    /// Sends a request and decodes the reply's result.
    async fn call<T: DeserializeOwned>(&mut self, method: &'static str, params: Value) -> HostResult<T> {
        let result = self.call_raw(method, params).await?;
        serde_json::from_value(result).map_err(|e| HostError::malformed(method, e.to_string()))
    }

    /// Sends a request and returns the reply's raw result.
    async fn call_raw(&mut self, method: &'static str, params: Value) -> HostResult<Value> {
        *self.next_id += 1;
        let id = *self.next_id;

        debug!(id, method, "Calling host");
        self.transport
            .write_request(&OutgoingRequest::new(id, method, params))
            .await
            .map_err(HostError::transport)?;

        let reply = tokio::time::timeout(self.timeout, self.await_reply(id))
            .await
            .map_err(|_| HostError::Timeout {
                operation: method.to_string(),
                seconds: self.timeout.as_secs(),
            })??;

        match reply.error {
            Some(error) if error.code == HOST_NOT_FOUND => Err(HostError::not_found(error.message)),
            Some(error) => Err(HostError::rejected(method, error.message)),
            None => Ok(reply.result.unwrap_or(Value::Null)),
        }
    }

    /// Reads lines until the reply to `id` arrives.
    async fn await_reply(&mut self, id: i64) -> HostResult<JsonRpcReply> {
        let expected = RequestId::Number(id);
        loop {
            let Some(line) = self
                .transport
                .read_line()
                .await
                .map_err(HostError::transport)?
            else {
                return Err(HostError::Disconnected);
            };

            if line.trim().is_empty() {
                continue;
            }

            match parse_message(&line) {
                Ok(IncomingMessage::Reply(reply)) if reply.id == expected => return Ok(reply),
                Ok(IncomingMessage::Reply(reply)) => {
                    warn!(id = %reply.id, "Dropping reply to unknown request");
                }
                _ => {
                    debug!("Deferring message received during session");
                    self.deferred.push_back(line);
                }
            }
        }
    }
}

#[async_trait(?Send)]
impl<R, W> Host for RpcHost<'_, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn find_data_file(&mut self, id: &Urn) -> HostResult<DataFile> {
        let found: Option<DataFile> = self.call("host/findDataFile", json!({ "id": id })).await?;
        found.ok_or_else(|| HostError::not_found(id.to_string()))
    }

    async fn list_root_folder(&mut self) -> HostResult<Vec<DataFile>> {
        self.call("host/listRootFolder", json!({})).await
    }

    async fn close_active_document(&mut self) -> HostResult<()> {
        self.call_raw("host/closeActiveDocument", json!({ "save": false }))
            .await
            .map(drop)
    }

    async fn open_document(&mut self, id: &Urn) -> HostResult<DocumentHandle> {
        self.call("host/openDocument", json!({ "id": id })).await
    }

    async fn create_document(
        &mut self,
        name: &str,
        commit_message: &str,
    ) -> HostResult<DocumentHandle> {
        self.call(
            "host/createDocument",
            json!({ "name": name, "commitMessage": commit_message }),
        )
        .await
    }

    async fn save_active_as(&mut self, name: &str) -> HostResult<DocumentHandle> {
        self.call("host/saveActiveAs", json!({ "name": name })).await
    }

    async fn execute_text_command(&mut self, command: &str) -> HostResult<String> {
        let output = self
            .call_raw("host/executeTextCommand", json!({ "command": command }))
            .await?;
        Ok(match output {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    async fn import_step(&mut self, path: &Path) -> HostResult<Vec<OccurrenceId>> {
        self.call(
            "host/importStep",
            json!({ "path": path.to_string_lossy() }),
        )
        .await
    }

    async fn set_occurrence_transform(
        &mut self,
        occurrence: &OccurrenceId,
        transform: &Transform,
    ) -> HostResult<()> {
        if !transform.is_orthonormal(ORTHONORMAL_TOLERANCE) {
            return Err(HostError::rejected(
                "host/setOccurrenceTransform",
                "transform basis is not orthonormal",
            ));
        }
        self.call_raw(
            "host/setOccurrenceTransform",
            json!({ "occurrence": occurrence, "transform": transform }),
        )
        .await
        .map(drop)
    }

    async fn show_message(&mut self, text: &str) -> HostResult<()> {
        let notification = OutgoingNotification::new("host/showMessage", Some(json!({ "text": text })));
        self.transport
            .write_notification(&notification)
            .await
            .map_err(HostError::transport)
    }
}
