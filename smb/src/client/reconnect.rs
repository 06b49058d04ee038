use bytes::Bytes;
use tracing::{info, trace};

use smb_core::{SMBFromBytes, SMBResult};
use smb_core::error::SMBError;
use smb_core::nt_status::NTStatus;

use crate::client::connection::SMBConnection;
use crate::client::request::SMBRequestOutcome;
use crate::protocol::body::SMBRequestBody;
use crate::protocol::body::error::SMBErrorResponse;
use crate::protocol::header::SMBSyncHeader;
use crate::transport::SMBTransportFactory;

impl<F: SMBTransportFactory> SMBConnection<F> {
    /// Run one high-level operation under the reconnection policy. The
    /// builder is invoked per attempt so the request is re-marshalled
    /// from typed arguments against current session/tree/file ids; bytes
    /// from before the reset are never resent. At most one resend per
    /// operation; a second reset surfaces `Disconnected`.
    pub(crate) async fn run_operation<B>(
        &self,
        command: &'static str,
        mut build: B,
    ) -> SMBResult<(SMBSyncHeader, Bytes)>
    where
        B: AsyncFnMut(&Self) -> SMBResult<(u32, SMBRequestBody)>,
    {
        let mut resent = false;
        loop {
            let (tree_id, body) = build(self).await?;
            match self.issue(tree_id, body).await? {
                SMBRequestOutcome::Completed { header, body } => {
                    if NTStatus::severity_is_error(header.status) {
                        if let Ok((_, error_body)) = SMBErrorResponse::smb_from_bytes(&body) {
                            trace!(
                                status = header.status,
                                context_count = error_body.error_context_count,
                                "server returned an error body"
                            );
                        }
                    }
                    return Ok((header, body));
                }
                SMBRequestOutcome::LegacyReply => {
                    return Err(SMBError::malformed_reply("SMB1 reply outside negotiate"));
                }
                SMBRequestOutcome::Reconnected => {
                    if resent {
                        return Err(SMBError::disconnected(command));
                    }
                    resent = true;
                    self.reestablish().await?;
                }
            }
        }
    }

    /// Rebuild the stack after a transport reset: fresh transport, then
    /// negotiate, session setup with the stored auth collaborator, tree
    /// reconnects, and durable-handle reclaim. Serialized so concurrent
    /// failed callers recover once.
    pub(crate) async fn reestablish(&self) -> SMBResult<()> {
        let _guard = self.inner.reconnect_lock.lock().await;
        if self.inner.state.read().await.connected {
            return Ok(());
        }
        info!("re-establishing after transport reset");
        self.establish_transport().await.map_err(|error| {
            SMBError::disconnected(format!("transport reconnect failed: {}", error))
        })?;
        // the legacy probe ran its course on first contact; go straight
        // to the multi-dialect negotiate now
        self.negotiate_internal(false).await?;
        let provider = { self.inner.auth.lock().await.clone() };
        if let Some(provider) = provider {
            if self.session_setup_internal(provider).await?.is_none() {
                return Err(SMBError::disconnected("session_setup"));
            }
        }
        self.reconnect_trees().await?;
        self.reclaim_durable_opens().await?;
        info!("connection re-established");
        Ok(())
    }
}
