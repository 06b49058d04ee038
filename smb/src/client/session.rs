use std::sync::Arc;

use tracing::{debug, info};

use smb_core::{SMBFromBytes, SMBResult};
use smb_core::error::SMBError;
use smb_core::nt_status::NTStatus;

use crate::client::connection::{SMBConnection, SMBSessionState, check_status};
use crate::client::request::SMBRequestOutcome;
use crate::protocol::body::SMBRequestBody;
use crate::protocol::body::capabilities::Capabilities;
use crate::protocol::body::logoff::{SMBLogoffRequest, SMBLogoffResponse};
use crate::protocol::body::session_setup::{
    SMBSessionFlags, SMBSessionSetupRequest, SMBSessionSetupResponse,
};
use crate::transport::SMBTransportFactory;
use crate::util::auth::AuthProvider;

impl<F: SMBTransportFactory> SMBConnection<F> {
    /// Drive the multi-leg authentication handshake. Each leg forwards
    /// the server's blob to the auth collaborator and sends whatever it
    /// produces next; the engine never interprets token contents.
    pub async fn session_setup(&self, provider: Arc<dyn AuthProvider>) -> SMBResult<SMBSessionFlags> {
        // stored up front so re-establishment can redo the handshake
        *self.inner.auth.lock().await = Some(provider.clone());
        match self.session_setup_internal(provider).await? {
            Some(flags) => Ok(flags),
            None => {
                // reset mid-handshake: re-establishment reruns the legs
                self.reestablish().await?;
                let state = self.inner.state.read().await;
                state
                    .session
                    .as_ref()
                    .filter(|session| session.established)
                    .map(|session| session.flags)
                    .ok_or_else(|| SMBError::disconnected("session_setup"))
            }
        }
    }

    /// Run the setup legs once. `Ok(None)` reports a transport reset so
    /// the caller decides whether to recover; called from inside
    /// re-establishment, where recursing would deadlock the reconnect
    /// lock.
    pub(crate) async fn session_setup_internal(
        &self,
        provider: Arc<dyn AuthProvider>,
    ) -> SMBResult<Option<SMBSessionFlags>> {
        let initial_blob = {
            let state = self.inner.state.read().await;
            state
                .negotiated
                .as_ref()
                .map(|negotiated| negotiated.security_blob.clone())
                .ok_or_else(|| SMBError::precondition_failed("session setup before negotiate"))?
        };
        let mut server_token: Option<Vec<u8>> = if initial_blob.is_empty() {
            None
        } else {
            Some(initial_blob)
        };
        loop {
            let token = provider.next_token(server_token.as_deref())?;
            let body = SMBRequestBody::SessionSetup(SMBSessionSetupRequest {
                security_mode: self.client_security_mode().bits() as u8,
                capabilities: Capabilities::empty(),
                previous_session_id: 0,
                security_token: token,
            });
            match self.issue(0, body).await? {
                SMBRequestOutcome::Completed { header, body } => {
                    if header.status == NTStatus::MoreProcessingRequired as u32 {
                        let (_, response) = SMBSessionSetupResponse::smb_from_bytes(&body)?;
                        debug!(
                            session_id = header.session_id,
                            blob_len = response.security_token.len(),
                            "session setup continues"
                        );
                        {
                            let mut state = self.inner.state.write().await;
                            state.session = Some(SMBSessionState {
                                session_id: header.session_id,
                                flags: response.session_flags,
                                established: false,
                            });
                        }
                        server_token = Some(response.security_token);
                        continue;
                    }
                    check_status(&header, "session_setup")?;
                    let (_, response) = SMBSessionSetupResponse::smb_from_bytes(&body)?;
                    {
                        let mut state = self.inner.state.write().await;
                        state.session = Some(SMBSessionState {
                            session_id: header.session_id,
                            flags: response.session_flags,
                            established: true,
                        });
                    }
                    info!(session_id = header.session_id, "session established");
                    return Ok(Some(response.session_flags));
                }
                SMBRequestOutcome::LegacyReply => {
                    return Err(SMBError::malformed_reply("SMB1 reply outside negotiate"));
                }
                SMBRequestOutcome::Reconnected => return Ok(None),
            }
        }
    }

    /// Tear the session down. Session and tree ids are invalid afterward
    /// until a fresh setup; handles under them die too.
    pub async fn logoff(&self) -> SMBResult<()> {
        let established = {
            let state = self.inner.state.read().await;
            state
                .session
                .as_ref()
                .map(|session| session.established)
                .unwrap_or(false)
        };
        if !established {
            return Ok(());
        }
        match self.issue(0, SMBRequestBody::LogOff(SMBLogoffRequest)).await? {
            SMBRequestOutcome::Completed { header, body } => {
                check_status(&header, "logoff")?;
                SMBLogoffResponse::smb_from_bytes(&body)?;
            }
            // a reset tears the session down just as thoroughly
            _other => {}
        }
        {
            let mut state = self.inner.state.write().await;
            state.session = None;
        }
        {
            let mut trees = self.inner.trees.lock().await;
            for tree in trees.values_mut() {
                tree.connected = false;
            }
        }
        {
            let mut opens = self.inner.opens.lock().await;
            for open in opens.values_mut() {
                open.valid = false;
            }
        }
        info!("logged off");
        Ok(())
    }
}
