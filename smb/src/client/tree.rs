use std::sync::atomic::Ordering;

use tracing::{debug, info};

use smb_core::{SMBFromBytes, SMBResult};
use smb_core::error::SMBError;

use crate::client::connection::{SMBConnection, check_status};
use crate::client::request::SMBRequestOutcome;
use crate::protocol::body::SMBRequestBody;
use crate::protocol::body::tree_connect::{
    SMBAccessMask, SMBShareFlags, SMBShareType, SMBTreeConnectCapabilities, SMBTreeConnectRequest,
    SMBTreeConnectResponse, SMBTreeDisconnectRequest,
};
use crate::transport::SMBTransportFactory;

/// One attached share, keyed by a stable local id. The wire tree id is
/// replaced on reconnect; holders never see it change.
#[derive(Debug, Clone)]
pub(crate) struct SMBTreeState {
    pub(crate) local_id: u32,
    pub(crate) wire_id: u32,
    pub(crate) path: String,
    pub(crate) share_type: SMBShareType,
    pub(crate) share_flags: SMBShareFlags,
    pub(crate) capabilities: SMBTreeConnectCapabilities,
    pub(crate) maximal_access: SMBAccessMask,
    pub(crate) connected: bool,
}

/// Handle to an attached share.
pub struct SMBTreeConnect<F: SMBTransportFactory> {
    pub(crate) connection: SMBConnection<F>,
    pub(crate) local_id: u32,
}

impl<F: SMBTransportFactory> std::fmt::Debug for SMBTreeConnect<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SMBTreeConnect")
            .field("local_id", &self.local_id)
            .finish_non_exhaustive()
    }
}

impl<F: SMBTransportFactory> SMBConnection<F> {
    /// Attach a share. Success marks the tree usable for opens.
    pub async fn tree_connect(&self, server: &str, share: &str) -> SMBResult<SMBTreeConnect<F>> {
        let established = {
            let state = self.inner.state.read().await;
            state
                .session
                .as_ref()
                .map(|session| session.established)
                .unwrap_or(false)
        };
        if !established {
            return Err(SMBError::precondition_failed("tree connect before session setup"));
        }
        let path = format!("\\\\{}\\{}", server, share);
        let request_path = path.clone();
        let (header, body) = self
            .run_operation("tree_connect", async |_connection: &Self| {
                Ok((
                    0u32,
                    SMBRequestBody::TreeConnect(SMBTreeConnectRequest {
                        path: request_path.clone(),
                    }),
                ))
            })
            .await?;
        check_status(&header, "tree_connect")?;
        let (_, response) = SMBTreeConnectResponse::smb_from_bytes(&body)?;
        let local_id = self.inner.next_tree_local.fetch_add(1, Ordering::SeqCst);
        {
            let mut trees = self.inner.trees.lock().await;
            trees.insert(
                local_id,
                SMBTreeState {
                    local_id,
                    wire_id: header.tree_id,
                    path,
                    share_type: response.share_type,
                    share_flags: response.share_flags,
                    capabilities: response.capabilities,
                    maximal_access: response.maximal_access,
                    connected: true,
                },
            );
        }
        info!(
            tree_id = header.tree_id,
            share_type = ?response.share_type,
            "share attached"
        );
        Ok(SMBTreeConnect {
            connection: self.clone(),
            local_id,
        })
    }

    /// Current wire id of a tree, refusing handles that lost their
    /// attachment.
    pub(crate) async fn tree_wire_id(&self, local_id: u32) -> SMBResult<u32> {
        let trees = self.inner.trees.lock().await;
        trees
            .get(&local_id)
            .filter(|tree| tree.connected)
            .map(|tree| tree.wire_id)
            .ok_or_else(|| SMBError::disconnected("tree not attached"))
    }

    /// Re-attach every tree that went down with the transport, mapping
    /// stable local ids onto the fresh wire ids.
    pub(crate) async fn reconnect_trees(&self) -> SMBResult<()> {
        let targets: Vec<(u32, String)> = {
            let trees = self.inner.trees.lock().await;
            trees
                .values()
                .filter(|tree| !tree.connected)
                .map(|tree| (tree.local_id, tree.path.clone()))
                .collect()
        };
        for (local_id, path) in targets {
            let outcome = self
                .issue(
                    0,
                    SMBRequestBody::TreeConnect(SMBTreeConnectRequest { path: path.clone() }),
                )
                .await?;
            let SMBRequestOutcome::Completed { header, body } = outcome else {
                return Err(SMBError::disconnected("tree reconnect"));
            };
            check_status(&header, "tree_connect")?;
            let (_, response) = SMBTreeConnectResponse::smb_from_bytes(&body)?;
            let mut trees = self.inner.trees.lock().await;
            if let Some(tree) = trees.get_mut(&local_id) {
                tree.wire_id = header.tree_id;
                tree.share_type = response.share_type;
                tree.share_flags = response.share_flags;
                tree.capabilities = response.capabilities;
                tree.maximal_access = response.maximal_access;
                tree.connected = true;
                debug!(local_id, wire_id = header.tree_id, "tree re-attached");
            }
        }
        Ok(())
    }
}

impl<F: SMBTransportFactory> SMBTreeConnect<F> {
    pub fn connection(&self) -> &SMBConnection<F> {
        &self.connection
    }

    pub async fn share_type(&self) -> SMBResult<SMBShareType> {
        let trees = self.connection.inner.trees.lock().await;
        trees
            .get(&self.local_id)
            .map(|tree| tree.share_type)
            .ok_or_else(|| SMBError::precondition_failed("tree detached"))
    }

    pub async fn maximal_access(&self) -> SMBResult<SMBAccessMask> {
        let trees = self.connection.inner.trees.lock().await;
        trees
            .get(&self.local_id)
            .map(|tree| tree.maximal_access)
            .ok_or_else(|| SMBError::precondition_failed("tree detached"))
    }

    pub async fn share_flags(&self) -> SMBResult<SMBShareFlags> {
        let trees = self.connection.inner.trees.lock().await;
        trees
            .get(&self.local_id)
            .map(|tree| tree.share_flags)
            .ok_or_else(|| SMBError::precondition_failed("tree detached"))
    }

    pub async fn capabilities(&self) -> SMBResult<SMBTreeConnectCapabilities> {
        let trees = self.connection.inner.trees.lock().await;
        trees
            .get(&self.local_id)
            .map(|tree| tree.capabilities)
            .ok_or_else(|| SMBError::precondition_failed("tree detached"))
    }

    /// Detach. Opens on this tree die with it.
    pub async fn disconnect(self) -> SMBResult<()> {
        let wire_id = self.connection.tree_wire_id(self.local_id).await?;
        let outcome = self
            .connection
            .issue(
                wire_id,
                SMBRequestBody::TreeDisconnect(SMBTreeDisconnectRequest),
            )
            .await?;
        if let SMBRequestOutcome::Completed { header, .. } = outcome {
            check_status(&header, "tree_disconnect")?;
        }
        {
            let mut trees = self.connection.inner.trees.lock().await;
            trees.remove(&self.local_id);
        }
        {
            let mut opens = self.connection.inner.opens.lock().await;
            for open in opens.values_mut() {
                if open.tree_local == self.local_id {
                    open.valid = false;
                }
            }
        }
        info!(local_id = self.local_id, "share detached");
        Ok(())
    }
}
