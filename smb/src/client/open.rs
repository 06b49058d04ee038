use std::sync::atomic::Ordering;

use tracing::{debug, info, warn};

use smb_core::{SMBFromBytes, SMBResult};
use smb_core::error::SMBError;
use smb_core::nt_status::NTStatus;

use crate::client::connection::{SMBConnection, check_status};
use crate::client::lease::SMBLeaseLifecycle;
use crate::client::request::SMBRequestOutcome;
use crate::client::tree::SMBTreeConnect;
use crate::protocol::body::SMBRequestBody;
use crate::protocol::body::change_notify::{
    SMBChangeNotifyEvent, SMBChangeNotifyFlags, SMBChangeNotifyRequest, SMBChangeNotifyResponse,
    SMBCompletionFilter,
};
use crate::protocol::body::close::{SMBCloseFlags, SMBCloseRequest, SMBCloseResponse};
use crate::protocol::body::create::{
    SMBCreateDisposition, SMBCreateOptions, SMBCreateRequest, SMBCreateRequestContext,
    SMBCreateResponse, SMBCreateResponseContext, SMBFileAttributes, SMBImpersonationLevel,
    SMBLeaseKey, SMBLeaseState, SMBOplockLevel, SMBShareAccess,
};
use crate::protocol::body::file_id::SMBFileId;
use crate::protocol::body::flush::{SMBFlushRequest, SMBFlushResponse};
use crate::protocol::body::ioctl::{SMBIoctlFlags, SMBIoctlRequest, SMBIoctlResponse};
use crate::protocol::body::lock::{SMBLockElement, SMBLockRequest, SMBLockResponse};
use crate::protocol::body::query_directory::{
    SMBDirectoryEntryList, SMBDirectoryInformationClass, SMBQueryDirectoryFlags,
    SMBQueryDirectoryRequest, SMBQueryDirectoryResponse,
};
use crate::protocol::body::query_info::{
    SMBFileBasicInformation, SMBFileInfoClass, SMBFileInternalInformation, SMBFileStandardInformation,
    SMBInfoType, SMBQueryInfoRequest, SMBQueryInfoResponse,
};
use crate::protocol::body::set_info::{SMBSetInfoPayload, SMBSetInfoRequest, SMBSetInfoResponse};
use crate::protocol::body::tree_connect::{SMBAccessMask, SMBShareType};
use crate::transport::SMBTransportFactory;

/// Typed arguments of an open, kept for the life of the handle so a
/// durable reconnect can re-marshal the create.
#[derive(Debug, Clone)]
pub struct SMBOpenArgs {
    pub desired_access: SMBAccessMask,
    pub file_attributes: SMBFileAttributes,
    pub share_access: SMBShareAccess,
    pub create_disposition: SMBCreateDisposition,
    pub create_options: SMBCreateOptions,
    /// Ask for a handle that survives transport loss.
    pub request_durable: bool,
    /// Ask for a caching lease with these bits.
    pub request_lease: Option<SMBLeaseState>,
    pub query_maximal_access: bool,
    pub query_file_id: bool,
    /// Opaque vendor create-context payload; its presence also tolerates
    /// unknown context names in the response.
    pub vendor_query: Option<Vec<u8>>,
}

impl Default for SMBOpenArgs {
    fn default() -> Self {
        Self {
            desired_access: SMBAccessMask::read_only(),
            file_attributes: SMBFileAttributes::NORMAL,
            share_access: SMBShareAccess::READ,
            create_disposition: SMBCreateDisposition::Open,
            create_options: SMBCreateOptions::empty(),
            request_durable: false,
            request_lease: None,
            query_maximal_access: false,
            query_file_id: false,
            vendor_query: None,
        }
    }
}

impl SMBOpenArgs {
    pub fn read_only() -> Self {
        Self::default()
    }

    pub fn read_write() -> Self {
        Self {
            desired_access: SMBAccessMask::read_write(),
            share_access: SMBShareAccess::READ | SMBShareAccess::WRITE,
            ..Self::default()
        }
    }

    pub fn directory() -> Self {
        Self {
            create_options: SMBCreateOptions::DIRECTORY_FILE,
            share_access: SMBShareAccess::READ | SMBShareAccess::WRITE | SMBShareAccess::DELETE,
            ..Self::default()
        }
    }
}

/// Connection-table record for one open. The local id is the stable
/// handle; the wire FID pair under it is swapped by durable reconnect.
#[derive(Debug, Clone)]
pub(crate) struct SMBOpenState {
    pub(crate) local_id: u64,
    pub(crate) tree_local: u32,
    pub(crate) path: String,
    pub(crate) file_id: SMBFileId,
    pub(crate) durable: bool,
    /// Durable handle waiting to be reclaimed after a reset.
    pub(crate) reclaim: bool,
    pub(crate) valid: bool,
    pub(crate) share_type: SMBShareType,
    pub(crate) oplock_level: SMBOplockLevel,
    pub(crate) lease_key: Option<SMBLeaseKey>,
    pub(crate) granted_access: SMBAccessMask,
    pub(crate) maximal_access: Option<SMBAccessMask>,
    pub(crate) disk_file_id: Option<u64>,
    pub(crate) vendor_response: Option<Vec<u8>>,
    pub(crate) end_of_file: u64,
    pub(crate) args: SMBOpenArgs,
    pub(crate) lock_sequence: u32,
}

/// Handle to an open file or directory.
pub struct SMBOpen<F: SMBTransportFactory> {
    pub(crate) connection: SMBConnection<F>,
    pub(crate) local_id: u64,
}

impl<F: SMBTransportFactory> SMBTreeConnect<F> {
    /// Open (or create) a file/directory on this share, attaching the
    /// requested create contexts.
    pub async fn create(&self, path: &str, args: SMBOpenArgs) -> SMBResult<SMBOpen<F>> {
        let connection = &self.connection;
        let tolerate_vendor = args.vendor_query.is_some();
        let tree_local = self.local_id;
        let (header, body) = connection
            .run_operation("create", async |conn: &SMBConnection<F>| {
                let wire_tree = conn.tree_wire_id(tree_local).await?;
                let contexts = conn.build_create_contexts(tree_local, path, &args).await;
                let request = SMBCreateRequest {
                    oplock_level: if args.request_lease.is_some() {
                        SMBOplockLevel::Lease
                    } else {
                        SMBOplockLevel::None
                    },
                    impersonation_level: SMBImpersonationLevel::Impersonation,
                    desired_access: args.desired_access,
                    file_attributes: args.file_attributes,
                    share_access: args.share_access,
                    create_disposition: args.create_disposition,
                    create_options: args.create_options,
                    name: path.to_string(),
                    create_contexts: contexts,
                };
                Ok((wire_tree, SMBRequestBody::Create(request)))
            })
            .await?;
        check_status(&header, "create")?;
        let (_, response) = SMBCreateResponse::parse(&body, tolerate_vendor)?;
        let share_type = {
            let trees = connection.inner.trees.lock().await;
            trees
                .get(&tree_local)
                .map(|tree| tree.share_type)
                .unwrap_or(SMBShareType::Disk)
        };
        let local_id = connection.inner.next_open_local.fetch_add(1, Ordering::SeqCst);
        let mut open = SMBOpenState {
            local_id,
            tree_local,
            path: path.to_string(),
            file_id: response.file_id,
            durable: false,
            reclaim: false,
            valid: true,
            share_type,
            oplock_level: response.oplock_level,
            lease_key: None,
            granted_access: args.desired_access,
            maximal_access: None,
            disk_file_id: None,
            vendor_response: None,
            end_of_file: response.end_of_file,
            args,
            lock_sequence: 0,
        };
        for context in &response.contexts {
            match context {
                SMBCreateResponseContext::DurableGranted => open.durable = true,
                SMBCreateResponseContext::LeaseGranted { key, state, .. } => {
                    open.lease_key = Some(*key);
                    connection.inner.leases.lock().await.mark_granted(*key, *state);
                }
                SMBCreateResponseContext::MaximalAccess { access, .. } => {
                    open.maximal_access = Some(*access);
                }
                SMBCreateResponseContext::FileId { disk_file_id, .. } => {
                    open.disk_file_id = Some(*disk_file_id);
                }
                SMBCreateResponseContext::Vendor { data, .. } => {
                    open.vendor_response = Some(data.clone());
                }
            }
        }
        info!(
            path,
            file_id = ?open.file_id,
            durable = open.durable,
            leased = open.lease_key.is_some(),
            "open created"
        );
        connection.inner.opens.lock().await.insert(local_id, open);
        Ok(SMBOpen {
            connection: connection.clone(),
            local_id,
        })
    }
}

impl<F: SMBTransportFactory> SMBConnection<F> {
    /// Assemble the ordered create-context list for an open request. The
    /// lease key comes from the per-connection table, so reopening the
    /// same node (or reclaiming it after a reset) reuses the key.
    pub(crate) async fn build_create_contexts(
        &self,
        tree_local: u32,
        path: &str,
        args: &SMBOpenArgs,
    ) -> Vec<SMBCreateRequestContext> {
        let mut contexts = Vec::new();
        if args.query_maximal_access {
            contexts.push(SMBCreateRequestContext::MaximalAccessQuery);
        }
        if args.query_file_id {
            contexts.push(SMBCreateRequestContext::FileIdQuery);
        }
        if let Some(state) = args.request_lease {
            let key = {
                let mut leases = self.inner.leases.lock().await;
                let identity = leases.identity_of(tree_local, None, path);
                leases.key_for(tree_local, identity)
            };
            contexts.push(SMBCreateRequestContext::LeaseRequest { key, state });
        }
        if args.request_durable {
            contexts.push(SMBCreateRequestContext::DurableRequest);
        }
        if let Some(data) = &args.vendor_query {
            contexts.push(SMBCreateRequestContext::VendorQuery(data.clone()));
        }
        contexts
    }

    /// Resolve a handle to its current wire ids, refusing handles the
    /// last reset invalidated.
    pub(crate) async fn open_route(&self, local_id: u64) -> SMBResult<(u32, SMBFileId, SMBShareType)> {
        let tree_local = {
            let opens = self.inner.opens.lock().await;
            let open = opens
                .get(&local_id)
                .ok_or_else(|| SMBError::precondition_failed("unknown file handle"))?;
            if !open.valid {
                return Err(SMBError::disconnected("handle invalidated by reconnect"));
            }
            if open.reclaim {
                return Err(SMBError::disconnected("handle awaiting durable reclaim"));
            }
            open.tree_local
        };
        let wire_tree = self.tree_wire_id(tree_local).await?;
        let opens = self.inner.opens.lock().await;
        let open = opens
            .get(&local_id)
            .ok_or_else(|| SMBError::precondition_failed("unknown file handle"))?;
        Ok((wire_tree, open.file_id, open.share_type))
    }

    /// Reclaim durable handles after re-establishment: a create carrying
    /// the reconnect context and the original lease key. The FID swap is
    /// invisible to holders of the local handle.
    pub(crate) async fn reclaim_durable_opens(&self) -> SMBResult<()> {
        let targets: Vec<(u64, u32, String, SMBFileId, Option<SMBLeaseKey>, SMBOpenArgs)> = {
            let opens = self.inner.opens.lock().await;
            opens
                .values()
                .filter(|open| open.durable && open.reclaim)
                .map(|open| {
                    (
                        open.local_id,
                        open.tree_local,
                        open.path.clone(),
                        open.file_id,
                        open.lease_key,
                        open.args.clone(),
                    )
                })
                .collect()
        };
        for (local_id, tree_local, path, old_file_id, lease_key, args) in targets {
            let wire_tree = self.tree_wire_id(tree_local).await?;
            let mut contexts = vec![SMBCreateRequestContext::DurableReconnect(old_file_id)];
            if let Some(key) = lease_key {
                let granted = {
                    let leases = self.inner.leases.lock().await;
                    leases.get(&key).map(|entry| entry.granted)
                };
                if let Some(state) = granted {
                    contexts.push(SMBCreateRequestContext::LeaseRequest { key, state });
                }
            }
            let request = SMBCreateRequest {
                oplock_level: if lease_key.is_some() {
                    SMBOplockLevel::Lease
                } else {
                    SMBOplockLevel::None
                },
                impersonation_level: SMBImpersonationLevel::Impersonation,
                desired_access: args.desired_access,
                file_attributes: args.file_attributes,
                share_access: args.share_access,
                create_disposition: SMBCreateDisposition::Open,
                create_options: args.create_options,
                name: path.clone(),
                create_contexts: contexts,
            };
            let outcome = self.issue(wire_tree, SMBRequestBody::Create(request)).await?;
            let SMBRequestOutcome::Completed { header, body } = outcome else {
                return Err(SMBError::disconnected("durable reclaim"));
            };
            let reclaimed = check_status(&header, "create")
                .and_then(|_status| SMBCreateResponse::parse(&body, true).map(|(_, r)| r));
            let mut opens = self.inner.opens.lock().await;
            let Some(open) = opens.get_mut(&local_id) else { continue };
            match reclaimed {
                Ok(response) => {
                    debug!(path = %path, new_file_id = ?response.file_id, "durable handle reclaimed");
                    open.file_id = response.file_id;
                    open.reclaim = false;
                    open.valid = true;
                }
                Err(error) => {
                    warn!(path = %path, %error, "durable reclaim refused; handle lost");
                    open.reclaim = false;
                    open.valid = false;
                }
            }
        }
        Ok(())
    }
}

impl<F: SMBTransportFactory> SMBOpen<F> {
    pub fn connection(&self) -> &SMBConnection<F> {
        &self.connection
    }

    pub async fn granted_access(&self) -> SMBResult<SMBAccessMask> {
        self.with_state(|open| open.granted_access).await
    }

    pub async fn maximal_access(&self) -> SMBResult<Option<SMBAccessMask>> {
        self.with_state(|open| open.maximal_access).await
    }

    pub async fn vendor_response(&self) -> SMBResult<Option<Vec<u8>>> {
        self.with_state(|open| open.vendor_response.clone()).await
    }

    pub async fn is_durable(&self) -> SMBResult<bool> {
        self.with_state(|open| open.durable).await
    }

    pub async fn lease_key(&self) -> SMBResult<Option<SMBLeaseKey>> {
        self.with_state(|open| open.lease_key).await
    }

    pub async fn oplock_level(&self) -> SMBResult<SMBOplockLevel> {
        self.with_state(|open| open.oplock_level).await
    }

    /// On-disk identity from the `QFid` context, when it was requested.
    pub async fn disk_file_id(&self) -> SMBResult<Option<u64>> {
        self.with_state(|open| open.disk_file_id).await
    }

    pub async fn end_of_file(&self) -> SMBResult<u64> {
        self.with_state(|open| open.end_of_file).await
    }

    /// Current lifecycle and cached grant of this open's lease.
    pub async fn lease_state(
        &self,
    ) -> SMBResult<Option<(SMBLeaseLifecycle, SMBLeaseState)>> {
        let Some(key) = self.lease_key().await? else {
            return Ok(None);
        };
        let leases = self.connection.inner.leases.lock().await;
        Ok(leases
            .get(&key)
            .map(|entry| (entry.lifecycle, entry.granted)))
    }

    async fn with_state<T>(&self, read: impl FnOnce(&SMBOpenState) -> T) -> SMBResult<T> {
        let opens = self.connection.inner.opens.lock().await;
        opens
            .get(&self.local_id)
            .map(read)
            .ok_or_else(|| SMBError::precondition_failed("unknown file handle"))
    }

    pub async fn flush(&self) -> SMBResult<()> {
        let local_id = self.local_id;
        let (header, body) = self
            .connection
            .run_operation("flush", async |conn: &SMBConnection<F>| {
                let (wire_tree, file_id, _share) = conn.open_route(local_id).await?;
                Ok((wire_tree, SMBRequestBody::Flush(SMBFlushRequest { file_id })))
            })
            .await?;
        check_status(&header, "flush")?;
        SMBFlushResponse::smb_from_bytes(&body)?;
        Ok(())
    }

    /// Byte-range lock/unlock. The lock sequence number is bumped per
    /// request so a post-reconnect replay is detectable by the server.
    pub async fn lock(&self, locks: Vec<SMBLockElement>) -> SMBResult<()> {
        let local_id = self.local_id;
        let sequence = {
            let mut opens = self.connection.inner.opens.lock().await;
            let open = opens
                .get_mut(&local_id)
                .ok_or_else(|| SMBError::precondition_failed("unknown file handle"))?;
            open.lock_sequence = open.lock_sequence.wrapping_add(1);
            open.lock_sequence
        };
        let request_locks = locks.clone();
        let (header, body) = self
            .connection
            .run_operation("lock", async |conn: &SMBConnection<F>| {
                let (wire_tree, file_id, _share) = conn.open_route(local_id).await?;
                Ok((
                    wire_tree,
                    SMBRequestBody::Lock(SMBLockRequest {
                        lock_sequence: sequence,
                        file_id,
                        locks: request_locks.clone(),
                    }),
                ))
            })
            .await?;
        check_status(&header, "lock")?;
        SMBLockResponse::smb_from_bytes(&body)?;
        Ok(())
    }

    /// Pass-through device/filesystem control. Transfer legs are gated
    /// by the negotiated transact size.
    pub async fn ioctl(
        &self,
        ctl_code: u32,
        input: Vec<u8>,
        max_output: u32,
    ) -> SMBResult<SMBIoctlResponse> {
        let max_transact = self
            .connection
            .negotiated()
            .await
            .map(|params| params.sizes.max_transact)
            .ok_or_else(|| SMBError::precondition_failed("ioctl before negotiate"))?;
        if input.len() as u32 > max_transact {
            return Err(SMBError::precondition_failed("ioctl input exceeds transact size"));
        }
        let local_id = self.local_id;
        let bounded_output = max_output.min(max_transact);
        let request_input = input;
        let (header, body) = self
            .connection
            .run_operation("ioctl", async |conn: &SMBConnection<F>| {
                let (wire_tree, file_id, _share) = conn.open_route(local_id).await?;
                Ok((
                    wire_tree,
                    SMBRequestBody::IOCTL(SMBIoctlRequest {
                        ctl_code,
                        file_id,
                        input: request_input.clone(),
                        max_output_response: bounded_output,
                        flags: SMBIoctlFlags::IS_FSCTL,
                    }),
                ))
            })
            .await?;
        check_status(&header, "ioctl")?;
        let (_, response) = SMBIoctlResponse::smb_from_bytes(&body)?;
        Ok(response)
    }

    async fn query_info_raw(
        &self,
        file_info_class: SMBFileInfoClass,
        output_length: u32,
    ) -> SMBResult<Vec<u8>> {
        let local_id = self.local_id;
        let (header, body) = self
            .connection
            .run_operation("query_info", async |conn: &SMBConnection<F>| {
                let (wire_tree, file_id, _share) = conn.open_route(local_id).await?;
                Ok((
                    wire_tree,
                    SMBRequestBody::QueryInfo(SMBQueryInfoRequest {
                        info_type: SMBInfoType::File,
                        file_info_class,
                        output_buffer_length: output_length,
                        additional_information: 0,
                        file_id,
                    }),
                ))
            })
            .await?;
        check_status(&header, "query_info")?;
        let (_, response) = SMBQueryInfoResponse::smb_from_bytes(&body)?;
        Ok(response.buffer)
    }

    pub async fn query_basic_info(&self) -> SMBResult<SMBFileBasicInformation> {
        let buffer = self
            .query_info_raw(SMBFileInfoClass::FileBasicInformation, 40)
            .await?;
        let (_, info) = SMBFileBasicInformation::smb_from_bytes(&buffer)?;
        Ok(info)
    }

    pub async fn query_standard_info(&self) -> SMBResult<SMBFileStandardInformation> {
        let buffer = self
            .query_info_raw(SMBFileInfoClass::FileStandardInformation, 24)
            .await?;
        let (_, info) = SMBFileStandardInformation::smb_from_bytes(&buffer)?;
        Ok(info)
    }

    /// Volume-stable identity, also usable as the lease-key low half.
    pub async fn query_internal_info(&self) -> SMBResult<SMBFileInternalInformation> {
        let buffer = self
            .query_info_raw(SMBFileInfoClass::FileInternalInformation, 8)
            .await?;
        let (_, info) = SMBFileInternalInformation::smb_from_bytes(&buffer)?;
        Ok(info)
    }

    pub async fn set_info(&self, payload: SMBSetInfoPayload) -> SMBResult<()> {
        let local_id = self.local_id;
        let request_payload = payload;
        let (header, body) = self
            .connection
            .run_operation("set_info", async |conn: &SMBConnection<F>| {
                let (wire_tree, file_id, _share) = conn.open_route(local_id).await?;
                Ok((
                    wire_tree,
                    SMBRequestBody::SetInfo(SMBSetInfoRequest {
                        file_id,
                        payload: request_payload.clone(),
                    }),
                ))
            })
            .await?;
        check_status(&header, "set_info")?;
        SMBSetInfoResponse::smb_from_bytes(&body)?;
        Ok(())
    }

    /// Long-poll for changes under a directory handle. Resolves when the
    /// server reports matching activity; an overflowed server-side
    /// buffer resolves empty.
    pub async fn change_notify(
        &self,
        filter: SMBCompletionFilter,
        watch_tree: bool,
    ) -> SMBResult<Vec<SMBChangeNotifyEvent>> {
        let output_length = self
            .connection
            .negotiated()
            .await
            .map(|params| params.sizes.max_transact.min(65536))
            .unwrap_or(65536);
        let local_id = self.local_id;
        let (header, body) = self
            .connection
            .run_operation("change_notify", async |conn: &SMBConnection<F>| {
                let (wire_tree, file_id, _share) = conn.open_route(local_id).await?;
                Ok((
                    wire_tree,
                    SMBRequestBody::ChangeNotify(SMBChangeNotifyRequest {
                        flags: if watch_tree {
                            SMBChangeNotifyFlags::WATCH_TREE
                        } else {
                            SMBChangeNotifyFlags::empty()
                        },
                        output_buffer_length: output_length,
                        file_id,
                        completion_filter: filter,
                    }),
                ))
            })
            .await?;
        if header.status == NTStatus::NotifyEnumDir as u32 {
            return Ok(Vec::new());
        }
        check_status(&header, "change_notify")?;
        let (_, response) = SMBChangeNotifyResponse::smb_from_bytes(&body)?;
        Ok(response.events)
    }

    /// One directory-listing round. `restart` rewinds the enumeration.
    /// The parse never reads past the reply buffer: a malformed entry
    /// chain yields the entries before the damage plus the error.
    pub async fn query_directory(
        &self,
        pattern: &str,
        restart: bool,
    ) -> SMBResult<SMBDirectoryEntryList> {
        let output_length = self
            .connection
            .negotiated()
            .await
            .map(|params| params.sizes.max_transact.min(65536))
            .unwrap_or(65536);
        let local_id = self.local_id;
        let request_pattern = pattern.to_string();
        let (header, body) = self
            .connection
            .run_operation("query_directory", async |conn: &SMBConnection<F>| {
                let (wire_tree, file_id, _share) = conn.open_route(local_id).await?;
                Ok((
                    wire_tree,
                    SMBRequestBody::QueryDirectory(SMBQueryDirectoryRequest {
                        information_class: SMBDirectoryInformationClass::FileDirectoryInformation,
                        flags: if restart {
                            SMBQueryDirectoryFlags::RESTART_SCANS
                        } else {
                            SMBQueryDirectoryFlags::empty()
                        },
                        file_id,
                        pattern: request_pattern.clone(),
                        output_buffer_length: output_length,
                    }),
                ))
            })
            .await?;
        if header.status == NTStatus::NoMoreFiles as u32 {
            return Ok(SMBDirectoryEntryList::default());
        }
        check_status(&header, "query_directory")?;
        let (_, response) = SMBQueryDirectoryResponse::smb_from_bytes(&body)?;
        Ok(SMBDirectoryEntryList::parse(&response.buffer))
    }

    /// Close the handle. The FID pair dies on the wire, the lease is
    /// released when no sibling open shares its key.
    pub async fn close(self) -> SMBResult<SMBCloseResponse> {
        let local_id = self.local_id;
        let (header, body) = self
            .connection
            .run_operation("close", async |conn: &SMBConnection<F>| {
                let (wire_tree, file_id, _share) = conn.open_route(local_id).await?;
                Ok((
                    wire_tree,
                    SMBRequestBody::Close(SMBCloseRequest {
                        flags: SMBCloseFlags::POSTQUERY_ATTRIB,
                        file_id,
                    }),
                ))
            })
            .await?;
        check_status(&header, "close")?;
        let (_, response) = SMBCloseResponse::smb_from_bytes(&body)?;
        let lease_key = {
            let mut opens = self.connection.inner.opens.lock().await;
            let removed = opens.remove(&local_id);
            removed.and_then(|open| {
                let key = open.lease_key?;
                let shared = opens
                    .values()
                    .any(|other| other.valid && other.lease_key == Some(key));
                (!shared).then_some(key)
            })
        };
        if let Some(key) = lease_key {
            self.connection.inner.leases.lock().await.release(key);
        }
        debug!(local_id, "handle closed");
        Ok(response)
    }
}
