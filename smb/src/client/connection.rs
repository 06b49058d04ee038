use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::{Mutex, Notify, RwLock, mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use smb_core::{SMBFromBytes, SMBResult};
use smb_core::error::SMBError;
use smb_core::nt_status::NTStatus;

use crate::client::config::SMBClientConfig;
use crate::client::credit::{CreditWindow, EffectiveSizes};
use crate::client::lease::{SMBLeaseEvent, SMBLeaseTable};
use crate::client::open::SMBOpenState;
use crate::client::request::{SMBCompleter, SMBOutstandingRequest, SMBRequestOutcome};
use crate::client::tree::SMBTreeState;
use crate::protocol::body::SMBRequestBody;
use crate::protocol::body::capabilities::Capabilities;
use crate::protocol::body::cancel::SMBCancelRequest;
use crate::protocol::body::dialect::SMBDialect;
use crate::protocol::body::echo::{SMBEchoRequest, SMBEchoResponse};
use crate::protocol::body::negotiate::{SMBNegotiateRequest, SMBNegotiateResponse};
use crate::protocol::body::oplock_break::{SMBBreakNotification, SMBLeaseBreakAck, SMBLeaseBreakResponse};
use crate::protocol::body::security_mode::NegotiateSecurityMode;
use crate::protocol::body::session_setup::SMBSessionFlags;
use crate::protocol::header::{
    LEGACY_PROTOCOL_ID, SMBCommandCode, SMBFlags, SMBSyncHeader, UNSOLICITED_MESSAGE_ID,
};
use crate::protocol::message::{LegacySMBMessage, SMBMessage, encode_compound, split_reply_frame};
use crate::transport::{SMBTransportEvent, SMBTransportFactory, SMBTransportReader, SMBTransportWriter};
use crate::util::auth::AuthProvider;

/// Outcome of dialect negotiation, fixed inputs for credit/size math.
#[derive(Debug, Clone)]
pub struct SMBNegotiatedParams {
    pub dialect: SMBDialect,
    pub security_mode: NegotiateSecurityMode,
    pub capabilities: Capabilities,
    pub server_guid: Uuid,
    pub sizes: EffectiveSizes,
    /// Opaque blob for the auth collaborator's first leg.
    pub security_blob: Vec<u8>,
}

impl SMBNegotiatedParams {
    pub fn multi_credit(&self) -> bool {
        self.dialect.supports_multi_credit() && self.capabilities.contains(Capabilities::LARGE_MTU)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SMBSessionState {
    pub(crate) session_id: u64,
    pub(crate) flags: SMBSessionFlags,
    /// False while setup legs are still in flight.
    pub(crate) established: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ConnectionState {
    pub(crate) connected: bool,
    pub(crate) negotiated: Option<SMBNegotiatedParams>,
    pub(crate) session: Option<SMBSessionState>,
    /// Message id of an in-flight SMB1 probe, so an SMB1-shaped reply
    /// can be routed instead of poisoning the session.
    pub(crate) probe_message_id: Option<u64>,
}

/// One client connection: owns the transport halves, the outstanding
/// request table, credit window, and the session/tree/open/lease tables
/// shared by every handle cloned from it.
pub struct SMBConnection<F: SMBTransportFactory> {
    pub(crate) inner: Arc<SMBConnectionInner<F>>,
}

impl<F: SMBTransportFactory> Clone for SMBConnection<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: SMBTransportFactory> std::fmt::Debug for SMBConnection<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SMBConnection").finish_non_exhaustive()
    }
}

pub(crate) struct SMBConnectionInner<F: SMBTransportFactory> {
    pub(crate) config: SMBClientConfig,
    factory: Mutex<F>,
    writer: Mutex<Option<F::Writer>>,
    pub(crate) state: RwLock<ConnectionState>,
    pub(crate) pending: Mutex<HashMap<u64, SMBCompleter>>,
    pub(crate) credits: Mutex<CreditWindow>,
    credit_notify: Notify,
    pub(crate) trees: Mutex<HashMap<u32, SMBTreeState>>,
    pub(crate) opens: Mutex<HashMap<u64, SMBOpenState>>,
    pub(crate) leases: Mutex<SMBLeaseTable>,
    pub(crate) auth: Mutex<Option<Arc<dyn AuthProvider>>>,
    pub(crate) reconnect_lock: Mutex<()>,
    break_tx: mpsc::UnboundedSender<SMBBreakNotification>,
    lease_event_tx: mpsc::UnboundedSender<SMBLeaseEvent>,
    lease_event_rx: Mutex<Option<mpsc::UnboundedReceiver<SMBLeaseEvent>>>,
    pub(crate) next_tree_local: AtomicU32,
    pub(crate) next_open_local: AtomicU64,
    generation: AtomicU64,
}

impl<F: SMBTransportFactory> SMBConnection<F> {
    pub fn new(factory: F, config: SMBClientConfig) -> Self {
        let (break_tx, break_rx) = mpsc::unbounded_channel();
        let (lease_event_tx, lease_event_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(SMBConnectionInner {
            config,
            factory: Mutex::new(factory),
            writer: Mutex::new(None),
            state: RwLock::new(ConnectionState::default()),
            pending: Mutex::new(HashMap::new()),
            credits: Mutex::new(CreditWindow::new()),
            credit_notify: Notify::new(),
            trees: Mutex::new(HashMap::new()),
            opens: Mutex::new(HashMap::new()),
            leases: Mutex::new(SMBLeaseTable::new(rand::random())),
            auth: Mutex::new(None),
            reconnect_lock: Mutex::new(()),
            break_tx,
            lease_event_tx,
            lease_event_rx: Mutex::new(Some(lease_event_rx)),
            next_tree_local: AtomicU32::new(1),
            next_open_local: AtomicU64::new(1),
            generation: AtomicU64::new(0),
        });
        Self::spawn_break_worker(&inner, break_rx);
        Self { inner }
    }

    /// Establish the transport and run dialect negotiation, including the
    /// two-step legacy-probe path when configured.
    pub async fn connect(factory: F, config: SMBClientConfig) -> SMBResult<Self> {
        let connection = Self::new(factory, config);
        connection.establish_transport().await?;
        connection.negotiate_internal(true).await?;
        Ok(connection)
    }

    pub async fn negotiated(&self) -> Option<SMBNegotiatedParams> {
        self.inner.state.read().await.negotiated.clone()
    }

    /// Stream of out-of-band lease activity. The first caller takes it.
    pub async fn lease_events(&self) -> Option<UnboundedReceiverStream<SMBLeaseEvent>> {
        self.inner
            .lease_event_rx
            .lock()
            .await
            .take()
            .map(UnboundedReceiverStream::new)
    }

    // ---- transport lifecycle ----

    pub(crate) async fn establish_transport(&self) -> SMBResult<()> {
        let (reader, writer) = self.inner.factory.lock().await.connect().await?;
        *self.inner.credits.lock().await = CreditWindow::new();
        *self.inner.writer.lock().await = Some(writer);
        {
            let mut state = self.inner.state.write().await;
            state.connected = true;
            state.probe_message_id = None;
        }
        Self::spawn_driver(&self.inner, reader);
        Ok(())
    }

    /// The single logical I/O driver: drains the transport, matches
    /// replies to pending callers, and converts transport death into the
    /// reset path. One per transport generation.
    fn spawn_driver(inner: &Arc<SMBConnectionInner<F>>, mut reader: F::Reader) -> u64 {
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let weak = Arc::downgrade(inner);
        tokio::spawn(async move {
            loop {
                let event = reader.next_event().await;
                let Some(inner) = weak.upgrade() else { break };
                let connection = SMBConnection { inner };
                match event {
                    SMBTransportEvent::Reply(frame) => {
                        if !connection.route_frame(frame).await {
                            connection.begin_reset(generation).await;
                            break;
                        }
                    }
                    SMBTransportEvent::Reset => {
                        connection.begin_reset(generation).await;
                        break;
                    }
                }
            }
            trace!(generation, "I/O driver exited");
        });
        generation
    }

    /// Returns false on damage that is fatal to the whole session.
    async fn route_frame(&self, frame: Bytes) -> bool {
        if frame.len() >= 4 && frame[0..4] == LEGACY_PROTOCOL_ID {
            let probe = self.inner.state.read().await.probe_message_id;
            if let Some(message_id) = probe {
                if let Some(completer) = self.inner.pending.lock().await.remove(&message_id) {
                    completer.complete(SMBRequestOutcome::LegacyReply);
                    return true;
                }
            }
            warn!("unsolicited SMB1 frame");
            return false;
        }
        match split_reply_frame(&frame) {
            Ok(replies) => {
                for (header, body) in replies {
                    self.dispatch_reply(header, body).await;
                }
                true
            }
            Err(error) => {
                // common-header malformation poisons the session
                warn!(%error, "unparseable reply header");
                false
            }
        }
    }

    /// Park until some reply grants credits. Used by a pipelined caller
    /// stalled with nothing of its own in flight. Bounded so a grant
    /// arriving before the waiter registered cannot strand the window.
    pub(crate) async fn credit_grant_wait(&self) {
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            self.inner.credit_notify.notified(),
        )
        .await;
    }

    async fn dispatch_reply(&self, header: SMBSyncHeader, body: Bytes) {
        self.inner.credits.lock().await.grant(header.credits);
        self.inner.credit_notify.notify_waiters();
        if header.command == SMBCommandCode::OplockBreak
            && header.message_id == UNSOLICITED_MESSAGE_ID
        {
            match SMBBreakNotification::parse(&body) {
                Ok((_, notification)) => {
                    let _ = self.inner.break_tx.send(notification);
                }
                Err(error) => warn!(%error, "dropped malformed break notification"),
            }
            return;
        }
        if header.status == NTStatus::StatusPending as u32
            && header.flags.contains(SMBFlags::ASYNC_COMMAND)
        {
            trace!(message_id = header.message_id, "interim async reply");
            return;
        }
        match self.inner.pending.lock().await.remove(&header.message_id) {
            Some(completer) => completer.complete(SMBRequestOutcome::Completed { header, body }),
            None => trace!(
                message_id = header.message_id,
                "late reply for retired request discarded"
            ),
        }
    }

    /// Transport reset: invalidate everything the wire ids referenced,
    /// retire in-flight requests as `Reconnected`, keep durable opens
    /// and lease keys for reclaim.
    pub(crate) async fn begin_reset(&self, generation: u64) {
        {
            let mut state = self.inner.state.write().await;
            if self.inner.generation.load(Ordering::SeqCst) != generation || !state.connected {
                return;
            }
            state.connected = false;
            state.session = None;
            state.probe_message_id = None;
        }
        *self.inner.writer.lock().await = None;
        {
            let mut trees = self.inner.trees.lock().await;
            for tree in trees.values_mut() {
                tree.connected = false;
            }
        }
        {
            let mut opens = self.inner.opens.lock().await;
            for open in opens.values_mut() {
                if open.durable {
                    open.reclaim = true;
                } else {
                    open.valid = false;
                }
            }
        }
        let drained: Vec<SMBCompleter> = {
            let mut pending = self.inner.pending.lock().await;
            pending.drain().map(|(_, completer)| completer).collect()
        };
        let retired = drained.len();
        for completer in drained {
            completer.complete(SMBRequestOutcome::Reconnected);
        }
        // wake credit-stalled windows so they observe the reset
        self.inner.credit_notify.notify_waiters();
        info!(retired, "transport reset; in-flight requests marked Reconnected");
    }

    // ---- request submission ----

    async fn prepare_header(&self, tree_id: u32, body: &SMBRequestBody) -> SMBResult<SMBSyncHeader> {
        let (session_id, multi_credit) = {
            let state = self.inner.state.read().await;
            (
                state
                    .session
                    .as_ref()
                    .map(|session| session.session_id)
                    .unwrap_or(0),
                state
                    .negotiated
                    .as_ref()
                    .map(SMBNegotiatedParams::multi_credit)
                    .unwrap_or(false),
            )
        };
        let charge = body.credit_charge(multi_credit);
        let outstanding = self.inner.pending.lock().await.len();
        let message_id = self
            .inner
            .credits
            .lock()
            .await
            .consume(charge, outstanding)?;
        Ok(SMBSyncHeader::new(
            body.command_code(),
            charge,
            self.inner.config.desired_credits,
            message_id,
            tree_id,
            session_id,
        ))
    }

    async fn send_frame(&self, frame: Vec<u8>, message_ids: &[u64]) -> SMBResult<()> {
        let mut guard = self.inner.writer.lock().await;
        match guard.as_mut() {
            Some(writer) => {
                if let Err(error) = writer.write_frame(&frame).await {
                    *guard = None;
                    drop(guard);
                    warn!(%error, "write failed; treating as transport reset");
                    self.begin_reset(self.inner.generation.load(Ordering::SeqCst))
                        .await;
                    self.retire_reconnected(message_ids).await;
                }
                Ok(())
            }
            None => {
                drop(guard);
                // reset in progress; our slots may have missed the drain
                self.retire_reconnected(message_ids).await;
                Ok(())
            }
        }
    }

    async fn retire_reconnected(&self, message_ids: &[u64]) {
        let mut completers = Vec::new();
        {
            let mut pending = self.inner.pending.lock().await;
            for message_id in message_ids {
                if let Some(completer) = pending.remove(message_id) {
                    completers.push(completer);
                }
            }
        }
        for completer in completers {
            completer.complete(SMBRequestOutcome::Reconnected);
        }
    }

    /// Register and send one request; returns the in-flight handle.
    pub(crate) async fn submit(
        &self,
        tree_id: u32,
        body: SMBRequestBody,
    ) -> SMBResult<SMBOutstandingRequest> {
        let header = self.prepare_header(tree_id, &body).await?;
        let message_id = header.message_id;
        let (tx, rx) = oneshot::channel();
        let mut outstanding = SMBOutstandingRequest::new(message_id, rx);
        self.inner
            .pending
            .lock()
            .await
            .insert(message_id, SMBCompleter::Oneshot(tx));
        let frame = SMBMessage::new(header, body).as_bytes();
        self.send_frame(frame, &[message_id]).await?;
        outstanding.mark_sent();
        debug!(message_id, "request sent");
        Ok(outstanding)
    }

    /// Pipelined variant: completion lands on the shared window channel,
    /// tagged with the chunk's byte offset.
    pub(crate) async fn submit_tagged(
        &self,
        tree_id: u32,
        body: SMBRequestBody,
        tx: &mpsc::UnboundedSender<(u64, SMBRequestOutcome)>,
        tag: u64,
    ) -> SMBResult<u64> {
        let header = self.prepare_header(tree_id, &body).await?;
        let message_id = header.message_id;
        self.inner.pending.lock().await.insert(
            message_id,
            SMBCompleter::Window {
                tx: tx.clone(),
                tag,
            },
        );
        let frame = SMBMessage::new(header, body).as_bytes();
        self.send_frame(frame, &[message_id]).await?;
        Ok(message_id)
    }

    /// Simple calling mode: one request, cooperatively await its one
    /// reply (or the reset signal). Applies the configured timeout.
    /// A credit shortage while other work is in flight is transient:
    /// wait for a grant and retry instead of surfacing it.
    pub(crate) async fn issue(
        &self,
        tree_id: u32,
        body: SMBRequestBody,
    ) -> SMBResult<SMBRequestOutcome> {
        let outstanding = loop {
            match self.submit(tree_id, body.clone()).await {
                Ok(request) => break request,
                Err(SMBError::OutOfCredits(_)) => self.credit_grant_wait().await,
                Err(other) => return Err(other),
            }
        };
        let message_id = outstanding.message_id();
        match self.inner.config.request_timeout {
            None => outstanding.outcome().await,
            Some(limit) => match tokio::time::timeout(limit, outstanding.outcome()).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    self.cancel(message_id).await;
                    Err(SMBError::Cancelled)
                }
            },
        }
    }

    /// Cancel an outstanding request: its slot is reclaimed immediately
    /// (a late reply will be discarded by the driver) and, if the session
    /// is still usable, a wire cancel chases it. Cleanup after teardown
    /// sends nothing.
    pub async fn cancel(&self, message_id: u64) {
        let removed = self.inner.pending.lock().await.remove(&message_id);
        drop(removed);
        let session_id = {
            let state = self.inner.state.read().await;
            let usable = state.connected
                && state
                    .session
                    .as_ref()
                    .map(|session| session.established)
                    .unwrap_or(false);
            if !usable {
                trace!(message_id, "cancel cleanup without wire traffic");
                return;
            }
            state
                .session
                .as_ref()
                .map(|session| session.session_id)
                .unwrap_or(0)
        };
        let header = SMBSyncHeader::new(SMBCommandCode::Cancel, 0, 0, message_id, 0, session_id);
        let frame = SMBMessage::new(header, SMBRequestBody::Cancel(SMBCancelRequest)).as_bytes();
        let mut guard = self.inner.writer.lock().await;
        if let Some(writer) = guard.as_mut() {
            let _ = writer.write_frame(&frame).await;
        }
    }

    // ---- dialect negotiation: legacy probe + multi-dialect ----

    pub(crate) fn client_security_mode(&self) -> NegotiateSecurityMode {
        let mut mode = NegotiateSecurityMode::SIGNING_ENABLED;
        if self.inner.config.require_signing {
            mode |= NegotiateSecurityMode::SIGNING_REQUIRED;
        }
        mode
    }

    pub async fn negotiate(&self) -> SMBResult<SMBNegotiatedParams> {
        self.negotiate_internal(true).await
    }

    pub(crate) async fn negotiate_internal(
        &self,
        allow_probe: bool,
    ) -> SMBResult<SMBNegotiatedParams> {
        let offered = self.inner.config.dialects.clone();
        if offered.is_empty() {
            return Err(SMBError::precondition_failed("no candidate dialects"));
        }
        if allow_probe && self.inner.config.legacy_negotiate_probe {
            if let Some(params) = self.legacy_probe(&offered).await? {
                return Ok(params);
            }
        }
        let request = SMBNegotiateRequest {
            security_mode: self.client_security_mode(),
            capabilities: Capabilities::LEASING | Capabilities::LARGE_MTU,
            client_guid: self.inner.config.client_guid,
            dialects: offered.clone(),
        };
        match self.issue(0, SMBRequestBody::Negotiate(request)).await? {
            SMBRequestOutcome::Completed { header, body } => {
                check_status(&header, "negotiate")?;
                let (_, response) = SMBNegotiateResponse::smb_from_bytes(&body)?;
                self.finish_negotiate(&offered, response).await
            }
            SMBRequestOutcome::LegacyReply => Err(mismatch_error(&offered, 0)),
            SMBRequestOutcome::Reconnected => Err(SMBError::disconnected("negotiate")),
        }
    }

    /// First step of the two-step path: a single-dialect SMB1 probe. The
    /// server either answers with the 2.?? wildcard (go on to the full
    /// negotiate), picks a concrete 2.x directly, or reveals itself as
    /// SMB1-only.
    async fn legacy_probe(
        &self,
        offered: &[SMBDialect],
    ) -> SMBResult<Option<SMBNegotiatedParams>> {
        let outstanding_count = self.inner.pending.lock().await.len();
        let message_id = self.inner.credits.lock().await.consume(1, outstanding_count)?;
        self.inner.state.write().await.probe_message_id = Some(message_id);
        let (tx, rx) = oneshot::channel();
        let mut outstanding = SMBOutstandingRequest::new(message_id, rx);
        self.inner
            .pending
            .lock()
            .await
            .insert(message_id, SMBCompleter::Oneshot(tx));
        let frame = LegacySMBMessage::negotiate_probe().as_bytes();
        self.send_frame(frame, &[message_id]).await?;
        outstanding.mark_sent();
        let outcome = outstanding.outcome().await;
        self.inner.state.write().await.probe_message_id = None;
        match outcome? {
            SMBRequestOutcome::LegacyReply => {
                info!("server answered the probe in SMB1 only");
                Err(mismatch_error(offered, 0))
            }
            SMBRequestOutcome::Reconnected => Err(SMBError::disconnected("negotiate")),
            SMBRequestOutcome::Completed { header, body } => {
                check_status(&header, "negotiate")?;
                let (_, response) = SMBNegotiateResponse::smb_from_bytes(&body)?;
                if response.dialect.is_wildcard() {
                    debug!("probe answered with wildcard; running full negotiate");
                    Ok(None)
                } else {
                    self.finish_negotiate(offered, response).await.map(Some)
                }
            }
        }
    }

    async fn finish_negotiate(
        &self,
        offered: &[SMBDialect],
        response: SMBNegotiateResponse,
    ) -> SMBResult<SMBNegotiatedParams> {
        if !offered.contains(&response.dialect) {
            return Err(mismatch_error(offered, response.dialect as u16));
        }
        if self.inner.config.require_signing
            && !response
                .security_mode
                .contains(NegotiateSecurityMode::SIGNING_ENABLED)
        {
            return Err(SMBError::ServerSigningConflict);
        }
        let sizes = EffectiveSizes::derive(&response, &self.inner.config);
        let params = SMBNegotiatedParams {
            dialect: response.dialect,
            security_mode: response.security_mode,
            capabilities: response.capabilities,
            server_guid: response.server_guid,
            sizes,
            security_blob: response.security_blob,
        };
        info!(dialect = ?params.dialect, ?sizes, "dialect negotiated");
        self.inner.state.write().await.negotiated = Some(params.clone());
        Ok(params)
    }

    // ---- misc operations ----

    /// Liveness probe.
    pub async fn echo(&self) -> SMBResult<()> {
        let (header, body) = self
            .run_operation("echo", async |_connection: &Self| {
                Ok((0, SMBRequestBody::Echo(SMBEchoRequest)))
            })
            .await?;
        check_status(&header, "echo")?;
        SMBEchoResponse::smb_from_bytes(&body)?;
        Ok(())
    }

    /// Start a compound chain: members share one wire transmission and
    /// are answered in append order.
    pub fn compound(&self) -> SMBCompoundBuilder<F> {
        SMBCompoundBuilder {
            connection: self.clone(),
            members: Vec::new(),
        }
    }

    // ---- lease break delivery (out-of-band channel) ----

    fn spawn_break_worker(
        inner: &Arc<SMBConnectionInner<F>>,
        mut rx: mpsc::UnboundedReceiver<SMBBreakNotification>,
    ) {
        let weak = Arc::downgrade(inner);
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                match weak.upgrade() {
                    Some(inner) => {
                        SMBConnection { inner }.handle_break(notification).await;
                    }
                    None => break,
                }
            }
        });
    }

    async fn handle_break(&self, notification: SMBBreakNotification) {
        match notification {
            SMBBreakNotification::Oplock {
                oplock_level,
                file_id,
            } => {
                let mut opens = self.inner.opens.lock().await;
                if let Some(open) = opens
                    .values_mut()
                    .find(|open| open.valid && open.file_id == file_id)
                {
                    debug!(?oplock_level, "oplock broken");
                    open.oplock_level = oplock_level;
                } else {
                    warn!(?file_id, "oplock break for unknown open");
                }
            }
            SMBBreakNotification::Lease(notification) => {
                self.handle_lease_break(notification).await;
            }
        }
    }

    /// Locate the owner solely by lease key, update cached bits, and ack
    /// if demanded. The lease lock is never held across the ack wait.
    async fn handle_lease_break(
        &self,
        notification: crate::protocol::body::oplock_break::SMBLeaseBreakNotification,
    ) {
        let key = notification.lease_key;
        let known = {
            let mut leases = self.inner.leases.lock().await;
            leases.begin_break(key, notification.new_lease_state)
        };
        if !known {
            warn!("lease break with unknown key; state unchanged");
            let _ = self
                .inner
                .lease_event_tx
                .send(SMBLeaseEvent::UnknownKey { key });
            return;
        }
        if !notification.ack_required() {
            let committed = self.inner.leases.lock().await.commit_break(key);
            if let Some(new_state) = committed {
                debug!(?new_state, "lease break applied without ack");
                let _ = self
                    .inner
                    .lease_event_tx
                    .send(SMBLeaseEvent::BreakApplied { key, new_state });
            }
            return;
        }
        let ack = SMBLeaseBreakAck {
            lease_key: key,
            lease_state: notification.new_lease_state,
        };
        match self.issue(0, SMBRequestBody::LeaseBreakAck(ack)).await {
            Ok(SMBRequestOutcome::Completed { header, body }) => {
                if let Err(error) = check_status(&header, "lease_break_ack") {
                    warn!(%error, "lease break ack rejected");
                    return;
                }
                match SMBLeaseBreakResponse::smb_from_bytes(&body) {
                    Ok((_, response)) if response.lease_key == key => {
                        if let Some(new_state) = self.inner.leases.lock().await.commit_break(key) {
                            debug!(?new_state, "lease break acknowledged");
                            let _ = self
                                .inner
                                .lease_event_tx
                                .send(SMBLeaseEvent::BreakApplied { key, new_state });
                        }
                    }
                    Ok(_mismatched) => {
                        // echoed key does not match: MalformedReply, state untouched
                        warn!("lease break ack echoed a different key; state unchanged");
                        let _ = self
                            .inner
                            .lease_event_tx
                            .send(SMBLeaseEvent::MalformedAck { key });
                    }
                    Err(error) => warn!(%error, "unparseable lease break response"),
                }
            }
            Ok(_other) => warn!("lease break ack retired by reconnect"),
            Err(error) => warn!(%error, "lease break ack failed"),
        }
    }
}

/// Not-yet-sent compound chain. `add` appends a member; `send` patches
/// the chain offsets, transmits once, and resolves replies in the same
/// order the commands were appended.
pub struct SMBCompoundBuilder<F: SMBTransportFactory> {
    connection: SMBConnection<F>,
    members: Vec<(u32, SMBRequestBody)>,
}

impl<F: SMBTransportFactory> SMBCompoundBuilder<F> {
    pub fn add(mut self, tree_id: u32, body: SMBRequestBody) -> Self {
        self.members.push((tree_id, body));
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub async fn send(self) -> SMBResult<Vec<SMBRequestOutcome>> {
        let SMBCompoundBuilder {
            connection,
            members,
        } = self;
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let inner = &connection.inner;
        let (session_id, multi_credit) = {
            let state = inner.state.read().await;
            (
                state
                    .session
                    .as_ref()
                    .map(|session| session.session_id)
                    .unwrap_or(0),
                state
                    .negotiated
                    .as_ref()
                    .map(SMBNegotiatedParams::multi_credit)
                    .unwrap_or(false),
            )
        };
        let charges: Vec<u16> = members
            .iter()
            .map(|(_, body)| body.credit_charge(multi_credit))
            .collect();
        let message_ids = loop {
            let outstanding = inner.pending.lock().await.len();
            let allocated = {
                let mut credits = inner.credits.lock().await;
                credits.consume_compound(&charges, outstanding)
            };
            match allocated {
                Ok(ids) => break ids,
                Err(SMBError::OutOfCredits(_)) => connection.credit_grant_wait().await,
                Err(other) => return Err(other),
            }
        };
        let mut messages = Vec::with_capacity(members.len());
        let mut receivers = Vec::with_capacity(members.len());
        {
            let mut pending = inner.pending.lock().await;
            for (((tree_id, body), message_id), charge) in members
                .into_iter()
                .zip(message_ids.iter())
                .zip(charges.iter())
            {
                let (tx, rx) = oneshot::channel();
                pending.insert(*message_id, SMBCompleter::Oneshot(tx));
                receivers.push(SMBOutstandingRequest::new(*message_id, rx));
                let header = SMBSyncHeader::new(
                    body.command_code(),
                    *charge,
                    inner.config.desired_credits,
                    *message_id,
                    tree_id,
                    session_id,
                );
                messages.push(SMBMessage::new(header, body));
            }
        }
        let frame = encode_compound(&mut messages);
        connection.send_frame(frame, &message_ids).await?;
        let mut outcomes = Vec::with_capacity(receivers.len());
        for mut receiver in receivers {
            receiver.mark_sent();
            outcomes.push(receiver.outcome().await?);
        }
        Ok(outcomes)
    }
}

/// Translate a reply status: success and warnings pass, business errors
/// map 1:1 onto typed variants, anything else is a raw server error.
pub(crate) fn check_status(header: &SMBSyncHeader, command: &'static str) -> SMBResult<u32> {
    let raw = header.status;
    if !NTStatus::severity_is_error(raw) {
        return Ok(raw);
    }
    Err(NTStatus::to_business_error(raw, command)
        .unwrap_or_else(|| SMBError::server_error(raw, command)))
}

fn mismatch_error(offered: &[SMBDialect], selected: u16) -> SMBError {
    SMBError::protocol_mismatch(
        offered.iter().map(|dialect| *dialect as u16).collect(),
        selected,
    )
}
