use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use smb_core::{SMBFromBytes, SMBResult};
use smb_core::error::SMBError;
use smb_core::nt_status::NTStatus;

use crate::client::connection::{SMBConnection, check_status};
use crate::client::open::SMBOpen;
use crate::client::request::SMBRequestOutcome;
use crate::protocol::body::SMBRequestBody;
use crate::protocol::body::read::{SMBReadFlags, SMBReadRequest, SMBReadResponse};
use crate::protocol::body::write::{SMBWriteFlags, SMBWriteRequest, SMBWriteResponse};
use crate::protocol::header::SMBSyncHeader;
use crate::transport::SMBTransportFactory;

/// Pipelined transfers: a large read/write is split into chunks no
/// larger than the negotiated size, with up to `read_window` /
/// `write_window` requests outstanding. Completions may arrive in any
/// order; ranges are disjoint and pre-assigned, so reordering cannot
/// corrupt the destination. A transport reset mid-window restores from
/// the un-applied ranges and resends exactly once for the whole
/// operation.

fn is_credit_shortage(raw: u32) -> bool {
    raw == NTStatus::InsufficientResources as u32
}

/// Bytes transferred measured from the start: the contiguous prefix of
/// applied ranges, stopping at the first short chunk.
fn contiguous_total(completed: &mut [(u64, u32, u32)]) -> u64 {
    completed.sort_by_key(|entry| entry.0);
    let mut total = 0u64;
    for (rel, requested, actual) in completed.iter() {
        if *rel != total {
            break;
        }
        total += *actual as u64;
        if actual < requested {
            break;
        }
    }
    total
}

fn apply_read_completion(
    dest: &mut [u8],
    completed: &mut Vec<(u64, u32, u32)>,
    queue: &mut Vec<(u64, u32)>,
    stop: &mut bool,
    rel: u64,
    requested: u32,
    header: &SMBSyncHeader,
    body: &Bytes,
) -> SMBResult<()> {
    if header.status == NTStatus::EndOfFile as u32 {
        completed.push((rel, requested, 0));
        *stop = true;
        return Ok(());
    }
    if is_credit_shortage(header.status) {
        trace!(rel, "server signalled credit shortage; chunk requeued");
        queue.push((rel, requested));
        return Ok(());
    }
    check_status(header, "read")?;
    let (_, response) = SMBReadResponse::smb_from_bytes(body)?;
    let actual = response.data.len().min(requested as usize);
    let start = rel as usize;
    dest[start..start + actual].copy_from_slice(&response.data[..actual]);
    completed.push((rel, requested, actual as u32));
    // short or empty chunk: endpoint has no more bytes for now
    if (actual as u32) < requested {
        *stop = true;
    }
    Ok(())
}

fn apply_write_completion(
    completed: &mut Vec<(u64, u32, u32)>,
    queue: &mut Vec<(u64, u32)>,
    stop: &mut bool,
    rel: u64,
    requested: u32,
    header: &SMBSyncHeader,
    body: &Bytes,
) -> SMBResult<()> {
    if is_credit_shortage(header.status) {
        trace!(rel, "server signalled credit shortage; chunk requeued");
        queue.push((rel, requested));
        return Ok(());
    }
    check_status(header, "write")?;
    let (_, response) = SMBWriteResponse::smb_from_bytes(body)?;
    let actual = response.count.min(requested);
    completed.push((rel, requested, actual));
    if actual < requested {
        *stop = true;
    }
    Ok(())
}

impl<F: SMBTransportFactory> SMBOpen<F> {
    /// Read into `dest` starting at `offset`. Fewer bytes than requested
    /// is a legal result once at least one chunk ran short (end of file,
    /// or a pipe with less buffered); the count is exact either way.
    pub async fn read(&self, offset: u64, dest: &mut [u8]) -> SMBResult<usize> {
        if dest.is_empty() {
            return Ok(0);
        }
        let connection = self.connection.clone();
        let params = connection
            .negotiated()
            .await
            .ok_or_else(|| SMBError::precondition_failed("read before negotiate"))?;
        let chunk_limit = params.sizes.max_read.max(1);
        let window = connection.inner.config.read_window.max(1);
        let total = dest.len() as u64;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut next_unsent = 0u64;
        let mut queue: Vec<(u64, u32)> = Vec::new();
        let mut in_flight: HashMap<u64, u32> = HashMap::new();
        let mut completed: Vec<(u64, u32, u32)> = Vec::new();
        let mut stop = false;
        let mut resent = false;
        loop {
            // requeued ranges are always eligible; fresh ranges stop once
            // a chunk ran short
            while in_flight.len() < window {
                let (rel, want) = match queue.pop() {
                    Some(range) => range,
                    None => {
                        if stop || next_unsent >= total {
                            break;
                        }
                        let want = chunk_limit.min((total - next_unsent) as u32);
                        // shrink to what the credit window carries now
                        let want = connection.inner.credits.lock().await.max_chunk(want);
                        let range = (next_unsent, want);
                        next_unsent += want as u64;
                        range
                    }
                };
                match self
                    .send_read_chunk(&connection, offset, rel, want, total, &tx)
                    .await
                {
                    Ok(()) => {
                        in_flight.insert(rel, want);
                    }
                    Err(SMBError::OutOfCredits(_)) => {
                        queue.push((rel, want));
                        break;
                    }
                    Err(SMBError::Disconnected(reason)) => {
                        queue.push((rel, want));
                        if !in_flight.is_empty() {
                            break;
                        }
                        if resent {
                            return Err(SMBError::Disconnected(reason));
                        }
                        resent = true;
                        connection.reestablish().await?;
                    }
                    Err(other) => return Err(other),
                }
            }
            if in_flight.is_empty() {
                if queue.is_empty() && (stop || next_unsent >= total) {
                    break;
                }
                connection.credit_grant_wait().await;
                continue;
            }
            let Some((rel, outcome)) = rx.recv().await else { break };
            let Some(requested) = in_flight.remove(&rel) else {
                continue;
            };
            match outcome {
                SMBRequestOutcome::Completed { header, body } => {
                    apply_read_completion(
                        dest,
                        &mut completed,
                        &mut queue,
                        &mut stop,
                        rel,
                        requested,
                        &header,
                        &body,
                    )?;
                }
                SMBRequestOutcome::LegacyReply => {
                    return Err(SMBError::malformed_reply("SMB1 reply outside negotiate"));
                }
                SMBRequestOutcome::Reconnected => {
                    queue.push((rel, requested));
                    if resent {
                        return Err(SMBError::disconnected("read"));
                    }
                    resent = true;
                    // the rest of the dead window resolves promptly;
                    // replies that raced the reset still count
                    while !in_flight.is_empty() {
                        let Some((rel2, outcome2)) = rx.recv().await else { break };
                        let Some(requested2) = in_flight.remove(&rel2) else {
                            continue;
                        };
                        match outcome2 {
                            SMBRequestOutcome::Completed { header, body } => {
                                apply_read_completion(
                                    dest,
                                    &mut completed,
                                    &mut queue,
                                    &mut stop,
                                    rel2,
                                    requested2,
                                    &header,
                                    &body,
                                )?;
                            }
                            _retired => queue.push((rel2, requested2)),
                        }
                    }
                    debug!(
                        unapplied = queue.len(),
                        "read window reset; resending un-applied ranges"
                    );
                    connection.reestablish().await?;
                }
            }
        }
        Ok(contiguous_total(&mut completed) as usize)
    }

    /// Write `data` at `offset`. Partial totals are legal for pipe and
    /// printer endpoints; a zero-byte error-free completion ends the
    /// transfer.
    pub async fn write(&self, offset: u64, data: &[u8]) -> SMBResult<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let connection = self.connection.clone();
        let params = connection
            .negotiated()
            .await
            .ok_or_else(|| SMBError::precondition_failed("write before negotiate"))?;
        let chunk_limit = params.sizes.max_write.max(1);
        let window = connection.inner.config.write_window.max(1);
        let total = data.len() as u64;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut next_unsent = 0u64;
        let mut queue: Vec<(u64, u32)> = Vec::new();
        let mut in_flight: HashMap<u64, u32> = HashMap::new();
        let mut completed: Vec<(u64, u32, u32)> = Vec::new();
        let mut stop = false;
        let mut resent = false;
        loop {
            // requeued ranges are always eligible; fresh ranges stop once
            // a chunk ran short
            while in_flight.len() < window {
                let (rel, want) = match queue.pop() {
                    Some(range) => range,
                    None => {
                        if stop || next_unsent >= total {
                            break;
                        }
                        let want = chunk_limit.min((total - next_unsent) as u32);
                        let want = connection.inner.credits.lock().await.max_chunk(want);
                        let range = (next_unsent, want);
                        next_unsent += want as u64;
                        range
                    }
                };
                match self
                    .send_write_chunk(&connection, offset, rel, want, data, &tx)
                    .await
                {
                    Ok(()) => {
                        in_flight.insert(rel, want);
                    }
                    Err(SMBError::OutOfCredits(_)) => {
                        queue.push((rel, want));
                        break;
                    }
                    Err(SMBError::Disconnected(reason)) => {
                        queue.push((rel, want));
                        if !in_flight.is_empty() {
                            break;
                        }
                        if resent {
                            return Err(SMBError::Disconnected(reason));
                        }
                        resent = true;
                        connection.reestablish().await?;
                    }
                    Err(other) => return Err(other),
                }
            }
            if in_flight.is_empty() {
                if queue.is_empty() && (stop || next_unsent >= total) {
                    break;
                }
                connection.credit_grant_wait().await;
                continue;
            }
            let Some((rel, outcome)) = rx.recv().await else { break };
            let Some(requested) = in_flight.remove(&rel) else {
                continue;
            };
            match outcome {
                SMBRequestOutcome::Completed { header, body } => {
                    apply_write_completion(
                        &mut completed,
                        &mut queue,
                        &mut stop,
                        rel,
                        requested,
                        &header,
                        &body,
                    )?;
                }
                SMBRequestOutcome::LegacyReply => {
                    return Err(SMBError::malformed_reply("SMB1 reply outside negotiate"));
                }
                SMBRequestOutcome::Reconnected => {
                    queue.push((rel, requested));
                    if resent {
                        return Err(SMBError::disconnected("write"));
                    }
                    resent = true;
                    while !in_flight.is_empty() {
                        let Some((rel2, outcome2)) = rx.recv().await else { break };
                        let Some(requested2) = in_flight.remove(&rel2) else {
                            continue;
                        };
                        match outcome2 {
                            SMBRequestOutcome::Completed { header, body } => {
                                apply_write_completion(
                                    &mut completed,
                                    &mut queue,
                                    &mut stop,
                                    rel2,
                                    requested2,
                                    &header,
                                    &body,
                                )?;
                            }
                            _retired => queue.push((rel2, requested2)),
                        }
                    }
                    debug!(
                        unapplied = queue.len(),
                        "write window reset; resending un-applied ranges"
                    );
                    connection.reestablish().await?;
                }
            }
        }
        Ok(contiguous_total(&mut completed) as usize)
    }

    async fn send_read_chunk(
        &self,
        connection: &SMBConnection<F>,
        base: u64,
        rel: u64,
        want: u32,
        total: u64,
        tx: &mpsc::UnboundedSender<(u64, SMBRequestOutcome)>,
    ) -> SMBResult<()> {
        let (wire_tree, file_id, _share) = connection.open_route(self.local_id).await?;
        let remaining = total.saturating_sub(rel + want as u64).min(u32::MAX as u64) as u32;
        let body = SMBRequestBody::Read(SMBReadRequest {
            flags: SMBReadFlags::empty(),
            length: want,
            offset: base + rel,
            file_id,
            minimum_count: 0,
            remaining_bytes: remaining,
        });
        connection
            .submit_tagged(wire_tree, body, tx, rel)
            .await
            .map(|_message_id| ())
    }

    async fn send_write_chunk(
        &self,
        connection: &SMBConnection<F>,
        base: u64,
        rel: u64,
        want: u32,
        data: &[u8],
        tx: &mpsc::UnboundedSender<(u64, SMBRequestOutcome)>,
    ) -> SMBResult<()> {
        let (wire_tree, file_id, _share) = connection.open_route(self.local_id).await?;
        let start = rel as usize;
        let chunk = data[start..start + want as usize].to_vec();
        let remaining = (data.len() as u64)
            .saturating_sub(rel + want as u64)
            .min(u32::MAX as u64) as u32;
        let body = SMBRequestBody::Write(SMBWriteRequest {
            offset: base + rel,
            file_id,
            flags: SMBWriteFlags::empty(),
            remaining_bytes: remaining,
            data: chunk,
        });
        connection
            .submit_tagged(wire_tree, body, tx, rel)
            .await
            .map(|_message_id| ())
    }
}
