use smb_core::SMBResult;
use smb_core::error::SMBError;

use crate::client::config::SMBClientConfig;
use crate::protocol::body::negotiate::SMBNegotiateResponse;

const PAGE_SIZE: u32 = 4096;
pub(crate) const CREDIT_GRANULE: u32 = 65536;

/// Sizes actually used after clamping the server's offers against local
/// policy. These gate single requests and pipelined chunks alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveSizes {
    pub max_read: u32,
    pub max_write: u32,
    pub max_transact: u32,
}

impl EffectiveSizes {
    pub fn derive(response: &SMBNegotiateResponse, config: &SMBClientConfig) -> Self {
        Self {
            max_read: response.max_read_size.min(config.size_ceiling),
            max_write: round_down_to_page(response.max_write_size.min(config.size_ceiling)),
            max_transact: response
                .max_transact_size
                .min(config.transport_send_buffer),
        }
    }
}

/// Round down to a page multiple, but never below one page.
fn round_down_to_page(value: u32) -> u32 {
    if value <= PAGE_SIZE {
        value
    } else {
        value - value % PAGE_SIZE
    }
}

/// Message-id allocation fused with credit accounting: a multi-credit
/// request consumes as many ids as credits, so both advance together
/// under one lock.
#[derive(Debug)]
pub(crate) struct CreditWindow {
    next_message_id: u64,
    available: u16,
}

impl CreditWindow {
    pub(crate) fn new() -> Self {
        // one implicit credit until the first grant arrives
        Self {
            next_message_id: 0,
            available: 1,
        }
    }

    /// Take `charge` credits and the matching id range. With requests
    /// outstanding a shortage is transient (`OutOfCredits`, retried by
    /// the caller after a completion grants more); with nothing in
    /// flight the request goes out anyway, since only a reply can ever
    /// refill the window.
    pub(crate) fn consume(&mut self, charge: u16, outstanding: usize) -> SMBResult<u64> {
        let message_id = self.next_message_id;
        if charge == 0 {
            return Ok(message_id);
        }
        if self.available < charge && outstanding > 0 {
            return Err(SMBError::out_of_credits(charge, self.available));
        }
        self.available = self.available.saturating_sub(charge);
        self.next_message_id += charge as u64;
        Ok(message_id)
    }

    /// All-or-nothing allocation for a compound chain: the whole chain
    /// rides one transmission, so splitting it on a shortage is useless.
    pub(crate) fn consume_compound(
        &mut self,
        charges: &[u16],
        outstanding: usize,
    ) -> SMBResult<Vec<u64>> {
        let total: u16 = charges.iter().sum();
        if self.available < total && outstanding > 0 {
            return Err(SMBError::out_of_credits(total, self.available));
        }
        self.available = self.available.saturating_sub(total);
        let mut ids = Vec::with_capacity(charges.len());
        for charge in charges {
            ids.push(self.next_message_id);
            self.next_message_id += (*charge).max(1) as u64;
        }
        Ok(ids)
    }

    pub(crate) fn grant(&mut self, credits: u16) {
        self.available = self.available.saturating_add(credits);
    }

    /// Largest chunk the window can carry right now, for shrinking a
    /// pipelined transfer instead of failing it.
    pub(crate) fn max_chunk(&self, wanted: u32) -> u32 {
        if self.available == 0 {
            wanted.min(CREDIT_GRANULE)
        } else {
            wanted.min(self.available as u32 * CREDIT_GRANULE)
        }
    }
}
