//! Client-side SMB2/2.1 protocol engine: dialect negotiation (including
//! the two-step legacy-probe path), session and tree management, typed
//! request marshalling and structurally validated reply parsing, an
//! async multiplexed dispatcher with pipelined large transfers,
//! transparent reconnection with durable-handle reclaim, and the lease
//! lifecycle.
//!
//! The raw byte stream, authentication tokens, and signing/encryption
//! material are external collaborators behind the [`transport`] and
//! [`util::auth`] seams.

mod byte_helper;

pub mod client;
pub mod protocol;
pub mod transport;
pub mod util;
