mod negotiate;

pub type SMBNegotiateRequest = negotiate::SMBNegotiateRequest;
pub type SMBNegotiateResponse = negotiate::SMBNegotiateResponse;
pub type LegacySMBNegotiateRequest = negotiate::LegacySMBNegotiateRequest;

pub use negotiate::{NEGOTIATE_REQUEST_SIZE, NEGOTIATE_RESPONSE_SIZE};
