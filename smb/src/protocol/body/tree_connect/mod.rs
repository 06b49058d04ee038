mod access_mask;
mod tree_connect;

pub type SMBAccessMask = access_mask::SMBAccessMask;
pub type SMBTreeConnectRequest = tree_connect::SMBTreeConnectRequest;
pub type SMBTreeConnectResponse = tree_connect::SMBTreeConnectResponse;
pub type SMBShareType = tree_connect::SMBShareType;
pub type SMBShareFlags = tree_connect::SMBShareFlags;
pub type SMBTreeConnectCapabilities = tree_connect::SMBTreeConnectCapabilities;

pub use tree_connect::{
    SMBTreeDisconnectRequest, TREE_CONNECT_REQUEST_SIZE, TREE_CONNECT_RESPONSE_SIZE,
    TREE_DISCONNECT_SIZE,
};
