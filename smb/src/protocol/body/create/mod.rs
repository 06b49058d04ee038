mod context;
mod create;
mod oplock;
mod options;

pub type SMBCreateRequest = create::SMBCreateRequest;
pub type SMBCreateResponse = create::SMBCreateResponse;
pub type SMBCreateRequestContext = context::SMBCreateRequestContext;
pub type SMBCreateResponseContext = context::SMBCreateResponseContext;
pub type SMBLeaseKey = context::SMBLeaseKey;
pub type SMBOplockLevel = oplock::SMBOplockLevel;
pub type SMBLeaseState = oplock::SMBLeaseState;
pub type SMBCreateDisposition = options::SMBCreateDisposition;
pub type SMBCreateOptions = options::SMBCreateOptions;
pub type SMBCreateAction = options::SMBCreateAction;
pub type SMBShareAccess = options::SMBShareAccess;
pub type SMBFileAttributes = options::SMBFileAttributes;
pub type SMBImpersonationLevel = options::SMBImpersonationLevel;

pub use context::{
    CONTEXT_DURABLE_RECONNECT, CONTEXT_DURABLE_REQUEST, CONTEXT_LEASE, CONTEXT_MAXIMAL_ACCESS,
    CONTEXT_QUERY_FILE_ID, CONTEXT_VENDOR_QUERY, encode_contexts, parse_contexts,
};
pub use create::{CREATE_REQUEST_SIZE, CREATE_RESPONSE_SIZE};
