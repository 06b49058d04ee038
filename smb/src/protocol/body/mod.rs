mod body;
pub mod cancel;
pub mod capabilities;
pub mod change_notify;
pub mod close;
pub mod create;
pub mod dialect;
pub mod echo;
pub mod error;
pub mod file_id;
pub mod filetime;
pub mod flush;
pub mod ioctl;
pub mod lock;
pub mod logoff;
pub mod negotiate;
pub mod oplock_break;
pub mod query_directory;
pub mod query_info;
pub mod read;
pub mod security_mode;
pub mod session_setup;
pub mod set_info;
pub mod tree_connect;
pub mod write;

pub type SMBRequestBody = body::SMBRequestBody;
pub type Capabilities = capabilities::Capabilities;
pub type SMBDialect = dialect::SMBDialect;
pub type FileTime = filetime::FileTime;
pub type NegotiateSecurityMode = security_mode::NegotiateSecurityMode;
pub type SMBFileId = file_id::SMBFileId;

pub(crate) use body::{expect_structure_size, slice_from_header_offset};
