mod query_directory;

pub type SMBQueryDirectoryRequest = query_directory::SMBQueryDirectoryRequest;
pub type SMBQueryDirectoryResponse = query_directory::SMBQueryDirectoryResponse;
pub type SMBDirectoryInformationClass = query_directory::SMBDirectoryInformationClass;
pub type SMBQueryDirectoryFlags = query_directory::SMBQueryDirectoryFlags;
pub type SMBDirectoryEntry = query_directory::SMBDirectoryEntry;
pub type SMBDirectoryEntryList = query_directory::SMBDirectoryEntryList;

pub use query_directory::{
    QUERY_DIRECTORY_REQUEST_SIZE, QUERY_DIRECTORY_RESPONSE_SIZE, encode_entries,
};
