mod client;
mod entry;
mod error;
mod query;

pub use client::{DEFAULT_BASE_URL, DriveClient, MAX_PAGE_SIZE};
pub use entry::{DirectoryEntry, EntryKind, FOLDER_MIME_TYPE, FolderCount, ListingPage};
pub use error::{DriveError, ErrorClass, ErrorKind};
pub use query::{ListingQuery, ListingScope, SearchScope};
