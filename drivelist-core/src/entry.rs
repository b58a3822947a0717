use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Folder,
    File {
        size_bytes: Option<u64>,
        content_type: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    pub external_url: Option<String>,
}

impl DirectoryEntry {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, EntryKind::Folder)
    }

    pub fn size_bytes(&self) -> Option<u64> {
        match &self.kind {
            EntryKind::File { size_bytes, .. } => *size_bytes,
            EntryKind::Folder => None,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::File { content_type, .. } => content_type.as_deref(),
            EntryKind::Folder => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub entries: Vec<DirectoryEntry>,
    pub next_cursor: Option<String>,
}

/// Best-effort child-folder count. `Unknown` means the count could not be
/// obtained, which is not the same as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderCount {
    Counted(u32),
    Unknown,
}

impl FolderCount {
    pub fn counted(self) -> Option<u32> {
        match self {
            FolderCount::Counted(count) => Some(count),
            FolderCount::Unknown => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileList {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub files: Vec<FileResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_time: Option<OffsetDateTime>,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

impl From<FileResource> for DirectoryEntry {
    fn from(file: FileResource) -> Self {
        let kind = if file.mime_type.as_deref() == Some(FOLDER_MIME_TYPE) {
            EntryKind::Folder
        } else {
            EntryKind::File {
                size_bytes: file.size.as_deref().and_then(|size| size.parse().ok()),
                content_type: file.mime_type,
            }
        };
        // The listing always asks for modifiedTime; a missing one sorts last.
        let last_modified = file
            .modified_time
            .or(file.created_time)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        Self {
            id: file.id,
            name: file.name,
            kind,
            last_modified,
            created_at: file.created_time,
            external_url: file.web_view_link,
        }
    }
}

impl From<FileList> for ListingPage {
    fn from(list: FileList) -> Self {
        Self {
            entries: list.files.into_iter().map(DirectoryEntry::from).collect(),
            next_cursor: list.next_page_token.filter(|token| !token.is_empty()),
        }
    }
}
