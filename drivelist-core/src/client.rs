use log::{debug, warn};
use reqwest::Client;
use url::Url;

use crate::entry::{FileList, FolderCount, ListingPage};
use crate::error::DriveError;
use crate::query::ListingQuery;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
pub const MAX_PAGE_SIZE: u32 = 1000;

const FILES_PATH: &str = "/drive/v3/files";
const LISTING_FIELDS: &str =
    "nextPageToken, files(id, name, mimeType, size, modifiedTime, createdTime, webViewLink)";
const ORDER_BY: &str = "folder,modifiedTime desc";

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl DriveClient {
    pub fn new(api_key: Option<String>) -> Result<Self, DriveError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: Option<String>) -> Result<Self, DriveError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub async fn fetch_page(
        &self,
        query: &ListingQuery,
        page_size_hint: u32,
        cursor: Option<&str>,
    ) -> Result<ListingPage, DriveError> {
        let api_key = self.api_key.as_deref().ok_or(DriveError::NoCredential)?;
        let page_size = page_size_hint.clamp(1, MAX_PAGE_SIZE);
        let q = query.to_q()?;
        let mut url = self.endpoint(FILES_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", &q)
                .append_pair("key", api_key)
                .append_pair("supportsAllDrives", "true")
                .append_pair("includeItemsFromAllDrives", "true")
                .append_pair("fields", LISTING_FIELDS)
                .append_pair("pageSize", &page_size.to_string())
                .append_pair("orderBy", ORDER_BY);
            if let Some(corpora) = query.corpora() {
                pairs.append_pair("corpora", corpora);
            }
            if let Some(cursor) = cursor {
                pairs.append_pair("pageToken", cursor);
            }
        }
        debug!(
            "listing q=[{}] page_size={} continuation={}",
            q,
            page_size,
            cursor.is_some()
        );
        let response = self.http.get(url).send().await?;
        let list: FileList = Self::handle_response(response).await?;
        Ok(list.into())
    }

    pub async fn fetch_child_folder_count(&self, container_id: &str) -> FolderCount {
        let query = ListingQuery::browse(container_id).folders_only();
        match self.fetch_page(&query, MAX_PAGE_SIZE, None).await {
            Ok(page) => FolderCount::Counted(page.entries.len() as u32),
            Err(err) => {
                warn!("child folder count for {container_id} unavailable: {err}");
                FolderCount::Unknown
            }
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, DriveError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DriveError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(DriveError::from_response(status, &body))
        }
    }
}
