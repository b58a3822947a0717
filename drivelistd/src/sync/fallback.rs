use std::str::FromStr;

use drivelist_core::{DirectoryEntry, ListingQuery};
use log::{info, warn};

use super::pagination::PageStream;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackMode {
    #[default]
    Adopt,
    Suggest,
}

impl FromStr for FallbackMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "adopt" => Ok(FallbackMode::Adopt),
            "suggest" => Ok(FallbackMode::Suggest),
            other => Err(format!("unknown fallback mode: {other}")),
        }
    }
}

pub enum Fallback {
    NotNeeded,
    StillEmpty,
    Widened {
        first: Vec<DirectoryEntry>,
        stream: PageStream,
    },
}

pub fn applies(query: &ListingQuery, first_page_len: usize) -> bool {
    first_page_len == 0 && query.is_time_bounded()
}

// Root fetches only; continuations never widen.
pub async fn widen_if_empty(bounded: &PageStream, first_page_len: usize) -> Fallback {
    if !applies(bounded.query(), first_page_len) {
        return Fallback::NotNeeded;
    }
    let mut stream = bounded.widened();
    match stream.next_batch().await {
        Ok(Some(first)) if !first.is_empty() => {
            info!(
                "time-bounded listing was empty; unbounded listing has {} entries",
                first.len()
            );
            Fallback::Widened { first, stream }
        }
        Ok(_) => Fallback::StillEmpty,
        Err(err) => {
            warn!("unbounded retry of empty listing failed: {err}");
            Fallback::StillEmpty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::time_range::ItemCap;
    use drivelist_core::DriveClient;
    use serde_json::json;
    use std::time::Duration;
    use time::macros::datetime;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BOUNDED_Q: &str =
        "trashed = false and 'root-1' in parents and modifiedTime > '2024-05-01T00:00:00Z'";
    const UNBOUNDED_Q: &str = "trashed = false and 'root-1' in parents";

    fn bounded_stream(server: &MockServer) -> PageStream {
        let client = DriveClient::with_base_url(&server.uri(), Some("test-key".into())).unwrap();
        let query = ListingQuery::browse("root-1")
            .modified_since(Some(datetime!(2024-05-01 00:00 UTC)));
        PageStream::new(client, query, ItemCap::Unlimited).with_page_delay(Duration::ZERO)
    }

    #[test]
    fn parses_modes() {
        assert_eq!("Suggest".parse::<FallbackMode>(), Ok(FallbackMode::Suggest));
        assert!("maybe".parse::<FallbackMode>().is_err());
    }

    #[test]
    fn only_empty_bounded_pages_qualify() {
        let bounded = ListingQuery::browse("r").modified_since(Some(datetime!(2024-01-01 0:00 UTC)));
        assert!(applies(&bounded, 0));
        assert!(!applies(&bounded, 3));
        assert!(!applies(&ListingQuery::browse("r"), 0));
    }

    #[tokio::test]
    async fn widens_when_unbounded_query_has_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", BOUNDED_Q))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", UNBOUNDED_Q))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{ "id": "old", "name": "old.txt", "mimeType": "text/plain",
                            "modifiedTime": "2020-01-01T00:00:00Z" }]
            })))
            .mount(&server)
            .await;

        let mut bounded = bounded_stream(&server);
        let first = bounded.next_batch().await.unwrap().unwrap();
        match widen_if_empty(&bounded, first.len()).await {
            Fallback::Widened { first, stream } => {
                assert_eq!(first[0].id, "old");
                assert!(!stream.query().is_time_bounded());
            }
            _ => panic!("expected widened listing"),
        }
    }

    #[tokio::test]
    async fn stays_empty_when_unbounded_query_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
            .expect(2)
            .mount(&server)
            .await;

        let mut bounded = bounded_stream(&server);
        let first = bounded.next_batch().await.unwrap().unwrap();
        assert!(matches!(
            widen_if_empty(&bounded, first.len()).await,
            Fallback::StillEmpty
        ));
    }
}
