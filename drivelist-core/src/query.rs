use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::entry::FOLDER_MIME_TYPE;
use crate::error::DriveError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchScope {
    #[default]
    Global,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingScope {
    BrowseChildren { container_id: String },
    SearchWithin { container_id: String, text: String },
    SearchGlobal { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub scope: ListingScope,
    pub modified_since: Option<OffsetDateTime>,
    pub folders_only: bool,
}

impl ListingScope {
    pub fn for_filter(container_id: &str, text: Option<&str>, scope: SearchScope) -> Self {
        match text.map(str::trim).filter(|text| !text.is_empty()) {
            None => ListingScope::BrowseChildren {
                container_id: container_id.to_string(),
            },
            Some(text) => match scope {
                SearchScope::Global => ListingScope::SearchGlobal {
                    text: text.to_string(),
                },
                SearchScope::Current => ListingScope::SearchWithin {
                    container_id: container_id.to_string(),
                    text: text.to_string(),
                },
            },
        }
    }

    pub fn parent(&self) -> Option<&str> {
        match self {
            ListingScope::BrowseChildren { container_id }
            | ListingScope::SearchWithin { container_id, .. } => Some(container_id),
            ListingScope::SearchGlobal { .. } => None,
        }
    }

    pub fn name_filter(&self) -> Option<&str> {
        match self {
            ListingScope::BrowseChildren { .. } => None,
            ListingScope::SearchWithin { text, .. } | ListingScope::SearchGlobal { text } => {
                Some(text)
            }
        }
    }
}

impl ListingQuery {
    pub fn browse(container_id: impl Into<String>) -> Self {
        Self::new(ListingScope::BrowseChildren {
            container_id: container_id.into(),
        })
    }

    pub fn new(scope: ListingScope) -> Self {
        Self {
            scope,
            modified_since: None,
            folders_only: false,
        }
    }

    pub fn modified_since(mut self, bound: Option<OffsetDateTime>) -> Self {
        self.modified_since = bound;
        self
    }

    pub fn folders_only(mut self) -> Self {
        self.folders_only = true;
        self
    }

    pub fn without_time_bound(&self) -> Self {
        Self {
            modified_since: None,
            ..self.clone()
        }
    }

    pub fn is_time_bounded(&self) -> bool {
        self.modified_since.is_some()
    }

    pub fn to_q(&self) -> Result<String, DriveError> {
        let mut clauses = vec!["trashed = false".to_string()];
        if let Some(text) = self.scope.name_filter() {
            clauses.push(format!("name contains '{}'", escape(text)));
        }
        if let Some(parent) = self.scope.parent() {
            clauses.push(format!("'{}' in parents", escape(parent)));
        }
        if self.folders_only {
            clauses.push(format!("mimeType = '{FOLDER_MIME_TYPE}'"));
        }
        if let Some(bound) = self.modified_since {
            let formatted = bound
                .format(&Rfc3339)
                .map_err(|err| DriveError::Malformed {
                    message: format!("modified-time bound {bound}: {err}"),
                })?;
            clauses.push(format!("modifiedTime > '{formatted}'"));
        }
        Ok(clauses.join(" and "))
    }

    pub fn corpora(&self) -> Option<&'static str> {
        match self.scope {
            ListingScope::SearchGlobal { .. } => Some("allDrives"),
            _ => None,
        }
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn browse_is_restricted_to_parent() {
        let query = ListingQuery::browse("root-1");
        assert_eq!(query.to_q().unwrap(), "trashed = false and 'root-1' in parents");
        assert_eq!(query.corpora(), None);
    }

    #[test]
    fn blank_filter_collapses_to_browse() {
        let scope = ListingScope::for_filter("root-1", Some("   "), SearchScope::Global);
        assert_eq!(
            scope,
            ListingScope::BrowseChildren {
                container_id: "root-1".into()
            }
        );
    }

    #[test]
    fn global_search_never_names_a_parent() {
        let scope = ListingScope::for_filter("root-1", Some("scan"), SearchScope::Global);
        let query = ListingQuery::new(scope);
        assert_eq!(query.to_q().unwrap(), "trashed = false and name contains 'scan'");
        assert_eq!(query.corpora(), Some("allDrives"));
    }

    #[test]
    fn scoped_search_combines_name_and_parent() {
        let scope = ListingScope::for_filter("root-1", Some("O'Brien"), SearchScope::Current);
        let query = ListingQuery::new(scope);
        assert_eq!(
            query.to_q().unwrap(),
            "trashed = false and name contains 'O\\'Brien' and 'root-1' in parents"
        );
        assert_eq!(query.corpora(), None);
    }

    #[test]
    fn time_bound_renders_rfc3339_and_can_be_dropped() {
        let query =
            ListingQuery::browse("root-1").modified_since(Some(datetime!(2024-03-01 08:30 UTC)));
        assert!(
            query
                .to_q()
                .unwrap()
                .ends_with("and modifiedTime > '2024-03-01T08:30:00Z'")
        );
        let widened = query.without_time_bound();
        assert!(!widened.is_time_bounded());
        assert_eq!(widened.scope, query.scope);
    }

    #[test]
    fn folders_only_adds_mime_clause() {
        let query = ListingQuery::browse("root-1").folders_only();
        assert!(
            query
                .to_q()
                .unwrap()
                .contains("mimeType = 'application/vnd.google-apps.folder'")
        );
    }

    #[test]
    fn unrenderable_time_bound_is_an_error_not_a_wider_query() {
        let offset = time::UtcOffset::from_hms(0, 0, 30).unwrap();
        let bound = datetime!(2024-03-01 08:30 UTC).to_offset(offset);
        let query = ListingQuery::browse("root-1").modified_since(Some(bound));

        assert!(query.is_time_bounded());
        let err = query.to_q().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);
    }
}
