//! Mirroring completed sessions into the remote SharePoint list.

mod graph;
mod sync;

pub use graph::GraphClient;
pub use sync::{RemoteSync, SyncFailure, TargetCache, log_failures};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::session::CompletedSession;
use crate::utils::time::{DATE_FORMAT, format_epoch};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("unauthorized (http {status}): {body}")]
    Unauthorized { status: u16, body: String },

    #[error("payload rejected by the list schema (http {status}): {body}")]
    SchemaMismatch { status: u16, body: String },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("remote target not configured: {0}")]
    ConfigurationError(String),
}

impl RemoteError {
    /// Map a non-2xx response onto the error taxonomy.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => RemoteError::Unauthorized { status, body },
            400 | 422 => RemoteError::SchemaMismatch { status, body },
            _ => RemoteError::Transient(format!("http {status}: {body}")),
        }
    }
}

/// Site and list ids the items are written to, tagged with the settings they
/// were resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTarget {
    pub site_url: String,
    pub list_name: String,
    pub site_id: String,
    pub list_id: String,
}

impl RemoteTarget {
    pub fn matches(&self, site_url: &str, list_name: &str) -> bool {
        self.site_url == site_url && self.list_name == list_name
    }
}

/// One list item, with the column names of the existing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "TaskDescription")]
    pub task_description: String,
    #[serde(rename = "Clock_x002d_inTime")]
    pub clock_in: String,
    #[serde(rename = "Clock_x002d_out")]
    pub clock_out: String,
    #[serde(rename = "Department")]
    pub department: String,
    #[serde(rename = "WorkerID")]
    pub worker_id: String,
    #[serde(rename = "Date")]
    pub date: String,
}

impl RemoteRecord {
    pub fn build(session: &CompletedSession, hostname: &str, today: NaiveDate) -> Self {
        Self {
            title: hostname.to_string(),
            task_description: session.task_description.clone(),
            clock_in: format_epoch(session.start),
            clock_out: format_epoch(session.end),
            department: session.identity.department.trim().to_string(),
            worker_id: session.identity.user_id.trim().to_string(),
            date: today.format(DATE_FORMAT).to_string(),
        }
    }
}

/// The remote list API.
#[async_trait]
pub trait RemoteLog: Send + Sync {
    /// Site id for a site URL such as `https://contoso.sharepoint.com/sites/team`.
    async fn resolve_site(&self, token: &str, site_url: &str) -> Result<String, RemoteError>;

    /// Id of the list called `list_name` on the site, if any.
    async fn find_list(
        &self,
        token: &str,
        site_id: &str,
        list_name: &str,
    ) -> Result<Option<String>, RemoteError>;

    async fn create_item(
        &self,
        token: &str,
        target: &RemoteTarget,
        record: &RemoteRecord,
    ) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::WorkerIdentity;
    use crate::utils::time::from_epoch_seconds;

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert!(matches!(
            RemoteError::from_status(401, ""),
            RemoteError::Unauthorized { status: 401, .. }
        ));
        assert!(matches!(
            RemoteError::from_status(403, ""),
            RemoteError::Unauthorized { .. }
        ));
        assert!(matches!(
            RemoteError::from_status(400, "bad field"),
            RemoteError::SchemaMismatch { .. }
        ));
        assert!(matches!(
            RemoteError::from_status(503, ""),
            RemoteError::Transient(_)
        ));
        assert!(matches!(
            RemoteError::from_status(404, ""),
            RemoteError::Transient(_)
        ));
    }

    #[test]
    fn record_uses_the_list_column_names() {
        let session = CompletedSession {
            task_description: "Fix bug".into(),
            start: 1000.0,
            end: 4600.0,
            duration_hours: 1.0,
            identity: WorkerIdentity {
                user_id: " 42 ".into(),
                department: "R&D".into(),
            },
        };
        let today = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let record = RemoteRecord::build(&session, "workstation-7", today);
        let json = serde_json::to_value(&record).unwrap();

        let start = from_epoch_seconds(1000.0).unwrap().format("%Y-%m-%d %H:%M:%S").to_string();
        assert_eq!(json["Title"], "workstation-7");
        assert_eq!(json["TaskDescription"], "Fix bug");
        assert_eq!(json["Clock_x002d_inTime"], start);
        assert!(json["Clock_x002d_out"].is_string());
        assert_eq!(json["Department"], "R&D");
        assert_eq!(json["WorkerID"], "42");
        assert_eq!(json["Date"], "2025-09-01");
        assert_eq!(json.as_object().unwrap().len(), 7);
    }
}
