use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{RemoteError, RemoteLog, RemoteRecord, RemoteTarget};

const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Microsoft Graph client for the three calls the application needs.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: Client,
    base_url: String,
}

impl Default for GraphClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct SiteResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListsPage {
    #[serde(default)]
    value: Vec<ListEntry>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    id: String,
    name: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[derive(serde::Serialize)]
struct CreateItemRequest<'a> {
    fields: &'a RemoteRecord,
}

impl GraphClient {
    pub fn new() -> Self {
        Self::with_base_url(GRAPH_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `https://host/sites/team` -> `{base}/sites/host:/sites/team`
    pub fn site_endpoint(&self, site_url: &str) -> Result<String, RemoteError> {
        let parsed = Url::parse(site_url.trim()).map_err(|error| {
            RemoteError::ConfigurationError(format!("invalid site url '{site_url}': {error}"))
        })?;
        let host = parsed.host_str().ok_or_else(|| {
            RemoteError::ConfigurationError(format!("site url '{site_url}' has no host"))
        })?;

        let path = parsed.path().trim_end_matches('/');
        if path.is_empty() {
            Ok(format!("{}/sites/{host}", self.base_url))
        } else {
            Ok(format!("{}/sites/{host}:{path}", self.base_url))
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        url: &str,
    ) -> Result<T, RemoteError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| RemoteError::Transient(format!("network error: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| RemoteError::Transient(format!("failed reading response: {error}")))?;

        if !status.is_success() {
            return Err(RemoteError::from_status(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|error| {
            RemoteError::Transient(format!("invalid response payload: {error}; body={body}"))
        })
    }
}

#[async_trait]
impl RemoteLog for GraphClient {
    async fn resolve_site(&self, token: &str, site_url: &str) -> Result<String, RemoteError> {
        let url = self.site_endpoint(site_url)?;
        let site: SiteResponse = self.get_json(token, &url).await?;
        site.id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| RemoteError::ConfigurationError(format!("no site found at {site_url}")))
    }

    async fn find_list(
        &self,
        token: &str,
        site_id: &str,
        list_name: &str,
    ) -> Result<Option<String>, RemoteError> {
        let mut next = Some(format!("{}/sites/{site_id}/lists", self.base_url));

        while let Some(url) = next {
            let page: ListsPage = self.get_json(token, &url).await?;
            let found = page.value.into_iter().find(|l| {
                l.name.as_deref() == Some(list_name) || l.display_name.as_deref() == Some(list_name)
            });
            if let Some(list) = found {
                return Ok(Some(list.id));
            }
            next = page.next_link;
        }

        Ok(None)
    }

    async fn create_item(
        &self,
        token: &str,
        target: &RemoteTarget,
        record: &RemoteRecord,
    ) -> Result<(), RemoteError> {
        let url = format!(
            "{}/sites/{}/lists/{}/items",
            self.base_url, target.site_id, target.list_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&CreateItemRequest { fields: record })
            .send()
            .await
            .map_err(|error| RemoteError::Transient(format!("network error: {error}")))?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "list item created");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::from_status(status.as_u16(), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_endpoint_uses_host_and_server_relative_path() {
        let client = GraphClient::new();
        assert_eq!(
            client
                .site_endpoint("https://contoso.sharepoint.com/sites/team/")
                .unwrap(),
            "https://graph.microsoft.com/v1.0/sites/contoso.sharepoint.com:/sites/team"
        );
        assert_eq!(
            client.site_endpoint("https://contoso.sharepoint.com").unwrap(),
            "https://graph.microsoft.com/v1.0/sites/contoso.sharepoint.com"
        );
    }

    #[test]
    fn bad_site_url_is_a_configuration_error() {
        let client = GraphClient::with_base_url("http://localhost:1/");
        assert!(matches!(
            client.site_endpoint("not a url"),
            Err(RemoteError::ConfigurationError(_))
        ));
    }

    #[test]
    fn lists_page_parses_next_link() {
        let page: ListsPage = serde_json::from_str(
            r#"{"value":[{"id":"1","name":"Hours","displayName":"Work Hours"}],
                "@odata.nextLink":"https://graph/next"}"#,
        )
        .unwrap();
        assert_eq!(page.value[0].display_name.as_deref(), Some("Work Hours"));
        assert_eq!(page.next_link.as_deref(), Some("https://graph/next"));
    }

    #[test]
    fn create_request_wraps_fields() {
        let record = RemoteRecord {
            title: "host".into(),
            task_description: "t".into(),
            clock_in: "a".into(),
            clock_out: "b".into(),
            department: "d".into(),
            worker_id: "w".into(),
            date: "2025-01-01".into(),
        };
        let json = serde_json::to_value(CreateItemRequest { fields: &record }).unwrap();
        assert_eq!(json["fields"]["Title"], "host");
    }
}
