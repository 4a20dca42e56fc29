//! CLI Commands

pub mod categories;
pub mod config;
pub mod devices;
pub mod policies;
pub mod segments;

use serde::de::DeserializeOwned;

use crate::error::{CliError, CliResult};

/// API client
///
/// Thin wrapper over reqwest: attaches the bearer credential and the optional
/// tenant prefix, unwraps the `data` envelope the API wraps every payload in,
/// and turns non-success answers into errors carrying endpoint, status, and
/// body so the operator can act on them.
pub struct ApiClient {
    pub base_url: String,
    pub api_key: Option<String>,
    pub tenant_id: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: Option<&str>, tenant_id: Option<&str>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(String::from),
            tenant_id: tenant_id.map(String::from),
            client: reqwest::Client::new(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> CliResult<T> {
        let req = self.client.get(self.url(path));
        self.send(path, req).await
    }

    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> CliResult<T> {
        let req = self.client.post(self.url(path)).json(body);
        self.send(path, req).await
    }

    pub async fn put<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> CliResult<T> {
        let req = self.client.put(self.url(path)).json(body);
        self.send(path, req).await
    }

    /// POST that reports the raw outcome instead of decoding it. Used where
    /// the operator wants to see exactly what the API answered, success or
    /// not; only transport failures become errors.
    pub async fn post_raw<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> CliResult<(u16, String)> {
        let req = self.authorize(self.client.post(self.url(path)).json(body));
        let resp = req.send().await.map_err(|e| CliError::Transport {
            endpoint: path.to_string(),
            source: e,
        })?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| CliError::Transport {
            endpoint: path.to_string(),
            source: e,
        })?;
        Ok((status, body))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        req: reqwest::RequestBuilder,
    ) -> CliResult<T> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| CliError::Transport {
                endpoint: path.to_string(),
                source: e,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| CliError::Transport {
            endpoint: path.to_string(),
            source: e,
        })?;

        if !status.is_success() {
            return Err(CliError::Api {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| CliError::Response {
                endpoint: path.to_string(),
                detail: e.to_string(),
            })?;

        match json.get("data") {
            Some(data) => serde_json::from_value(data.clone()).map_err(|e| CliError::Response {
                endpoint: path.to_string(),
                detail: e.to_string(),
            }),
            None => Err(CliError::Response {
                endpoint: path.to_string(),
                detail: "no data field in response".to_string(),
            }),
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {}", key)),
            None => req,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, self.tenant_path(path))
    }

    fn tenant_path(&self, path: &str) -> String {
        if let Some(tenant) = &self.tenant_id {
            format!("/tenants/{}{}", tenant, path)
        } else {
            path.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[tokio::test]
    async fn test_get_unwraps_data_envelope() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/url-categories")
                    .header("Authorization", "Bearer secret");
                then.status(200)
                    .json_body(json!({ "data": [{ "id": "CUSTOM_01" }] }));
            })
            .await;

        let client = ApiClient::new(&server.base_url(), Some("secret"), None);
        let items: Vec<Item> = client.get("/url-categories").await.unwrap();

        mock.assert_async().await;
        assert_eq!(items, vec![Item { id: "CUSTOM_01".to_string() }]);
    }

    #[tokio::test]
    async fn test_tenant_id_prefixes_the_path() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/tenants/t-42/policies");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let client = ApiClient::new(&server.base_url(), None, Some("t-42"));
        let items: Vec<Item> = client.get("/policies").await.unwrap();

        mock.assert_async().await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_error_carries_endpoint_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/url-categories/CUSTOM_99");
                then.status(404).body("category not found");
            })
            .await;

        let client = ApiClient::new(&server.base_url(), None, None);
        let err = client
            .get::<Item>("/url-categories/CUSTOM_99")
            .await
            .unwrap_err();

        match err {
            CliError::Api { endpoint, status, body } => {
                assert_eq!(endpoint, "/url-categories/CUSTOM_99");
                assert_eq!(status, 404);
                assert_eq!(body, "category not found");
            }
            other => panic!("expected Api error, got: {}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_data_field_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/policies");
                then.status(200).json_body(json!({ "items": [] }));
            })
            .await;

        let client = ApiClient::new(&server.base_url(), None, None);
        let err = client.get::<Vec<Item>>("/policies").await.unwrap_err();

        assert!(matches!(err, CliError::Response { .. }));
    }

    #[tokio::test]
    async fn test_post_raw_reports_failures_verbatim() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/devices/remove");
                then.status(409).body("no active devices for user");
            })
            .await;

        let client = ApiClient::new(&server.base_url(), None, None);
        let (status, body) = client
            .post_raw("/devices/remove", &json!({ "username": "jdoe" }))
            .await
            .unwrap();

        assert_eq!(status, 409);
        assert_eq!(body, "no active devices for user");
    }
}
