use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::server::TOTAL_COUNT_HEADER;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl ApiClient {
    pub fn new(server_url: &str, token: &str) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: server_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v2.0{}", self.base_url, path)
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()?;
        self.handle_response(resp)
    }

    /// GET a list endpoint, returning the page and the `X-Total-Count` header.
    pub fn get_counted<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<(T, i64)> {
        let resp = self
            .client
            .get(self.url(path))
            .query(query)
            .bearer_auth(&self.token)
            .send()?;

        let total = resp
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok((self.handle_response(resp)?, total))
    }

    pub fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()?;
        self.handle_response(resp)
    }

    pub fn put<B: Serialize>(&self, path: &str, body: &B) -> anyhow::Result<()> {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()?;
        self.handle_empty(resp)
    }

    pub fn delete(&self, path: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(&self.token)
            .send()?;
        self.handle_empty(resp)
    }

    fn handle_empty(&self, resp: Response) -> anyhow::Result<()> {
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(resp))
        }
    }

    fn handle_response<T: DeserializeOwned>(&self, resp: Response) -> anyhow::Result<T> {
        if resp.status().is_success() {
            let api_resp: ApiResponse<T> = resp.json()?;
            api_resp
                .data
                .ok_or_else(|| anyhow::anyhow!("Server returned an empty response"))
        } else {
            Err(Self::error_from(resp))
        }
    }

    fn error_from(resp: Response) -> anyhow::Error {
        let status = resp.status();
        match resp.json::<ApiResponse<()>>() {
            Ok(api_resp) => anyhow::anyhow!(api_resp.error.unwrap_or_else(|| {
                "Server error (no details provided)".into()
            })),
            Err(_) => anyhow::anyhow!("Server returned {status}"),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
