//! Blocking JSON-over-HTTP helper shared by both service clients.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{JobcodeError, Result};

/// Basic-auth credentials for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub(crate) struct HttpClient {
    base_url: String,
    credentials: Credentials,
    client: Client,
}

impl HttpClient {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JobcodeError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(ACCEPT, "application/json")
    }

    /// GET and decode. A 404 is `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let response = self.authed(self.client.get(&url)).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check("GET", &url, response)?;
        let body = response
            .json::<T>()
            .map_err(|e| JobcodeError::Transport(format!("invalid response from {url}: {e}")))?;
        Ok(Some(body))
    }

    /// POST a JSON body. Returns the `Location` header, if any.
    pub fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Option<String>> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        let response = self.authed(self.client.post(&url)).json(body).send()?;
        let response = check("POST", &url, response)?;
        Ok(location(&response))
    }

    pub fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.url(path);
        tracing::debug!(%url, "PUT");
        let response = self.authed(self.client.put(&url)).json(body).send()?;
        check("PUT", &url, response)?;
        Ok(())
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        tracing::debug!(%url, "DELETE");
        let response = self.authed(self.client.delete(&url)).send()?;
        check("DELETE", &url, response)?;
        Ok(())
    }
}

fn check(method: &'static str, url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    tracing::error!(%url, status = status.as_u16(), "{method} request failed");
    Err(JobcodeError::Http {
        method,
        url: url.to_string(),
        status: status.as_u16(),
    })
}

fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// The id at the end of a `Location` such as `/projects/123`.
pub(crate) fn id_from_location(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let client =
            HttpClient::new("https://foo.example.com/", Credentials::default(), Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.url("/projects"), "https://foo.example.com/projects");
        assert_eq!(client.url("projects/1.json"), "https://foo.example.com/projects/1.json");
    }

    #[test]
    fn id_is_last_location_segment() {
        assert_eq!(id_from_location("/projects/123"), Some("123".to_string()));
        assert_eq!(id_from_location("/clients/9/"), Some("9".to_string()));
        assert_eq!(id_from_location(""), None);
    }

    #[test]
    fn not_found_is_none_and_errors_carry_status() {
        let mut server = mockito::Server::new();
        let _missing = server.mock("GET", "/missing").with_status(404).create();
        let _broken = server.mock("GET", "/broken").with_status(500).create();
        let client = HttpClient::new(&server.url(), Credentials::default(), Duration::from_secs(5))
            .unwrap();

        let missing: Option<serde_json::Value> = client.get("/missing").unwrap();
        assert!(missing.is_none());

        let err = client.get::<serde_json::Value>("/broken").unwrap_err();
        assert!(matches!(err, JobcodeError::Http { status: 500, .. }));
    }
}
