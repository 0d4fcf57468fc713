// src/remote/rtdb.rs
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

use crate::errors::MillError;
use crate::remote::{check_status, with_retry, USER_AGENT};
use crate::store::{path_segments, TreeStore};

/// REST client for the hosted realtime tree (`<database-url>/<path>.json`).
pub struct RealtimeClient {
    client: Client,
    base: Url,
    auth_token: Option<String>,
}

impl RealtimeClient {
    pub fn new(database_url: &str, auth_token: Option<String>) -> Result<Self, MillError> {
        let mut base = Url::parse(database_url)
            .map_err(|e| MillError::Config(format!("invalid database url '{database_url}': {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base,
            auth_token,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, MillError> {
        let segs = path_segments(path)?;
        let relative = format!("{}.json", segs.join("/"));

        let mut url = self
            .base
            .join(&relative)
            .map_err(|e| MillError::BadRequest(format!("bad path '{path}': {e}")))?;
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    fn send(&self, req: RequestBuilder, path: &str) -> Result<Value, MillError> {
        let resp = req.send()?;
        let text = check_status(resp, path)?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl TreeStore for RealtimeClient {
    fn get(&self, path: &str) -> Result<Option<Value>, MillError> {
        log::debug!("GET {path}");
        let url = self.endpoint(path)?;
        match with_retry(path, || self.send(self.client.get(url.clone()), path))? {
            Value::Null => Ok(None),
            v => Ok(Some(v)),
        }
    }

    fn set(&self, path: &str, value: &Value) -> Result<(), MillError> {
        let url = self.endpoint(path)?;
        if value.is_null() {
            log::debug!("DELETE {path}");
            self.send(self.client.delete(url), path)?;
        } else {
            log::debug!("PUT {path}");
            self.send(self.client.put(url).json(value), path)?;
        }
        Ok(())
    }

    fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<(), MillError> {
        if fields.is_empty() {
            return Ok(());
        }
        log::debug!("PATCH {path} ({} fields)", fields.len());
        let url = self.endpoint(path)?;
        self.send(self.client.patch(url).json(fields), path)?;
        Ok(())
    }

    fn push(&self, path: &str, value: &Value) -> Result<String, MillError> {
        log::debug!("POST {path}");
        let url = self.endpoint(path)?;
        let resp = self.send(self.client.post(url).json(value), path)?;

        resp.get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| MillError::Json(format!("push to '{path}' returned no key: {resp}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_json_suffix_and_auth() {
        let client = RealtimeClient::new(
            "https://ricemill-demo-default-rtdb.firebaseio.com",
            Some("secret".into()),
        )
        .unwrap();

        let url = client.endpoint("/workers/W1/").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ricemill-demo-default-rtdb.firebaseio.com/workers/W1.json?auth=secret"
        );
    }

    #[test]
    fn root_endpoint_is_dot_json() {
        let client = RealtimeClient::new("https://example.firebaseio.com/", None).unwrap();
        assert_eq!(
            client.endpoint("").unwrap().as_str(),
            "https://example.firebaseio.com/.json"
        );
    }

    #[test]
    fn invalid_url_is_a_config_error() {
        assert!(matches!(
            RealtimeClient::new("not a url", None),
            Err(MillError::Config(_))
        ));
    }
}
