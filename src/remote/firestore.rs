// src/remote/firestore.rs
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

use crate::errors::MillError;
use crate::remote::codec::{decode_document, encode_fields, encode_value};
use crate::remote::{check_status, with_retry, USER_AGENT};
use crate::store::{Document, DocumentStore};

pub const DEFAULT_FIRESTORE_HOST: &str = "https://firestore.googleapis.com";
const PAGE_SIZE: &str = "300";

/// REST client for the hosted document store.
pub struct FirestoreClient {
    client: Client,
    /// `.../v1/projects/<project>/databases/(default)/documents/`
    base: Url,
    api_key: Option<String>,
    auth_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(
        host: &str,
        project_id: &str,
        api_key: Option<String>,
        auth_token: Option<String>,
    ) -> Result<Self, MillError> {
        if project_id.trim().is_empty() {
            return Err(MillError::Config("project id must not be empty".into()));
        }

        let base = Url::parse(&format!(
            "{}/v1/projects/{}/databases/(default)/documents/",
            host.trim_end_matches('/'),
            project_id.trim()
        ))
        .map_err(|e| MillError::Config(format!("invalid document store host '{host}': {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base,
            api_key,
            auth_token,
        })
    }

    pub fn document_url(&self, collection: &str, id: Option<&str>) -> Result<Url, MillError> {
        let relative = match id {
            Some(id) => format!("{collection}/{id}"),
            None => collection.to_string(),
        };
        self.base
            .join(&relative)
            .map_err(|e| MillError::BadRequest(format!("bad document path '{relative}': {e}")))
    }

    /// Attach credentials: a bearer token when we have one, otherwise the API key.
    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match (&self.auth_token, &self.api_key) {
            (Some(token), _) => req.bearer_auth(token),
            (None, Some(key)) => req.query(&[("key", key)]),
            (None, None) => req,
        }
    }

    fn send(&self, req: RequestBuilder, context: &str) -> Result<Value, MillError> {
        let resp = self.authorize(req).send()?;
        let text = check_status(resp, context)?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl DocumentStore for FirestoreClient {
    fn list(&self, collection: &str) -> Result<Vec<Document>, MillError> {
        let url = self.document_url(collection, None)?;
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = with_retry(collection, || {
                let mut req = self.client.get(url.clone()).query(&[("pageSize", PAGE_SIZE)]);
                if let Some(token) = &page_token {
                    req = req.query(&[("pageToken", token)]);
                }
                self.send(req, collection)
            })?;
            if let Some(docs) = page.get("documents").and_then(Value::as_array) {
                for doc in docs {
                    out.push(decode_document(doc)?);
                }
            }

            match page.get("nextPageToken").and_then(Value::as_str) {
                Some(next) if !next.is_empty() => page_token = Some(next.to_string()),
                _ => break,
            }
        }

        log::debug!("listed {} documents from {collection}", out.len());
        Ok(out)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, MillError> {
        let url = self.document_url(collection, Some(id))?;
        let context = format!("{collection}/{id}");
        match with_retry(&context, || self.send(self.client.get(url.clone()), &context)) {
            Ok(doc) => Ok(Some(decode_document(&doc)?)),
            Err(MillError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<(), MillError> {
        let url = self.document_url(collection, Some(id))?;
        let body = json!({ "fields": encode_fields(data) });
        self.send(self.client.patch(url).json(&body), &format!("{collection}/{id}"))?;
        Ok(())
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), MillError> {
        let url = self.document_url(collection, Some(id))?;

        let mut query: Vec<(&str, String)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", field_path(k)))
            .collect();
        query.push(("currentDocument.exists", "true".to_string()));

        let body = json!({ "fields": encode_fields(fields) });
        self.send(
            self.client.patch(url).query(&query).json(&body),
            &format!("{collection}/{id}"),
        )?;
        Ok(())
    }

    fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, MillError> {
        let parent = self.base.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{parent}:runQuery"))
            .map_err(|e| MillError::BadRequest(e.to_string()))?;

        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field_path(field) },
                        "op": "EQUAL",
                        "value": encode_value(value)
                    }
                }
            }
        });

        let results = self.send(self.client.post(url).json(&body), collection)?;
        let mut out = Vec::new();
        for row in results.as_array().into_iter().flatten() {
            // Rows without a document only carry a read time.
            if let Some(doc) = row.get("document") {
                out.push(decode_document(doc)?);
            }
        }
        Ok(out)
    }
}

/// Quote field names that are not plain identifiers.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "\\`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_urls_live_under_the_project() {
        let client =
            FirestoreClient::new(DEFAULT_FIRESTORE_HOST, "ricemill-demo", None, None).unwrap();
        assert_eq!(
            client.document_url("dealers", Some("d1")).unwrap().as_str(),
            "https://firestore.googleapis.com/v1/projects/ricemill-demo/databases/(default)/documents/dealers/d1"
        );
    }

    #[test]
    fn empty_project_is_rejected() {
        assert!(FirestoreClient::new(DEFAULT_FIRESTORE_HOST, " ", None, None).is_err());
    }

    #[test]
    fn field_paths_are_quoted_when_needed() {
        assert_eq!(field_path("dealerId"), "dealerId");
        assert_eq!(field_path("created_at"), "created_at");
        assert_eq!(field_path("rice-type"), "`rice-type`");
        assert_eq!(field_path("2nd"), "`2nd`");
    }
}
