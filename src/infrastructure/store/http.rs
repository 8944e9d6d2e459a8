//! Document store backed by the index's REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::saved_object::encode_uri_component;
use crate::domain::store::{DocumentStore, Hit, SearchRequest, SearchResponse};
use crate::domain::DomainError;

/// Body of a get-by-id response
#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default = "default_found")]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Value,
}

fn default_found() -> bool {
    true
}

/// REST client for an Elasticsearch-compatible index
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn document_url(&self, index: &str, doc_type: &str, id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url,
            encode_uri_component(index),
            encode_uri_component(doc_type),
            encode_uri_component(id)
        )
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Response, DomainError> {
        let mut request = self.client.request(method, url);

        if let Some(body) = body {
            request = request.json(body);
        }

        request
            .send()
            .await
            .map_err(|e| DomainError::store(format!("Request failed: {}", e)))
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, DomainError> {
        let response = Self::ensure_success(response).await?;

        response
            .json()
            .await
            .map_err(|e| DomainError::store(format!("Failed to parse response: {}", e)))
    }

    async fn ensure_success(response: Response) -> Result<Response, DomainError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_body = response.text().await.unwrap_or_default();
        Err(DomainError::store(format!("HTTP {}: {}", status, error_body)))
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<Option<Hit>, DomainError> {
        let url = self.document_url(index, doc_type, id);
        let response = self.send(Method::GET, &url, None).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: GetResponse = Self::parse(response).await?;

        Ok(body.found.then(|| Hit::new(body.id, body.source)))
    }

    async fn index(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        source: &Value,
    ) -> Result<(), DomainError> {
        let url = self.document_url(index, doc_type, id);
        let response = self.send(Method::PUT, &url, Some(source)).await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn delete(&self, index: &str, doc_type: &str, id: &str) -> Result<(), DomainError> {
        let url = self.document_url(index, doc_type, id);
        let response = self.send(Method::DELETE, &url, None).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DomainError::not_found(format!(
                "Document {}/{}/{} not found",
                index, doc_type, id
            )));
        }

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, DomainError> {
        let mut url = format!(
            "{}/{}/{}/_search?size={}",
            self.base_url,
            encode_uri_component(&request.index),
            encode_uri_component(&request.doc_type),
            request.size
        );

        if let Some(keep_alive) = &request.scroll {
            url.push_str(&format!("&scroll={}", encode_uri_component(keep_alive)));
        }

        let response = self.send(Method::POST, &url, Some(&request.body())).await?;
        Self::parse(response).await
    }

    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<SearchResponse, DomainError> {
        let url = format!("{}/_search/scroll", self.base_url);
        let body = json!({ "scroll": keep_alive, "scroll_id": scroll_id });

        let response = self.send(Method::POST, &url, Some(&body)).await?;
        Self::parse(response).await
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), DomainError> {
        let url = format!("{}/_search/scroll", self.base_url);
        let body = json!({ "scroll_id": [scroll_id] });

        let response = self.send(Method::DELETE, &url, Some(&body)).await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::SearchQuery;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn store_for(server: &MockServer) -> HttpDocumentStore {
        HttpDocumentStore::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.kibi/template/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_index": ".kibi", "_type": "template", "_id": "abc",
                "found": true, "_source": {"title": "T"}
            })))
            .mount(&server)
            .await;

        let hit = store_for(&server)
            .await
            .get(".kibi", "template", "abc")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hit.id, "abc");
        assert_eq!(hit.source["title"], "T");
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.kibi/template/nope"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"_id": "nope", "found": false})),
            )
            .mount(&server)
            .await;

        let result = store_for(&server).await.get(".kibi", "template", "nope").await;
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/.kibi/template/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .await
            .delete(".kibi", "template", "gone")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_error_maps_to_store_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .await
            .delete(".kibi", "template", "x")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Store error: HTTP 500 Internal Server Error: boom");
    }

    #[tokio::test]
    async fn test_search_sends_query_and_scroll() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/.kibi/template/_search"))
            .and(query_param("size", "1000"))
            .and(query_param("scroll", "1m"))
            .and(body_json(json!({"query": {"match_all": {}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_scroll_id": "c1",
                "hits": {"total": {"value": 1}, "hits": [{"_id": "a", "_source": {"title": "A"}}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = SearchRequest::new(".kibi", "template", SearchQuery::MatchAll {}, 1000)
            .with_scroll("1m");
        let response = store_for(&server).await.search(request).await.unwrap();

        assert_eq!(response.scroll_id.as_deref(), Some("c1"));
        assert_eq!(response.hits.total, 1);
    }

    #[tokio::test]
    async fn test_scroll_posts_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_search/scroll"))
            .and(body_json(json!({"scroll": "1m", "scroll_id": "c1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_scroll_id": "c1",
                "hits": {"total": 1, "hits": []}
            })))
            .mount(&server)
            .await;

        let response = store_for(&server).await.scroll("c1", "1m").await.unwrap();
        assert!(response.hits.hits.is_empty());
    }

    #[tokio::test]
    async fn test_index_puts_source() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/.kibi/template/t1"))
            .and(body_json(json!({"title": "T"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"created": true})))
            .expect(1)
            .mount(&server)
            .await;

        store_for(&server)
            .await
            .index(".kibi", "template", "t1", &json!({"title": "T"}))
            .await
            .unwrap();
    }
}
