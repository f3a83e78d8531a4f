//! OpenProject API v3 client.

use serde_json::Value;

use super::transport::{HttpRequest, Method, Transport};
use crate::config::ApiEndpoint;
use crate::error::Result;
use crate::models::{EntityKind, Record, RemoteId};
use crate::util::trim_trailing_slash;

/// Upper bound on followed `nextByOffset` links in one listing.
const MAX_LISTING_PAGES: usize = 1_000;

pub struct OpenProjectClient<T> {
    transport: T,
    base_url: String,
    headers: Vec<(String, String)>,
}

impl<T: Transport> OpenProjectClient<T> {
    pub fn new(transport: T, base_url: &str, authorization_hash: &str) -> Self {
        Self {
            transport,
            base_url: trim_trailing_slash(base_url).to_string(),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Basic {authorization_hash}"),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
        }
    }

    pub fn from_endpoint(transport: T, endpoint: &ApiEndpoint) -> Self {
        Self::new(transport, &endpoint.url, &endpoint.authorization_hash)
    }

    /// `{base}/api/v3/{collection}/`, the create endpoint.
    pub fn collection_url(&self, kind: EntityKind) -> String {
        format!("{}/api/v3/{}/", self.base_url, kind.collection())
    }

    /// `{base}/api/v3/{collection}/{id}/`, the update endpoint.
    pub fn item_url(&self, kind: EntityKind, remote_id: RemoteId) -> String {
        format!("{}{remote_id}/", self.collection_url(kind))
    }

    /// Every element of a collection listing.
    pub fn list(&self, kind: EntityKind) -> Result<Vec<Record>> {
        self.list_href(&format!("/api/v3/{}", kind.collection()))
    }

    /// Every element of the collection behind a HAL `href`, following
    /// `nextByOffset` links.
    pub fn list_href(&self, href: &str) -> Result<Vec<Record>> {
        let mut elements = Vec::new();
        let mut next = Some(self.resolve_href(href));
        let mut pages = 0;

        while let Some(url) = next.take() {
            let body = self.send(HttpRequest::new(Method::Get, url))?;
            elements.extend(embedded_elements(&body));

            pages += 1;
            if pages >= MAX_LISTING_PAGES {
                tracing::warn!("Stopped following listing pages for {href} after {pages} pages");
                break;
            }
            next = body
                .as_object()
                .and_then(|body| link_href(body, "nextByOffset"))
                .map(|href| self.resolve_href(href));
        }

        tracing::debug!("Listed {} elements from {href}", elements.len());
        Ok(elements)
    }

    pub fn create(&self, kind: EntityKind, body: Value) -> Result<Value> {
        self.send(HttpRequest::new(Method::Post, self.collection_url(kind)).json(body))
    }

    pub fn update(&self, kind: EntityKind, remote_id: RemoteId, body: Value) -> Result<Value> {
        self.send(HttpRequest::new(Method::Patch, self.item_url(kind, remote_id)).json(body))
    }

    fn send(&self, request: HttpRequest) -> Result<Value> {
        Ok(self.transport.send(request.headers(&self.headers))?)
    }

    fn resolve_href(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}/{}", self.base_url, href.trim_start_matches('/'))
        }
    }
}

/// `_embedded.elements` of a HAL collection; empty when absent.
pub fn embedded_elements(body: &Value) -> Vec<Record> {
    body.get("_embedded")
        .and_then(|embedded| embedded.get("elements"))
        .and_then(Value::as_array)
        .map(|elements| {
            elements
                .iter()
                .filter_map(|element| element.as_object().cloned())
                .collect()
        })
        .unwrap_or_default()
}

/// `_links.{key}.href` of a HAL resource.
pub fn link_href<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record
        .get("_links")?
        .get(key)?
        .get("href")?
        .as_str()
        .filter(|href| !href.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client(transport: &FakeTransport) -> OpenProjectClient<&FakeTransport> {
        OpenProjectClient::new(transport, "https://op.example.com/", "hash")
    }

    #[test]
    fn urls_follow_api_v3_layout() {
        let transport = FakeTransport::default();
        let client = client(&transport);
        assert_eq!(
            client.collection_url(EntityKind::Project),
            "https://op.example.com/api/v3/projects/"
        );
        assert_eq!(
            client.item_url(EntityKind::TimeEntry, 7),
            "https://op.example.com/api/v3/time_entries/7/"
        );
    }

    #[test]
    fn list_returns_embedded_elements_and_sends_auth() {
        let transport = FakeTransport::default();
        transport.respond(json!({
            "_embedded": {"elements": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}]}
        }));

        let elements = client(&transport).list(EntityKind::Project).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1]["name"], json!("B"));

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "https://op.example.com/api/v3/projects");
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "Basic hash".to_string())));
    }

    #[test]
    fn list_is_empty_without_embedded_elements() {
        let transport = FakeTransport::default();
        transport.respond(json!({}));
        transport.respond(json!({"_embedded": {}}));

        let client = client(&transport);
        assert!(client.list(EntityKind::Project).unwrap().is_empty());
        assert!(client.list(EntityKind::Project).unwrap().is_empty());
    }

    #[test]
    fn list_follows_next_page_links() {
        let transport = FakeTransport::default();
        transport.respond(json!({
            "_embedded": {"elements": [{"id": 1}]},
            "_links": {"nextByOffset": {"href": "/api/v3/projects?offset=2"}}
        }));
        transport.respond(json!({"_embedded": {"elements": [{"id": 2}]}}));

        let elements = client(&transport).list(EntityKind::Project).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(
            transport.requests()[1].url,
            "https://op.example.com/api/v3/projects?offset=2"
        );
    }

    #[test]
    fn failed_listing_propagates() {
        let transport = FakeTransport::default();
        transport.fail(500);
        let result = client(&transport).list(EntityKind::WorkPackage);
        assert!(matches!(result, Err(crate::Error::Transport(_))));
    }

    #[test]
    fn link_href_reads_nested_links() {
        let record = json!({"_links": {"workPackages": {"href": "/api/v3/projects/1/work_packages"}}});
        let record = record.as_object().unwrap();
        assert_eq!(
            link_href(record, "workPackages"),
            Some("/api/v3/projects/1/work_packages")
        );
        assert_eq!(link_href(record, "self"), None);
        assert_eq!(link_href(&Record::new(), "self"), None);
    }
}
