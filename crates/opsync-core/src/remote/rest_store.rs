//! The local store reached through its REST API.

use serde_json::Value;

use super::transport::{HttpRequest, Method, Transport};
use crate::config::ApiEndpoint;
use crate::error::{Error, Result};
use crate::models::fields::remote_id_from_value;
use crate::models::{EntityKind, LocalId, Record, RemoteId};
use crate::sync::LocalStore;
use crate::util::trim_trailing_slash;

/// `{base}/{collection}/` endpoints, items looked up by `openproject_id`.
pub struct RestStore<T> {
    transport: T,
    base_url: String,
    headers: Vec<(String, String)>,
}

impl<T: Transport> RestStore<T> {
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

    fn collection_url(&self, kind: EntityKind) -> String {
        format!("{}/{}/", self.base_url, kind.collection())
    }

    fn item_url(&self, kind: EntityKind, remote_id: RemoteId) -> String {
        format!("{}{remote_id}/", self.collection_url(kind))
    }

    fn send(&self, request: HttpRequest) -> Result<Value> {
        Ok(self.transport.send(request.headers(&self.headers))?)
    }

    fn send_for_record(&self, request: HttpRequest) -> Result<Record> {
        match self.send(request)? {
            Value::Object(record) => Ok(record),
            other => Err(Error::MalformedResponse(format!(
                "expected a JSON object from the store, got {other}"
            ))),
        }
    }
}

impl<T: Transport> LocalStore for RestStore<T> {
    fn list(&self, kind: EntityKind) -> Result<Vec<Record>> {
        match self.send(HttpRequest::new(Method::Get, self.collection_url(kind)))? {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect()),
            other => Err(Error::MalformedResponse(format!(
                "expected a JSON array listing {}, got {other}",
                kind.collection()
            ))),
        }
    }

    fn create(&self, kind: EntityKind, record: &Record) -> Result<Record> {
        let request = HttpRequest::new(Method::Post, self.collection_url(kind))
            .json(Value::Object(record.clone()));
        self.send_for_record(request)
    }

    fn update(&self, kind: EntityKind, remote_id: RemoteId, partial: &Record) -> Result<Record> {
        let request = HttpRequest::new(Method::Patch, self.item_url(kind, remote_id))
            .json(Value::Object(partial.clone()));
        self.send_for_record(request)
    }

    fn local_id_for(&self, kind: EntityKind, remote_id: RemoteId) -> Result<LocalId> {
        let request = HttpRequest::new(Method::Get, self.item_url(kind, remote_id));
        let record = match self.send_for_record(request) {
            Err(Error::Transport(error)) if error.status() == Some(404) => {
                return Err(Error::not_found(kind, remote_id));
            }
            other => other?,
        };
        record
            .get("id")
            .and_then(remote_id_from_value)
            .ok_or_else(|| {
                Error::MalformedResponse(format!("{kind} #{remote_id} has no local id"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store(transport: &FakeTransport) -> RestStore<&FakeTransport> {
        RestStore::new(transport, "https://api.example.com/", "secret")
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn update_patches_the_item_keyed_by_remote_id() {
        let transport = FakeTransport::default();
        transport.respond(json!({"id": 3, "openproject_id": 7}));

        let partial = record(json!({"description": "d"}));
        store(&transport)
            .update(EntityKind::Project, 7, &partial)
            .unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.url, "https://api.example.com/projects/7/");
        assert_eq!(request.body, Some(json!({"description": "d"})));
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "Basic secret".to_string())));
    }

    #[test]
    fn create_posts_to_the_collection() {
        let transport = FakeTransport::default();
        transport.respond(json!({"id": 11}));

        let created = store(&transport)
            .create(EntityKind::TimeEntry, &record(json!({"hours": "PT1H"})))
            .unwrap();

        assert_eq!(created["id"], json!(11));
        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://api.example.com/time_entries/");
    }

    #[test]
    fn list_requires_an_array() {
        let transport = FakeTransport::default();
        transport.respond(json!([{"id": 1}, {"id": 2}]));
        transport.respond(json!({"results": []}));

        let store = store(&transport);
        assert_eq!(store.list(EntityKind::Project).unwrap().len(), 2);
        assert!(matches!(
            store.list(EntityKind::Project),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn local_id_lookup_maps_404_to_not_found() {
        let transport = FakeTransport::default();
        transport.respond(json!({"id": "5", "openproject_id": 42}));
        transport.fail(404);
        transport.fail(500);

        let store = store(&transport);
        assert_eq!(store.local_id_for(EntityKind::WorkPackage, 42).unwrap(), 5);
        assert_eq!(
            transport.last_request().unwrap().url,
            "https://api.example.com/work_packages/42/"
        );
        assert!(matches!(
            store.local_id_for(EntityKind::WorkPackage, 43),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            store.local_id_for(EntityKind::WorkPackage, 44),
            Err(Error::Transport(_))
        ));
    }
}
