//! Remote HTTP collaborators: the OpenProject API and the store's REST API.

#[cfg(test)]
pub(crate) mod fake;
mod openproject;
mod rest_store;
mod transport;

pub use openproject::{embedded_elements, link_href, OpenProjectClient};
pub use rest_store::RestStore;
pub use transport::{HttpRequest, HttpTransport, Method, Transport, TransportError};
