// mldata-core/src/testing.rs

//! In-memory dataset service used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::api::{
    DatasetApi, DatasetDefinition, DatasetFields, ElementRecord, NewElement, ServerInfo,
};
use crate::content::{BinaryInterpreter, BundleCodec, LengthPrefixedBundle};
use crate::error::{ClientError, Result};

pub const PREFIX: &str = "alice/cats";

/// Number of calls per endpoint.
#[derive(Debug, Clone, Default)]
pub struct CallCounts {
    pub server_info: usize,
    pub get_dataset: usize,
    pub update_dataset: usize,
    pub list_elements: usize,
    pub get_element: usize,
    pub element_bundles: usize,
    pub content_bundles: usize,
    pub create_element: usize,
    pub delete_element: usize,
    pub upload_content: usize,
}

#[derive(Default)]
struct MockState {
    page_size: usize,
    fields: DatasetFields,
    comments_count: usize,
    elements: Vec<ElementRecord>,
    contents: HashMap<String, Bytes>,
    calls: CallCounts,
    page_log: Vec<usize>,
    bundle_requests: Vec<Vec<String>>,
    content_requests: Vec<Vec<String>>,
    reverse_bundles: bool,
    fail_content: bool,
    fail_metadata: bool,
    fail_get_element: bool,
    next_id: usize,
}

pub struct MockApi {
    state: Mutex<MockState>,
    codec: LengthPrefixedBundle,
}

impl MockApi {
    /// A dataset holding `ids` in order, each with distinct content.
    pub fn with_elements(page_size: usize, ids: &[&str]) -> Self {
        let elements = ids
            .iter()
            .map(|id| ElementRecord {
                id: id.to_string(),
                title: format!("title {}", id),
                description: format!("description {}", id),
                tags: vec!["tag".to_string(), id.to_string()],
                http_ref: format!("http://example.org/{}", id),
            })
            .collect();
        let contents = ids
            .iter()
            .map(|id| (id.to_string(), Self::default_content(id)))
            .collect();

        Self {
            state: Mutex::new(MockState {
                page_size,
                fields: DatasetFields {
                    title: "Cats".to_string(),
                    description: "Pictures of cats".to_string(),
                    reference: "none".to_string(),
                    tags: vec!["animals".to_string(), "cats".to_string()],
                },
                comments_count: 1,
                elements,
                contents,
                ..Default::default()
            }),
            codec: LengthPrefixedBundle::new(),
        }
    }

    fn default_content(id: &str) -> Bytes {
        Bytes::from(format!("content of {}", id))
    }

    pub fn content_of(&self, id: &str) -> Bytes {
        self.state.lock().unwrap().contents[id].clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().unwrap().calls.clone()
    }

    /// Pages requested through `list_elements`, in request order.
    pub fn page_log(&self) -> Vec<usize> {
        self.state.lock().unwrap().page_log.clone()
    }

    pub fn bundle_requests(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().bundle_requests.clone()
    }

    pub fn content_requests(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().content_requests.clone()
    }

    pub fn element_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().elements.iter().map(|e| e.id.clone()).collect()
    }

    pub fn fields(&self) -> DatasetFields {
        self.state.lock().unwrap().fields.clone()
    }

    /// Answers bundle lookups in reverse request order.
    pub fn reverse_bundles(&self, on: bool) {
        self.state.lock().unwrap().reverse_bundles = on;
    }

    pub fn fail_content(&self, on: bool) {
        self.state.lock().unwrap().fail_content = on;
    }

    pub fn fail_metadata(&self, on: bool) {
        self.state.lock().unwrap().fail_metadata = on;
    }

    pub fn fail_get_element(&self, on: bool) {
        self.state.lock().unwrap().fail_get_element = on;
    }

    /// Appends an element behind the client's back.
    pub fn push_element(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.elements.push(ElementRecord::new(id));
        state.contents.insert(id.to_string(), Self::default_content(id));
    }

    fn server_error(endpoint: &str) -> ClientError {
        ClientError::remote_status(endpoint, 500, "injected failure")
    }
}

#[async_trait]
impl DatasetApi for MockApi {
    async fn server_info(&self) -> Result<ServerInfo> {
        let mut state = self.state.lock().unwrap();
        state.calls.server_info += 1;
        Ok(ServerInfo {
            page_size: state.page_size,
        })
    }

    async fn get_dataset(&self, prefix: &str) -> Result<DatasetDefinition> {
        let mut state = self.state.lock().unwrap();
        state.calls.get_dataset += 1;
        Ok(DatasetDefinition {
            url_prefix: prefix.to_string(),
            fields: state.fields.clone(),
            elements_count: state.elements.len(),
            comments_count: state.comments_count,
        })
    }

    async fn update_dataset(&self, _prefix: &str, fields: &DatasetFields) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.update_dataset += 1;
        state.fields = fields.clone();
        Ok(())
    }

    async fn list_elements(&self, _prefix: &str, page: usize) -> Result<Vec<ElementRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.list_elements += 1;
        state.page_log.push(page);
        if state.fail_metadata {
            return Err(Self::server_error("list_elements"));
        }
        let start = (page * state.page_size).min(state.elements.len());
        let end = (start + state.page_size).min(state.elements.len());
        Ok(state.elements[start..end].to_vec())
    }

    async fn get_element(&self, _prefix: &str, id: &str) -> Result<ElementRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.get_element += 1;
        if state.fail_get_element {
            return Err(Self::server_error("get_element"));
        }
        state
            .elements
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| ClientError::remote_status("get_element", 404, "no such element"))
    }

    async fn get_elements_bundle(&self, _prefix: &str, ids: &[String]) -> Result<Vec<ElementRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.element_bundles += 1;
        state.bundle_requests.push(ids.to_vec());
        if state.fail_metadata {
            return Err(Self::server_error("get_elements_bundle"));
        }
        let mut records: Vec<_> = ids
            .iter()
            .filter_map(|id| state.elements.iter().find(|e| &e.id == id).cloned())
            .collect();
        if state.reverse_bundles {
            records.reverse();
        }
        Ok(records)
    }

    async fn get_contents_bundle(&self, _prefix: &str, ids: &[String]) -> Result<Bytes> {
        let entries = {
            let mut state = self.state.lock().unwrap();
            state.calls.content_bundles += 1;
            state.content_requests.push(ids.to_vec());
            if state.fail_content {
                return Err(Self::server_error("get_contents_bundle"));
            }
            ids.iter()
                .filter_map(|id| state.contents.get(id).map(|c| (id.clone(), c.clone())))
                .collect::<Vec<_>>()
        };
        self.codec.encode(&entries)
    }

    async fn create_element(&self, _prefix: &str, element: &NewElement) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.create_element += 1;
        state.next_id += 1;
        let id = format!("new-element-{}", state.next_id);
        state.elements.push(ElementRecord {
            id: id.clone(),
            title: element.title.clone(),
            description: element.description.clone(),
            tags: element.tags.clone(),
            http_ref: element.http_ref.clone(),
        });
        Ok(id)
    }

    async fn delete_element(&self, _prefix: &str, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete_element += 1;
        let before = state.elements.len();
        state.elements.retain(|e| e.id != id);
        if state.elements.len() == before {
            return Err(ClientError::remote_status("delete_element", 404, "no such element"));
        }
        state.contents.remove(id);
        Ok(())
    }

    async fn upload_content(&self, _prefix: &str, id: &str, content: Bytes) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.upload_content += 1;
        state.contents.insert(id.to_string(), content);
        Ok(())
    }
}

/// Reversible test interpreter: XORs every byte with a key.
pub struct XorInterpreter(pub u8);

impl BinaryInterpreter for XorInterpreter {
    fn name(&self) -> &str {
        "xor"
    }

    fn cipher(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.iter().map(|b| b ^ self.0).collect())
    }

    fn decipher(&self, stored: &[u8]) -> Result<Vec<u8>> {
        Ok(stored.iter().map(|b| b ^ self.0).collect())
    }
}
