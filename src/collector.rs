//! The collection protocol: descriptors, samples, and the paginated list
//! driver shared by every resource kind.
//!
//! A [`ResourceKind`] contributes only what differs per kind: the static
//! [`Descriptor`], how to build one list request, how to pull items and the
//! reported total out of a response page, and how to map one item to label
//! values. [`ResourceCollector`] owns pagination, bound tracking, and
//! per-item skip handling for all of them.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::client::{ApiError, ApiRequest, ApiTransport};

/// Default number of items requested per list page.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Static schema for one collector's samples: metric name, help text, and
/// the ordered label names every sample must populate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    subsystem: String,
    help: String,
    label_names: Vec<&'static str>,
}

impl Descriptor {
    /// Build a descriptor with the conventional `namespace_subsystem_name`
    /// metric name.
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        label_names: Vec<&'static str>,
    ) -> Self {
        Self {
            name: format!("{}_{}_{}", namespace, subsystem, name),
            subsystem: subsystem.to_string(),
            help: help.to_string(),
            label_names,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short kind identifier, used to label exporter self-metrics.
    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[&'static str] {
        &self.label_names
    }
}

/// One metric sample: a gauge value plus label values in descriptor order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub label_values: Vec<String>,
}

/// Transient pagination state for one collection pass.
#[derive(Debug, Clone, Copy)]
pub struct PageCursor {
    pub offset: u64,
    pub limit: u64,
}

/// One decoded page of a list response.
#[derive(Debug)]
pub struct ResourcePage {
    /// Total item count reported by the provider for the whole listing.
    pub total: u64,
    pub items: Vec<Value>,
}

/// Errors that abort one collector's collection for the current scrape.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Malformed list response: {0}")]
    Decode(String),

    #[error("Collection timed out")]
    TimedOut,
}

impl CollectError {
    /// Whether this failure is an expected provider-side error (logged as a
    /// warning) rather than an exporter-side defect (logged as an error).
    pub fn is_expected(&self) -> bool {
        matches!(self, CollectError::Api(e) if e.is_structured())
    }
}

/// Everything one collector produced during one scrape.
#[derive(Debug, Default)]
pub struct Harvest {
    pub samples: Vec<Sample>,
    /// Items dropped because a label field was missing.
    pub skipped: u64,
}

/// Decode the `{"Response": {"TotalCount": N, "<field>": [...]}}` envelope
/// shared by the Tencent list APIs. A missing items field is an empty page,
/// a missing total is a decode error.
pub fn parse_list_page(body: &Value, items_field: &str) -> Result<ResourcePage, CollectError> {
    let response = body
        .get("Response")
        .ok_or_else(|| CollectError::Decode("missing Response field".to_string()))?;

    let total = response
        .get("TotalCount")
        .and_then(Value::as_u64)
        .ok_or_else(|| CollectError::Decode("missing TotalCount field".to_string()))?;

    let items = match response.get(items_field) {
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            return Err(CollectError::Decode(format!(
                "{items_field} is not an array"
            )));
        }
        None => Vec::new(),
    };

    Ok(ResourcePage { total, items })
}

/// Kind-specific behavior plugged into [`ResourceCollector`].
pub trait ResourceKind: Send + Sync {
    fn descriptor(&self) -> &Descriptor;

    /// Build the list request for one page.
    fn list_request(&self, cursor: &PageCursor) -> ApiRequest;

    /// Extract the reported total and the raw items from one response page.
    fn parse_page(&self, body: &Value) -> Result<ResourcePage, CollectError>;

    /// Map one item to label values in descriptor order, or `None` when a
    /// required field is absent.
    fn map_item(&self, item: &Value) -> Option<Vec<String>>;
}

/// A collector as seen by the registry.
#[async_trait]
pub trait Collector: Send + Sync {
    fn descriptor(&self) -> &Descriptor;

    /// Perform one full fetch-and-map cycle against the upstream provider.
    async fn collect(&self, transport: &dyn ApiTransport) -> Result<Harvest, CollectError>;
}

/// Generic paginating collector over one [`ResourceKind`].
pub struct ResourceCollector<K: ResourceKind> {
    kind: K,
    region: String,
    page_size: u64,
}

impl<K: ResourceKind> ResourceCollector<K> {
    pub fn new(kind: K, region: impl Into<String>, page_size: u64) -> Self {
        Self {
            kind,
            region: region.into(),
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl<K: ResourceKind> Collector for ResourceCollector<K> {
    fn descriptor(&self) -> &Descriptor {
        self.kind.descriptor()
    }

    async fn collect(&self, transport: &dyn ApiTransport) -> Result<Harvest, CollectError> {
        let descriptor = self.kind.descriptor();
        let label_count = descriptor.label_names().len();

        let mut harvest = Harvest::default();
        let mut cursor = PageCursor {
            offset: 0,
            limit: self.page_size,
        };
        let mut fetched: u64 = 0;
        // The loop bound is the total reported by the first page. Later pages
        // may report a different total; those are not trusted.
        let mut bound: Option<u64> = None;

        loop {
            let request = self.kind.list_request(&cursor);
            let body = transport.call(&self.region, &request).await?;
            let page = self.kind.parse_page(&body)?;
            let total = *bound.get_or_insert(page.total);

            let page_len = page.items.len() as u64;
            for item in &page.items {
                match self.kind.map_item(item) {
                    Some(label_values) if label_values.len() == label_count => {
                        harvest.samples.push(Sample {
                            value: 1.0,
                            label_values,
                        });
                    }
                    _ => {
                        harvest.skipped += 1;
                        debug!(
                            metric = %descriptor.name(),
                            offset = cursor.offset,
                            "Skipping item with missing label fields"
                        );
                    }
                }
            }
            fetched += page_len;

            if fetched >= total {
                break;
            }
            if page_len == 0 {
                // The provider claims more items exist but returned none;
                // stop rather than loop on an inconsistent total.
                debug!(
                    metric = %descriptor.name(),
                    fetched,
                    total,
                    "Empty page before reported total was reached"
                );
                break;
            }
            cursor.offset += cursor.limit;
        }

        Ok(harvest)
    }
}
