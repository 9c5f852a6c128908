//! Search-cluster inventory: Elasticsearch Service instances.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::client::ApiRequest;
use crate::collector::{
    CollectError, Descriptor, PageCursor, ResourceKind, ResourcePage, parse_list_page,
};

const SERVICE: &str = "es";
const HOST: &str = "es.tencentcloudapi.com";
const VERSION: &str = "2018-04-16";

/// Collector kind for Elasticsearch Service instances.
pub struct EsInstances {
    descriptor: Descriptor,
}

impl EsInstances {
    pub fn new(namespace: &str) -> Self {
        Self {
            descriptor: Descriptor::new(
                namespace,
                "es",
                "instance",
                "elasticsearch instance on tencent cloud",
                vec!["instance_id", "name", "es_version"],
            ),
        }
    }
}

#[derive(Deserialize)]
struct EsInstance {
    #[serde(rename = "InstanceId")]
    instance_id: Option<String>,
    #[serde(rename = "InstanceName")]
    instance_name: Option<String>,
    #[serde(rename = "EsVersion")]
    es_version: Option<String>,
}

impl ResourceKind for EsInstances {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn list_request(&self, cursor: &PageCursor) -> ApiRequest {
        ApiRequest {
            service: SERVICE,
            host: HOST,
            action: "DescribeInstances",
            version: VERSION,
            payload: json!({ "Offset": cursor.offset, "Limit": cursor.limit }),
        }
    }

    fn parse_page(&self, body: &Value) -> Result<ResourcePage, CollectError> {
        parse_list_page(body, "InstanceList")
    }

    fn map_item(&self, item: &Value) -> Option<Vec<String>> {
        let instance: EsInstance = serde_json::from_value(item.clone()).ok()?;

        Some(vec![
            instance.instance_id?,
            instance.instance_name?,
            instance.es_version?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind() -> EsInstances {
        EsInstances::new("tc_info")
    }

    #[test]
    fn test_descriptor() {
        let descriptor = kind().descriptor().clone();

        assert_eq!(descriptor.name(), "tc_info_es_instance");
        assert_eq!(
            descriptor.label_names(),
            &["instance_id", "name", "es_version"]
        );
    }

    #[test]
    fn test_list_request_carries_cursor() {
        let request = kind().list_request(&PageCursor {
            offset: 200,
            limit: 100,
        });

        assert_eq!(request.service, "es");
        assert_eq!(request.host, "es.tencentcloudapi.com");
        assert_eq!(request.action, "DescribeInstances");
        assert_eq!(request.payload["Offset"], 200);
        assert_eq!(request.payload["Limit"], 100);
    }

    #[test]
    fn test_parse_page_reads_instance_list() {
        let body = json!({
            "Response": {
                "TotalCount": 2,
                "InstanceList": [
                    { "InstanceId": "es-1" },
                    { "InstanceId": "es-2" }
                ]
            }
        });

        let page = kind().parse_page(&body).unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn test_map_item_in_descriptor_order() {
        let item = json!({
            "InstanceId": "es-abc123",
            "InstanceName": "logs-cluster",
            "EsVersion": "7.10.1",
            "Zone": "ap-beijing-3"
        });

        let labels = kind().map_item(&item).unwrap();

        assert_eq!(labels, vec!["es-abc123", "logs-cluster", "7.10.1"]);
    }

    #[test]
    fn test_map_item_missing_field_is_none() {
        let item = json!({
            "InstanceId": "es-abc123",
            "InstanceName": "logs-cluster"
        });

        assert!(kind().map_item(&item).is_none());
    }
}
