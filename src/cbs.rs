//! Block-storage inventory: Cloud Block Storage disks.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::client::ApiRequest;
use crate::collector::{
    CollectError, Descriptor, PageCursor, ResourceKind, ResourcePage, parse_list_page,
};

const SERVICE: &str = "cbs";
const HOST: &str = "cbs.tencentcloudapi.com";
const VERSION: &str = "2017-03-12";

/// Collector kind for Cloud Block Storage disks.
pub struct CbsDisks {
    descriptor: Descriptor,
}

impl CbsDisks {
    pub fn new(namespace: &str) -> Self {
        Self {
            descriptor: Descriptor::new(
                namespace,
                "cbs",
                "instance",
                "cloud block storage disk on tencent cloud",
                vec!["disk_id", "name", "disk_type", "state", "zone"],
            ),
        }
    }
}

#[derive(Deserialize)]
struct Disk {
    #[serde(rename = "DiskId")]
    disk_id: Option<String>,
    #[serde(rename = "DiskName")]
    disk_name: Option<String>,
    #[serde(rename = "DiskType")]
    disk_type: Option<String>,
    #[serde(rename = "DiskState")]
    disk_state: Option<String>,
    #[serde(rename = "Placement")]
    placement: Option<Placement>,
}

#[derive(Deserialize)]
struct Placement {
    #[serde(rename = "Zone")]
    zone: Option<String>,
}

impl ResourceKind for CbsDisks {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn list_request(&self, cursor: &PageCursor) -> ApiRequest {
        ApiRequest {
            service: SERVICE,
            host: HOST,
            action: "DescribeDisks",
            version: VERSION,
            payload: json!({ "Offset": cursor.offset, "Limit": cursor.limit }),
        }
    }

    fn parse_page(&self, body: &Value) -> Result<ResourcePage, CollectError> {
        parse_list_page(body, "DiskSet")
    }

    fn map_item(&self, item: &Value) -> Option<Vec<String>> {
        let disk: Disk = serde_json::from_value(item.clone()).ok()?;

        Some(vec![
            disk.disk_id?,
            disk.disk_name?,
            disk.disk_type?,
            disk.disk_state?,
            disk.placement?.zone?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind() -> CbsDisks {
        CbsDisks::new("tc_info")
    }

    #[test]
    fn test_descriptor() {
        let descriptor = kind().descriptor().clone();

        assert_eq!(descriptor.name(), "tc_info_cbs_instance");
        assert_eq!(
            descriptor.label_names(),
            &["disk_id", "name", "disk_type", "state", "zone"]
        );
    }

    #[test]
    fn test_list_request_carries_cursor() {
        let request = kind().list_request(&PageCursor {
            offset: 100,
            limit: 100,
        });

        assert_eq!(request.service, "cbs");
        assert_eq!(request.action, "DescribeDisks");
        assert_eq!(request.payload["Offset"], 100);
        assert_eq!(request.payload["Limit"], 100);
    }

    #[test]
    fn test_parse_page_reads_disk_set() {
        let body = json!({
            "Response": {
                "TotalCount": 1,
                "DiskSet": [{ "DiskId": "disk-1" }]
            }
        });

        let page = kind().parse_page(&body).unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_map_item_reads_nested_zone() {
        let item = json!({
            "DiskId": "disk-abc123",
            "DiskName": "data-disk",
            "DiskType": "CLOUD_PREMIUM",
            "DiskState": "ATTACHED",
            "Placement": { "Zone": "ap-beijing-5" }
        });

        let labels = kind().map_item(&item).unwrap();

        assert_eq!(
            labels,
            vec![
                "disk-abc123",
                "data-disk",
                "CLOUD_PREMIUM",
                "ATTACHED",
                "ap-beijing-5"
            ]
        );
    }

    #[test]
    fn test_map_item_missing_zone_is_none() {
        let item = json!({
            "DiskId": "disk-abc123",
            "DiskName": "data-disk",
            "DiskType": "CLOUD_PREMIUM",
            "DiskState": "ATTACHED",
            "Placement": {}
        });

        assert!(kind().map_item(&item).is_none());
    }
}
