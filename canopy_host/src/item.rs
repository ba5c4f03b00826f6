// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item records and the templating collaborator.
//!
//! A pagination response carries a batch of [`ItemRecord`]s. The core never
//! renders them; it asks the host's [`Materializer`] to turn each record into
//! a presentation node and hand back a lightweight handle. A record that
//! fails to materialize is reported and skipped without aborting the batch.

use serde::Deserialize;
use thiserror::Error;

/// One content item as delivered by the pagination endpoint.
///
/// Only `id` is required; everything else is presentation data the
/// materializer may or may not use.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemRecord {
    /// Stable item identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Optional excerpt text.
    pub excerpt: Option<String>,
    /// Optional cover image URL.
    pub cover: Option<String>,
    /// Owner display name.
    pub owner_name: Option<String>,
    /// Owner avatar URL.
    pub owner_avatar: Option<String>,
    /// Publish timestamp, as delivered (not interpreted by the core).
    pub publish_time: Option<String>,
    /// Visit count.
    pub visits: u64,
}

/// Failure to materialize one record into a presentation node.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("failed to materialize item {id}: {message}")]
pub struct MaterializeError {
    /// Identifier of the record that failed.
    pub id: String,
    /// Host-provided failure description.
    pub message: String,
}

/// Templating collaborator: one record in, one renderable node out.
///
/// `K` is the handle type the host uses for presentation nodes; the core
/// only ever stores and compares these handles.
pub trait Materializer<K> {
    /// Produce a node for `record` and return its handle.
    fn materialize(&mut self, record: &ItemRecord) -> Result<K, MaterializeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_deserializes_with_missing_fields() {
        let record: ItemRecord =
            serde_json::from_str(r#"{"id": "p1", "title": "Hello", "visits": 7}"#)
                .expect("valid record");
        assert_eq!(record.id, "p1");
        assert_eq!(record.visits, 7);
        assert_eq!(record.cover, None);
        assert_eq!(record.owner_name, None);
    }

    #[test]
    fn record_accepts_camel_case_fields() {
        let record: ItemRecord = serde_json::from_str(
            r#"{
                "id": "p2",
                "title": "Cover story",
                "cover": "/img/c.webp",
                "ownerName": "mika",
                "ownerAvatar": "/img/a.png",
                "publishTime": "2025-06-01T12:00:00Z",
                "visits": 120
            }"#,
        )
        .expect("valid record");
        assert_eq!(record.owner_name.as_deref(), Some("mika"));
        assert_eq!(record.publish_time.as_deref(), Some("2025-06-01T12:00:00Z"));
    }
}
