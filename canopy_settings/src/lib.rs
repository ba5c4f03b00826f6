// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Settings: the resolved theme settings snapshot.
//!
//! The page embeds a structured settings blob (historically the content of a
//! `theme-settings` meta tag). [`Settings::resolve`] merges that blob over
//! the compiled defaults and produces an immutable snapshot for the page's
//! lifetime. Resolution never fails:
//!
//! - a missing blob yields the defaults,
//! - a blob that is not a JSON object degrades wholesale to defaults and is
//!   reported to the fault sink,
//! - a field of the wrong shape degrades to that field's default and is
//!   reported, leaving well-formed sibling fields intact.
//!
//! There is no write path; components read the snapshot by reference.

use serde::Deserialize;
use serde_json::Value;

use canopy_breakpoint::Breakpoint;
use canopy_host::FaultSink;

/// Column count per size class for the masonry layout.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMap {
    /// Columns at the mobile class.
    pub mobile: u8,
    /// Columns at the tablet class.
    pub tablet: u8,
    /// Columns at the desktop class.
    pub desktop: u8,
    /// Columns at the wide class.
    pub wide: u8,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            mobile: 1,
            tablet: 2,
            desktop: 3,
            wide: 4,
        }
    }
}

impl ColumnMap {
    /// Columns for the given size class.
    #[must_use]
    pub const fn for_breakpoint(&self, breakpoint: Breakpoint) -> u8 {
        match breakpoint {
            Breakpoint::Mobile => self.mobile,
            Breakpoint::Tablet => self.tablet,
            Breakpoint::Desktop => self.desktop,
            Breakpoint::Wide => self.wide,
        }
    }
}

/// Immutable theme settings snapshot.
///
/// Built through [`Settings::resolve`] only; overrides are applied per
/// field there, with degradation reporting, not by whole-struct
/// deserialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Whether the modal stack is constructed at all.
    pub enable_modal: bool,
    /// Whether infinite scrolling is constructed; when false the pager runs
    /// in manual-button mode only.
    pub enable_infinite_scroll: bool,
    /// Whether the like controller is constructed.
    pub enable_like: bool,
    /// Whether the host should lazy-load item images.
    pub lazy_load_images: bool,
    /// Masonry columns per size class.
    pub masonry_columns: ColumnMap,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_modal: true,
            enable_infinite_scroll: true,
            enable_like: true,
            lazy_load_images: true,
            masonry_columns: ColumnMap::default(),
        }
    }
}

impl Settings {
    /// Resolve a snapshot from an optional page-provided JSON blob.
    ///
    /// Malformed input degrades to defaults (whole-blob or per-field) and is
    /// reported to `faults`; this never fails.
    #[must_use]
    pub fn resolve(blob: Option<&str>, faults: &mut dyn FaultSink) -> Self {
        let Some(blob) = blob else {
            return Self::default();
        };

        let value: Value = match serde_json::from_str(blob) {
            Ok(value) => value,
            Err(err) => {
                faults.report("settings", &err);
                return Self::default();
            }
        };
        let Value::Object(mut fields) = value else {
            faults.report("settings", &"settings blob is not a JSON object");
            return Self::default();
        };

        let defaults = Self::default();
        let settings = Self {
            enable_modal: take_field(&mut fields, "enableModal", defaults.enable_modal, faults),
            enable_infinite_scroll: take_field(
                &mut fields,
                "enableInfiniteScroll",
                defaults.enable_infinite_scroll,
                faults,
            ),
            enable_like: take_field(&mut fields, "enableLike", defaults.enable_like, faults),
            lazy_load_images: take_field(
                &mut fields,
                "lazyLoadImages",
                defaults.lazy_load_images,
                faults,
            ),
            masonry_columns: take_field(
                &mut fields,
                "masonryColumns",
                defaults.masonry_columns,
                faults,
            ),
        };

        tracing::debug!(?settings, "settings resolved");
        settings
    }

    /// Masonry columns for the given size class.
    #[must_use]
    pub const fn columns_for(&self, breakpoint: Breakpoint) -> u8 {
        self.masonry_columns.for_breakpoint(breakpoint)
    }
}

/// Pull one field out of the override map, falling back to `default` (and
/// reporting) when the value does not deserialize. Unknown sibling keys are
/// ignored, as the page may carry settings for other consumers.
fn take_field<T: for<'de> Deserialize<'de>>(
    fields: &mut serde_json::Map<String, Value>,
    key: &str,
    default: T,
    faults: &mut dyn FaultSink,
) -> T {
    match fields.remove(key) {
        None => default,
        Some(raw) => match serde_json::from_value(raw) {
            Ok(value) => value,
            Err(err) => {
                faults.report("settings", &format!("field `{key}`: {err}"));
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_host::{NullFaults, RecordingFaults};

    #[test]
    fn missing_blob_yields_defaults() {
        let settings = Settings::resolve(None, &mut NullFaults);
        assert_eq!(settings, Settings::default());
        assert!(settings.enable_modal);
        assert_eq!(settings.columns_for(Breakpoint::Desktop), 3);
    }

    #[test]
    fn overrides_merge_over_defaults() {
        let blob = r#"{
            "enableLike": false,
            "masonryColumns": {"mobile": 2, "wide": 6}
        }"#;
        let settings = Settings::resolve(Some(blob), &mut NullFaults);
        assert!(!settings.enable_like);
        assert!(settings.enable_modal);
        assert_eq!(settings.columns_for(Breakpoint::Mobile), 2);
        // Unspecified column entries keep their defaults.
        assert_eq!(settings.columns_for(Breakpoint::Tablet), 2);
        assert_eq!(settings.columns_for(Breakpoint::Wide), 6);
    }

    #[test]
    fn unparseable_blob_degrades_to_defaults_and_reports() {
        let mut faults = RecordingFaults::new();
        let settings = Settings::resolve(Some("{not json"), &mut faults);
        assert_eq!(settings, Settings::default());
        assert!(faults.has_from("settings"));
    }

    #[test]
    fn non_object_blob_degrades_to_defaults_and_reports() {
        let mut faults = RecordingFaults::new();
        let settings = Settings::resolve(Some("[1, 2]"), &mut faults);
        assert_eq!(settings, Settings::default());
        assert!(faults.has_from("settings"));
    }

    #[test]
    fn malformed_field_degrades_alone() {
        let mut faults = RecordingFaults::new();
        let blob = r#"{"enableModal": "yes please", "enableLike": false}"#;
        let settings = Settings::resolve(Some(blob), &mut faults);
        // Bad field keeps its default, good sibling applies.
        assert!(settings.enable_modal);
        assert!(!settings.enable_like);
        assert_eq!(faults.reports.len(), 1);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let blob = r##"{"accentColor": "#fa0", "enableModal": false}"##;
        let mut faults = RecordingFaults::new();
        let settings = Settings::resolve(Some(blob), &mut faults);
        assert!(!settings.enable_modal);
        assert!(faults.reports.is_empty());
    }
}
