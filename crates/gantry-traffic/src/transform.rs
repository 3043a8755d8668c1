//! Record-or-keep bookkeeping for transform annotations.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use gantry_common::{Error, Result};

/// Reconcile one controller-owned field against its transform annotation.
///
/// If the staged value differs from the original, the controller authored
/// it this pass: record it under `annotation`. If the values are equal, any
/// previously recorded annotation already carries the downstream value and
/// is kept, after validating that it still parses (a sync agent or user may
/// have mangled it; that is a retryable error, not a panic).
///
/// The caller restores the field from the original afterwards, so repeated
/// calls with the same original are a projection, not an accumulator.
pub(crate) fn record_or_keep<T>(
    annotations: &mut BTreeMap<String, String>,
    annotation: &str,
    staged: &T,
    original: &T,
) -> Result<()>
where
    T: Serialize + DeserializeOwned + PartialEq,
{
    if staged != original {
        let value = serde_json::to_string(staged)
            .map_err(|e| Error::serialization(format!("{}: {}", annotation, e)))?;
        annotations.insert(annotation.to_string(), value);
        return Ok(());
    }

    if let Some(recorded) = annotations.get(annotation) {
        serde_json::from_str::<T>(recorded)
            .map_err(|e| Error::malformed_annotation(annotation, e.to_string()))?;
    }
    Ok(())
}
