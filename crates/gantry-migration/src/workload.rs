//! The migration dispatcher.
//!
//! Placement is annotation-driven: `scheduling.gantry.dev/placement` names
//! the execution cluster an object should run on, and the per-cluster
//! `state.sync.gantry.dev/<cluster>` labels record where sync agents are
//! currently placing it. When the two disagree, the dispatcher adds the
//! sync-state label for the desired cluster and stamps a deletion marker on
//! every other placement; sync agents react by syncing the object to the new
//! cluster and tearing it down on the old ones.
//!
//! Calling the dispatcher repeatedly on an already-staged object is a
//! no-op, so the reconcile loop converges instead of re-writing forever.

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};

use gantry_common::{
    ResourceLike, Result, DELETING_ANNOTATION_PREFIX, PLACEMENT_ANNOTATION,
    SYNC_STATE_LABEL_PREFIX, SYNC_STATE_VALUE,
};
use gantry_reconciler::Enqueue;

/// Execution clusters the object currently carries an active placement for.
fn current_placements<R: ResourceLike>(object: &R) -> Vec<String> {
    object
        .labels()
        .into_iter()
        .flatten()
        .filter(|(key, value)| {
            key.starts_with(SYNC_STATE_LABEL_PREFIX) && value.as_str() == SYNC_STATE_VALUE
        })
        .map(|(key, _)| key[SYNC_STATE_LABEL_PREFIX.len()..].to_string())
        .collect()
}

/// Inspect `target` and stage relocation if its placement annotation points
/// at a cluster it is not yet synced to.
///
/// Mutations are staged on the target only; the engine persists them. The
/// key is re-enqueued when something changed so the follow-up pass observes
/// the persisted state.
pub fn migrate<R: ResourceLike>(target: &mut R, enqueue: &Enqueue) -> Result<()> {
    let desired = match target
        .annotations()
        .and_then(|a| a.get(PLACEMENT_ANNOTATION))
    {
        Some(desired) => desired.clone(),
        // No placement requested: nothing to dispatch
        None => return Ok(()),
    };

    let current = current_placements(target);
    let mut changed = false;

    if !current.iter().any(|cluster| *cluster == desired) {
        target.labels_mut().insert(
            format!("{}{}", SYNC_STATE_LABEL_PREFIX, desired),
            SYNC_STATE_VALUE.to_string(),
        );
        changed = true;
    }

    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    for cluster in current.iter().filter(|cluster| **cluster != desired) {
        let marker = format!("{}{}", DELETING_ANNOTATION_PREFIX, cluster);
        if target
            .annotations()
            .map_or(true, |a| !a.contains_key(&marker))
        {
            target.annotations_mut().insert(marker, stamp.clone());
            changed = true;
        }
    }

    if changed {
        let key = target.key();
        info!(key = %key, cluster = %desired, "staged relocation to new execution cluster");
        (enqueue)(key);
    } else {
        debug!(key = %target.key(), "placement already settled");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use gantry_common::ResourceKey;

    fn recording_enqueue() -> (Enqueue, Arc<Mutex<Vec<ResourceKey>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let enqueue: Enqueue = Arc::new(move |key| sink.lock().unwrap().push(key));
        (enqueue, seen)
    }

    fn deployment() -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some("app".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn with_placement(mut deployment: Deployment, cluster: &str) -> Deployment {
        deployment
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(PLACEMENT_ANNOTATION.to_string(), cluster.to_string());
        deployment
    }

    fn with_sync_state(mut deployment: Deployment, cluster: &str) -> Deployment {
        deployment
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(
                format!("{}{}", SYNC_STATE_LABEL_PREFIX, cluster),
                SYNC_STATE_VALUE.to_string(),
            );
        deployment
    }

    #[test]
    fn test_no_placement_annotation_is_a_noop() {
        let (enqueue, seen) = recording_enqueue();
        let mut target = deployment();
        let before = target.clone();

        migrate(&mut target, &enqueue).unwrap();
        assert_eq!(target, before);
        assert!(seen.lock().unwrap().is_empty());
    }

    /// Story: a placement change stages the new cluster and marks the old
    /// one for deletion
    #[test]
    fn story_relocation_stages_labels_and_deletion_marker() {
        let (enqueue, seen) = recording_enqueue();
        let mut target = with_sync_state(with_placement(deployment(), "us-east-2"), "us-east-1");

        migrate(&mut target, &enqueue).unwrap();

        let labels = target.labels().unwrap();
        assert_eq!(
            labels
                .get(&format!("{}us-east-2", SYNC_STATE_LABEL_PREFIX))
                .map(String::as_str),
            Some(SYNC_STATE_VALUE)
        );
        // The old placement label stays; the sync agent removes it after
        // tearing the workload down
        assert!(labels.contains_key(&format!("{}us-east-1", SYNC_STATE_LABEL_PREFIX)));

        let annotations = target.annotations().unwrap();
        assert!(annotations.contains_key(&format!("{}us-east-1", DELETING_ANNOTATION_PREFIX)));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    /// Story: dispatching an already-migrated object changes nothing
    #[test]
    fn story_dispatch_is_idempotent() {
        let (enqueue, seen) = recording_enqueue();
        let mut target = with_sync_state(with_placement(deployment(), "us-east-2"), "us-east-1");

        migrate(&mut target, &enqueue).unwrap();
        let staged = target.clone();

        migrate(&mut target, &enqueue).unwrap();
        assert_eq!(target, staged);
        // Only the first call re-enqueued
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_settled_placement_does_not_enqueue() {
        let (enqueue, seen) = recording_enqueue();
        let mut target = with_sync_state(with_placement(deployment(), "us-east-1"), "us-east-1");
        let before = target.clone();

        migrate(&mut target, &enqueue).unwrap();
        assert_eq!(target, before);
        assert!(seen.lock().unwrap().is_empty());
    }
}
