//! End-to-end controller flow against in-memory collaborators: watch events
//! feed the index, workers reconcile, and the writer plays the backing
//! store (applying accepted updates straight back into the index, the way
//! the real store's watch feed would).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use gantry_common::{
    ResourceKey, ResourceLike, Result, PLACEMENT_ANNOTATION, SYNC_STATE_LABEL_PREFIX,
    SYNC_STATE_VALUE, SYNC_STATUS_ANNOTATION_PREFIX, TRANSFORM_HOST_ANNOTATION,
    WORKSPACE_ANNOTATION,
};
use gantry_operator::{
    build_migration_controllers, build_traffic_controllers, MigrationWriters, TrafficDeps,
};
use gantry_reconciler::{ObjectWriter, SharedIndex, Store, WatchEvent};
use gantry_traffic::{DnsTargetSink, Route, Target, TrafficConfig};

/// Writer that accepts every update and reflects it back into the index,
/// standing in for the backing store plus its watch feed.
struct ApplyingWriter<R> {
    index: OnceLock<Arc<SharedIndex<R>>>,
    updates: AtomicUsize,
}

impl<R> ApplyingWriter<R> {
    fn new() -> Self {
        Self {
            index: OnceLock::new(),
            updates: AtomicUsize::new(0),
        }
    }

    fn attach(&self, index: Arc<SharedIndex<R>>) {
        let _ = self.index.set(index);
    }

    fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R> ObjectWriter<R> for ApplyingWriter<R>
where
    R: ResourceLike + Clone + Send + Sync + 'static,
{
    async fn update(&self, _workspace: &str, _namespace: &str, object: &R) -> Result<R> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if let Some(index) = self.index.get() {
            index.insert(object.clone());
        }
        Ok(object.clone())
    }
}

#[derive(Default)]
struct RecordingSink {
    published: Mutex<Vec<(ResourceKey, Vec<Target>)>>,
}

impl RecordingSink {
    fn last(&self) -> Option<(ResourceKey, Vec<Target>)> {
        self.published.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DnsTargetSink for RecordingSink {
    async fn publish(&self, key: &ResourceKey, targets: &[Target]) -> Result<()> {
        self.published
            .lock()
            .unwrap()
            .push((key.clone(), targets.to_vec()));
        Ok(())
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 2s");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Story: a placement change flows from watch event to a single persisted
/// relocation, then the controller settles.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn story_migration_settles_after_one_write() {
    let deployments = Arc::new(ApplyingWriter::<Deployment>::new());
    let controllers = build_migration_controllers(MigrationWriters {
        deployments: Arc::clone(&deployments) as _,
        secrets: Arc::new(ApplyingWriter::<k8s_openapi::api::core::v1::Secret>::new()),
        services: Arc::new(ApplyingWriter::<k8s_openapi::api::core::v1::Service>::new()),
    });
    deployments.attach(controllers.deployments.index());

    for future in controllers.futures(1) {
        tokio::spawn(future);
    }

    let object = Deployment {
        metadata: ObjectMeta {
            name: Some("app".to_string()),
            namespace: Some("default".to_string()),
            annotations: Some(BTreeMap::from([
                (WORKSPACE_ANNOTATION.to_string(), "team-a".to_string()),
                (PLACEMENT_ANNOTATION.to_string(), "us-east-2".to_string()),
            ])),
            ..Default::default()
        },
        ..Default::default()
    };
    controllers
        .deployments
        .handle(WatchEvent::Applied(object));

    let writer = Arc::clone(&deployments);
    wait_for(move || writer.updates() == 1).await;

    // The follow-up pass sees the persisted state and stays quiet
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(deployments.updates(), 1);

    let key = ResourceKey::new("team-a", "default", "app");
    let stored = controllers
        .deployments
        .index()
        .get_by_key(&key)
        .unwrap()
        .expect("deployment should still be cached");
    assert_eq!(
        stored
            .labels()
            .unwrap()
            .get(&format!("{}us-east-2", SYNC_STATE_LABEL_PREFIX))
            .map(String::as_str),
        Some(SYNC_STATE_VALUE)
    );

    controllers.shutdown();
}

/// Story: sync annotations from two clusters become two canonical DNS
/// targets, while the user's spec survives the round trip.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn story_traffic_derives_targets_and_keeps_user_spec() {
    let routes = Arc::new(ApplyingWriter::<Route>::new());
    let sink = Arc::new(RecordingSink::default());
    let controllers = build_traffic_controllers(TrafficDeps {
        config: TrafficConfig::new("edge.gantry.dev"),
        ingresses: Arc::new(ApplyingWriter::<k8s_openapi::api::networking::v1::Ingress>::new()),
        routes: Arc::clone(&routes) as _,
        sink: Arc::clone(&sink) as _,
    });
    routes.attach(controllers.routes.index());

    for future in controllers.futures(1) {
        tokio::spawn(future);
    }

    let mut object = Route::default();
    object.metadata.name = Some("app".to_string());
    object.metadata.namespace = Some("default".to_string());
    object.metadata.annotations = Some(BTreeMap::from([
        (WORKSPACE_ANNOTATION.to_string(), "team-a".to_string()),
        (
            format!("{}c0", SYNC_STATUS_ANNOTATION_PREFIX),
            r#"{"status":{"ingress":[{"host":"lb0.example.com"}]}}"#.to_string(),
        ),
        (
            format!("{}c1", SYNC_STATUS_ANNOTATION_PREFIX),
            r#"{"status":{"ingress":[{"host":"lb1.example.com"}]}}"#.to_string(),
        ),
    ]));
    object.spec.host = "app.user.example.com".to_string();
    controllers.routes.handle(WatchEvent::Applied(object));

    let probe = Arc::clone(&sink);
    wait_for(move || probe.last().is_some()).await;

    let (key, targets) = sink.last().unwrap();
    assert_eq!(key, ResourceKey::new("team-a", "default", "app"));
    assert_eq!(
        targets,
        vec![
            Target::new("c0", "lb0.example.com"),
            Target::new("c1", "lb1.example.com"),
        ]
    );

    let writer = Arc::clone(&routes);
    wait_for(move || writer.updates() == 1).await;
    let stored = controllers
        .routes
        .index()
        .get_by_key(&key)
        .unwrap()
        .expect("route should still be cached");
    assert_eq!(stored.spec.host, "app.user.example.com");
    assert!(stored
        .annotations()
        .unwrap()
        .contains_key(TRANSFORM_HOST_ANNOTATION));

    controllers.shutdown();
}
