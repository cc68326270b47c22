mod test_support;

use ab_core::{InMemoryInstanceStore, InstanceStatus, InstanceStore, ProcessRuntime, TaskServices};
use serde_json::json;
use std::sync::Arc;
use test_support::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_instances_run_concurrently() {
    let def = Arc::new(linear(approval(&["finance"])));
    let rt = Arc::new(ProcessRuntime::new(InMemoryInstanceStore::new(), TaskServices::default()));

    let mut handles = Vec::new();
    for n in 0..16 {
        let def = def.clone();
        let rt = rt.clone();
        handles.push(tokio::spawn(async move { rt.trigger(&def, TRIGGER_KEY, json!({"n": n})).await }));
    }
    let mut ids = Vec::new();
    for h in handles {
        let inst = h.await.unwrap().unwrap();
        assert_eq!(inst.status, InstanceStatus::Waiting);
        ids.push(inst.id);
    }
    assert_eq!(rt.store().len(), 16);

    let mut handles = Vec::new();
    for id in ids {
        let def = def.clone();
        let rt = rt.clone();
        handles.push(tokio::spawn(async move { rt.respond(&def, id, "Task_A", json!(true)).await }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap().unwrap().status, InstanceStatus::Completed);
    }
    assert!(rt.store().list_by_status(InstanceStatus::Waiting).await.unwrap().is_empty());
    assert_eq!(rt.store().list_by_status(InstanceStatus::Completed).await.unwrap().len(), 16);
}
