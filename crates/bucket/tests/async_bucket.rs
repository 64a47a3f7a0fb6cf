use std::collections::HashMap;

use bucket::{AsyncBucket, Bucket};
use bucketstore::DirectoryRegistry;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    scopes: Vec<String>,
    expires_at: u64,
}

fn session(i: u64) -> Session {
    Session {
        user: format!("user{}", i),
        scopes: vec!["read".to_string(), "write".to_string()],
        expires_at: 1_700_000_000 + i,
    }
}

fn open(dir: &TempDir, registry: &DirectoryRegistry) -> AsyncBucket {
    Bucket::builder(dir.path(), 1024 * 1024)
        .with_registry(registry.clone())
        .build()
        .unwrap()
        .into()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_on_distinct_keys() {
    let dir = TempDir::new().unwrap();
    let bucket = open(&dir, &DirectoryRegistry::new());

    let mut handles = Vec::new();
    for i in 0..32u64 {
        let bucket = bucket.clone();
        handles.push(tokio::spawn(async move {
            bucket.put(&format!("session:{}", i), &session(i)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for i in 0..32u64 {
        let stored = bucket.get::<Session>(&format!("session:{}", i)).await.unwrap();
        assert_eq!(stored, Some(session(i)));
    }
    assert_eq!(bucket.blocking().cache().len(), 32);
}

#[tokio::test]
async fn test_async_and_blocking_views_agree() {
    let dir = TempDir::new().unwrap();
    let bucket = open(&dir, &DirectoryRegistry::new());

    let mut counts = HashMap::new();
    counts.insert("a".to_string(), 1u32);
    counts.insert("b".to_string(), 2u32);
    bucket.put("counts", &counts).await.unwrap();

    let blocking: Option<HashMap<String, u32>> = bucket.blocking().get("counts").unwrap();
    assert_eq!(blocking, Some(counts));

    bucket.clear().await.unwrap();
    assert!(!bucket.blocking().contains("counts").unwrap());
}

#[tokio::test]
async fn test_reopen_after_async_writes() {
    let dir = TempDir::new().unwrap();
    let registry = DirectoryRegistry::new();

    {
        let bucket = open(&dir, &registry);
        bucket.put("session", &session(7)).await.unwrap();
        bucket.remove("missing").await.unwrap();
    }
    assert!(registry.is_empty());

    let bucket = open(&dir, &registry);
    assert_eq!(bucket.get::<Session>("session").await.unwrap(), Some(session(7)));
    assert_eq!(bucket.blocking().stats().hits(), 1);
}
