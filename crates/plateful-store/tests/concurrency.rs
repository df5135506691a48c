//! Store behavior under concurrent writers

use plateful_store::{
    Direction, DocumentStore, FieldUpdate, Filter, MemoryStore, OrderBy, Query, StoreError,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeSet;

async fn bump(store: &MemoryStore, id: &str) -> Result<u32, StoreError> {
    let mut retries = 0;
    loop {
        let mut txn = store.begin_transaction().await?;
        let current = txn
            .get("counters", id)
            .await?
            .and_then(|d| d.get("value").and_then(Value::as_u64))
            .unwrap_or(0);
        txn.set(
            "counters",
            id,
            json!({ "value": current + 1 }).as_object().cloned().unwrap_or_default(),
            true,
        )?;
        match txn.commit().await {
            Ok(()) => return Ok(retries),
            Err(err) if err.is_retryable() => {
                retries += 1;
                tokio::task::yield_now().await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn read_modify_write_transactions_lose_no_updates() {
    let store = MemoryStore::new();
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..32 {
        let store = store.clone();
        tasks.spawn(async move { bump(&store, "likes").await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    let doc = store.get("counters", "likes").await.unwrap().unwrap();
    assert_eq!(doc.get("value"), Some(&json!(32)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_array_unions_converge() {
    let store = MemoryStore::new();
    store
        .set("users", "bob", serde_json::Map::new(), false)
        .await
        .unwrap();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_array_union("users", "bob", "followers", vec![json!(format!("u{}", i % 8))])
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let followers = Query::collection("users").filter(Filter::array_contains("followers", "u3"));
    assert_eq!(store.query(&followers).await.unwrap().len(), 1);
    let doc = store.get("users", "bob").await.unwrap().unwrap();
    assert_eq!(doc.get("followers").and_then(Value::as_array).map(Vec::len), Some(8));
}

#[tokio::test]
async fn newest_first_listing_follows_insertion_order() {
    let store = MemoryStore::new();
    for i in 0..5 {
        store
            .add("activities", json!({ "n": i }).as_object().cloned().unwrap())
            .await
            .unwrap();
    }
    let recent = store
        .query(
            &Query::collection("activities")
                .order_by(OrderBy::CreateTime(Direction::Descending))
                .limit(3),
        )
        .await
        .unwrap();
    let ns: Vec<_> = recent.iter().filter_map(|d| d.get("n").cloned()).collect();
    assert_eq!(ns, vec![json!(4), json!(3), json!(2)]);
}

#[derive(Debug, Clone)]
enum Op {
    Union(u8),
    Remove(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![(0u8..6).prop_map(Op::Union), (0u8..6).prop_map(Op::Remove)]
}

proptest! {
    #[test]
    fn array_updates_behave_like_a_set(ops in prop::collection::vec(op(), 0..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (stored, model) = runtime.block_on(async {
            let store = MemoryStore::new();
            store.set("users", "ann", serde_json::Map::new(), false).await.unwrap();
            let mut model = BTreeSet::new();
            for op in &ops {
                let update = match op {
                    Op::Union(v) => {
                        model.insert(format!("u{v}"));
                        FieldUpdate::array_union("following", [format!("u{v}")])
                    }
                    Op::Remove(v) => {
                        model.remove(&format!("u{v}"));
                        FieldUpdate::array_remove("following", [format!("u{v}")])
                    }
                };
                store.update("users", "ann", vec![update]).await.unwrap();
            }
            let doc = store.get("users", "ann").await.unwrap().unwrap();
            let stored: Vec<String> = doc
                .get("following")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            (stored, model)
        });

        let unique: BTreeSet<_> = stored.iter().cloned().collect();
        prop_assert_eq!(unique.len(), stored.len());
        prop_assert_eq!(unique, model);
    }
}
