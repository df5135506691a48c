//! Activity feeds and display-name resolution

use plateful_core::{ActivityKind, PlatefulConfig, PlatefulError, UserId};
use plateful_store::{DocumentStore, MemoryStore};
use plateful_test_utils::{app_over, seed_restaurant, seed_user, FaultyStore, TestWorld};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn own_feed_is_newest_first_and_limited() {
    let world = TestWorld::new();
    let alice = world.user("Alice").await;
    let ledger = world.as_user(&alice).ledger();
    let mut places = Vec::new();
    for n in 0..4 {
        let id = world.restaurant(&format!("Place {n}"), "1 Main St").await;
        ledger.set_restaurant_like(&id, true).await.unwrap();
        places.push(id);
    }

    let events = world.app.feed().recent_activity_for(&alice, 3).await.unwrap();
    let liked: Vec<_> = events
        .iter()
        .map(|e| e.restaurant_id.clone().unwrap())
        .collect();
    assert_eq!(liked, vec![places[3].clone(), places[2].clone(), places[1].clone()]);
    assert!(events.windows(2).all(|w| w[0].created_at > w[1].created_at));
    assert!(events.iter().all(|e| e.kind == ActivityKind::LikedRestaurant));
    assert!(world.app.feed().recent_activity_for(&alice, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn following_feed_merges_direct_follows_only() {
    let world = TestWorld::new();
    let viewer = world.user("Viewer").await;
    let bob = world.user("Bob").await;
    let carol = world.user("Carol").await;
    let dave = world.user("Dave").await;
    let joes = world.restaurant("Joe's Diner", "1 Main St").await;
    let pho = world.restaurant("Pho King", "2 Elm St").await;

    world.as_user(&viewer).ledger().follow(&bob).await.unwrap();
    world.as_user(&viewer).ledger().follow(&carol).await.unwrap();
    // bob follows dave, but viewer does not
    world.as_user(&bob).ledger().follow(&dave).await.unwrap();

    world.as_user(&bob).ledger().set_restaurant_like(&joes, true).await.unwrap();
    world.as_user(&dave).ledger().set_restaurant_like(&joes, true).await.unwrap();
    world.as_user(&carol).ledger().set_restaurant_like(&pho, true).await.unwrap();
    world.as_user(&viewer).ledger().set_restaurant_like(&pho, true).await.unwrap();
    world.as_user(&bob).ledger().set_restaurant_like(&pho, true).await.unwrap();

    let feed = world.app.feed();
    let events = feed.recent_activity_for_following(&viewer, 10).await.unwrap();
    let actors: Vec<_> = events.iter().map(|e| e.actor_id.clone()).collect();
    assert_eq!(actors, vec![bob.clone(), carol.clone(), bob.clone()]);
    assert!(events.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let top = feed.recent_activity_for_following(&viewer, 1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].restaurant_id.as_ref(), Some(&pho));

    let lonely = feed.recent_activity_for_following(&dave, 10).await.unwrap();
    assert!(lonely.is_empty());
    assert!(matches!(
        feed.recent_activity_for_following(&UserId::from("ghost"), 10).await,
        Err(PlatefulError::NotFound(_))
    ));
}

#[tokio::test]
async fn failing_followed_user_is_dropped_from_the_merge() {
    let memory = MemoryStore::new();
    let faulty = FaultyStore::new(Arc::new(memory.clone()));
    let app = app_over(Arc::new(faulty.clone()), PlatefulConfig::new());
    let viewer = seed_user(&app, "Viewer").await;
    let bob = seed_user(&app, "Bob").await;
    let carol = seed_user(&app, "Carol").await;
    let joes = seed_restaurant(&app, "Joe's Diner", "1 Main St").await;

    for followed in [&bob, &carol] {
        app.acting_as(&viewer).ledger().follow(followed).await.unwrap();
        app.acting_as(followed)
            .ledger()
            .set_restaurant_like(&joes, true)
            .await
            .unwrap();
    }

    faulty.fail_query_where("activities", "actorId", bob.as_str());
    let events = app
        .feed()
        .recent_activity_for_following(&viewer, 10)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].actor_id, carol);
}

#[tokio::test]
async fn display_names_are_cached_and_never_invalidated() {
    let memory = MemoryStore::new();
    let faulty = FaultyStore::new(Arc::new(memory.clone()));
    let app = app_over(Arc::new(faulty.clone()), PlatefulConfig::new());
    let viewer = seed_user(&app, "Viewer").await;
    let bob = seed_user(&app, "Bob").await;
    let joes = seed_restaurant(&app, "Joe's Diner", "1 Main St").await;
    app.acting_as(&viewer).ledger().follow(&bob).await.unwrap();
    app.acting_as(&bob).ledger().set_restaurant_like(&joes, true).await.unwrap();

    let feed = app.feed();
    let entries = feed.feed_for_following(&viewer, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor_name.as_deref(), Some("Bob Tester"));
    assert_eq!(feed.names().entry_count().await, 1);

    // Rename bob behind the cache's back; the cached name keeps being served.
    memory
        .update(
            "users",
            bob.as_str(),
            vec![plateful_store::FieldUpdate::set("firstName", "Robert")],
        )
        .await
        .unwrap();
    let gets_before = faulty.get_calls();
    let names = feed.resolve_display_names(&[entries[0].event.clone()]).await;
    assert_eq!(names.get(&bob).map(String::as_str), Some("Bob Tester"));
    assert_eq!(faulty.get_calls(), gets_before);

    // A fresh feed has a fresh cache.
    let fresh = app.feed().resolve_display_names(&[entries[0].event.clone()]).await;
    assert_eq!(fresh.get(&bob).map(String::as_str), Some("Robert Tester"));
}

#[tokio::test]
async fn events_of_unknown_kind_are_skipped() {
    let world = TestWorld::new();
    let alice = world.user("Alice").await;
    world
        .store
        .add(
            "activities",
            serde_json::json!({ "actorId": "alice", "kind": "poked" })
                .as_object()
                .cloned()
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(world.app.feed().recent_activity_for(&alice, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_kinds_do_not_hide_older_events() {
    let world = TestWorld::new();
    let alice = world.user("Alice").await;
    let joes = world.restaurant("Joe's Diner", "1 Main St").await;
    world.as_user(&alice).ledger().set_restaurant_like(&joes, true).await.unwrap();
    for kind in ["poked", "waved", "nudged"] {
        world
            .store
            .add(
                "activities",
                serde_json::json!({ "actorId": "alice", "kind": kind })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
    }

    let events = world.app.feed().recent_activity_for(&alice, 1).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ActivityKind::LikedRestaurant);
    assert_eq!(events[0].restaurant_id.as_ref(), Some(&joes));
}

#[tokio::test]
async fn unreadable_actor_keeps_entry_without_name() {
    let memory = MemoryStore::new();
    let faulty = FaultyStore::new(Arc::new(memory.clone()));
    let app = app_over(Arc::new(faulty.clone()), PlatefulConfig::new());
    let viewer = seed_user(&app, "Viewer").await;
    let bob = seed_user(&app, "Bob").await;
    let joes = seed_restaurant(&app, "Joe's Diner", "1 Main St").await;
    app.acting_as(&viewer).ledger().follow(&bob).await.unwrap();
    app.acting_as(&bob).ledger().set_restaurant_like(&joes, true).await.unwrap();

    faulty.fail_get("users", bob.as_str());
    let feed = app.feed();
    let entries = feed.feed_for_following(&viewer, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event.actor_id, bob);
    assert_eq!(entries[0].actor_name, None);
    assert_eq!(feed.names().entry_count().await, 0);

    faulty.heal();
    let names = feed.resolve_display_names(&[entries[0].event.clone()]).await;
    assert_eq!(names.get(&bob).map(String::as_str), Some("Bob Tester"));
}
