//! Reviews, reviewer levels and restaurant lists

use chrono::{TimeZone, Utc};
use plateful_core::{
    ActivityKind, Advisory, ListId, NewReview, PlatefulConfig, PlatefulError, RestaurantId,
};
use plateful_store::MemoryStore;
use plateful_test_utils::{app_over, seed_restaurant, seed_user, FaultyStore, TestWorld};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn publishing_a_review_records_activity_and_level() {
    let world = TestWorld::new();
    let author = world.user("Author").await;
    let joes = world.restaurant("Joe's Diner", "1 Main St").await;

    let created = world
        .as_user(&author)
        .reviews()
        .create_review(
            NewReview::of(joes.clone())
                .food(4.5, "  Flaky crust ")
                .with_tags(["#Pie", "pie", "Late Night"])
                .with_media(["photos/1.jpg", " "])
                .visited(Utc.with_ymd_and_hms(2024, 3, 1, 19, 0, 0).unwrap()),
        )
        .await
        .unwrap();

    let review = &created.review;
    assert_eq!(review.author_id, author);
    assert_eq!(review.food_score, Some(4.5));
    assert_eq!(review.service_score, None);
    assert_eq!(review.food_text.as_deref(), Some("Flaky crust"));
    assert_eq!(review.tags, vec!["pie", "late-night"]);
    assert_eq!(review.media, vec!["photos/1.jpg"]);
    assert_eq!(review.like_count, 0);
    assert!(review.visit_date.is_some());

    let event = created.activity.recorded().unwrap();
    assert_eq!(event.kind, ActivityKind::CreatedReview);
    assert_eq!(event.restaurant_name.as_deref(), Some("Joe's Diner"));
    assert_eq!(event.review_id.as_ref(), Some(&review.id));
    assert_eq!(created.level, Advisory::Recorded(2));
    assert_eq!(world.app.users().get(&author).await.unwrap().level, 2);
}

#[tokio::test]
async fn invalid_reviews_are_rejected_before_writing() {
    let world = TestWorld::new();
    let author = world.user("Author").await;
    let joes = world.restaurant("Joe's Diner", "1 Main St").await;
    let reviews = world.as_user(&author).reviews();

    for bad in [
        NewReview::of(joes.clone()).food(4.25, "odd"),
        NewReview::of(joes.clone()).service(6.0, "too good"),
        NewReview::of(joes.clone()),
    ] {
        assert!(matches!(
            reviews.create_review(bad).await,
            Err(PlatefulError::Validation(_))
        ));
    }
    assert!(matches!(
        reviews
            .create_review(NewReview::of(RestaurantId::from("nowhere|0")).food(3.0, "?"))
            .await,
        Err(PlatefulError::NotFound(_))
    ));
    assert!(world.store.is_empty("reviews"));
}

#[tokio::test]
async fn tags_are_capped_by_config() {
    let world = TestWorld::with_config(PlatefulConfig::new().with_max_tags(2));
    let author = world.user("Author").await;
    let joes = world.restaurant("Joe's Diner", "1 Main St").await;
    let created = world
        .as_user(&author)
        .reviews()
        .create_review(NewReview::of(joes).food(3.0, "ok").with_tags(["a", "b", "c"]))
        .await
        .unwrap();
    assert_eq!(created.review.tags, vec!["a", "b"]);
}

#[tokio::test]
async fn review_survives_activity_failure() {
    let memory = MemoryStore::new();
    let faulty = FaultyStore::new(Arc::new(memory.clone()));
    let app = app_over(Arc::new(faulty.clone()), PlatefulConfig::new());
    let author = seed_user(&app, "Author").await;
    let joes = seed_restaurant(&app, "Joe's Diner", "1 Main St").await;

    faulty.fail_adds("activities");
    let created = app
        .acting_as(&author)
        .reviews()
        .create_review(NewReview::of(joes).food(5.0, "Best"))
        .await
        .unwrap();

    assert!(created.activity.failed());
    assert_eq!(created.level, Advisory::Recorded(2));
    assert_eq!(memory.len("reviews"), 1);
    assert_eq!(app.diagnostics().recent()[0].operation, "create_review");
}

#[tokio::test]
async fn reviews_are_listed_newest_first_and_deleted_by_author_only() {
    let world = TestWorld::new();
    let author = world.user("Author").await;
    let other = world.user("Other").await;
    let joes = world.restaurant("Joe's Diner", "1 Main St").await;
    let reviews = world.as_user(&author).reviews();

    let mut ids = Vec::new();
    for score in [1.0, 2.0, 3.0] {
        let created = reviews
            .create_review(NewReview::of(joes.clone()).food(score, "meh"))
            .await
            .unwrap();
        ids.push(created.review.id);
    }

    let listed: Vec<_> = reviews
        .reviews_for_restaurant(&joes, 2)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(listed, vec![ids[2].clone(), ids[1].clone()]);
    assert_eq!(reviews.reviews_by_author(&author, 10).await.unwrap().len(), 3);
    assert_eq!(world.app.users().get(&author).await.unwrap().level, 2);

    let denied = world.as_user(&other).reviews().delete_review(&ids[0]).await;
    assert!(matches!(denied, Err(PlatefulError::PermissionDenied(_))));

    reviews.delete_review(&ids[0]).await.unwrap();
    assert_eq!(reviews.find(&ids[0]).await.unwrap(), None);
    assert_eq!(reviews.reviews_by_author(&author, 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn lists_are_owner_curated_sets() {
    let world = TestWorld::new();
    let owner = world.user("Owner").await;
    let other = world.user("Other").await;
    let joes = world.restaurant("Joe's Diner", "1 Main St").await;
    let pho = world.restaurant("Pho King", "2 Elm St").await;
    let lists = world.as_user(&owner).lists();

    let list = lists.create_list(" Date night ", Some("")).await.unwrap();
    assert_eq!(list.name, "Date night");
    assert_eq!(list.description, None);
    assert_eq!(list.owner_id, owner);

    lists.add_restaurant(&list.id, &joes).await.unwrap();
    lists.add_restaurant(&list.id, &joes).await.unwrap();
    lists.add_restaurant(&list.id, &pho).await.unwrap();
    assert_eq!(lists.get(&list.id).await.unwrap().restaurant_ids.len(), 2);

    lists.remove_restaurant(&list.id, &joes).await.unwrap();
    lists.remove_restaurant(&list.id, &joes).await.unwrap();
    let current = lists.get(&list.id).await.unwrap();
    assert_eq!(current.restaurant_ids.into_iter().collect::<Vec<_>>(), vec![pho.clone()]);

    let renamed = lists.rename(&list.id, "Brunch", Some("Weekend spots")).await.unwrap();
    assert_eq!(renamed.name, "Brunch");
    assert_eq!(renamed.description.as_deref(), Some("Weekend spots"));

    let intruder = world.as_user(&other).lists();
    assert!(matches!(
        intruder.add_restaurant(&list.id, &joes).await,
        Err(PlatefulError::PermissionDenied(_))
    ));
    assert!(matches!(
        intruder.delete_list(&list.id).await,
        Err(PlatefulError::PermissionDenied(_))
    ));
    assert!(matches!(
        lists.add_restaurant(&list.id, &RestaurantId::from("gone|0")).await,
        Err(PlatefulError::NotFound(_))
    ));
    assert!(matches!(
        lists.create_list("   ", None).await,
        Err(PlatefulError::Validation(_))
    ));

    let second = lists.create_list("Cheap eats", None).await.unwrap();
    let owned: Vec<_> = lists
        .lists_for_owner(&owner)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(owned, vec![second.id.clone(), list.id.clone()]);

    lists.delete_list(&list.id).await.unwrap();
    assert!(matches!(
        lists.get(&list.id).await,
        Err(PlatefulError::NotFound(_))
    ));
    assert!(matches!(
        lists.get(&ListId::from("missing")).await,
        Err(PlatefulError::NotFound(_))
    ));
}
