//! Plateful Simulator - randomized workload plus invariant audit
//!
//! Phase 1 seeds users and restaurants. Phase 2 runs a seeded stream of
//! follows, likes and reviews in concurrent batches on the multi-threaded
//! runtime, retrying transaction conflicts with backoff. Phase 3 audits the
//! final state:
//! - `following` / `followers` mirror each other and contain no self-edges
//! - every review's `likeCount` equals the users holding its like
//! - following feeds are newest first and only contain direct follows

use futures::future::join_all;
use plateful_core::{
    with_backoff, NewRestaurant, NewReview, NewUser, Plateful, PlatefulConfig, PlatefulError,
    RestaurantId, ReviewId, StaticIdentity, UserId,
};
use plateful_store::{DocumentStore, MemoryStore};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Simulator configuration
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Users to create
    pub users: usize,
    /// Workload operations to run
    pub operations: u64,
    /// Operations in flight per batch
    pub concurrency: usize,
    /// Stop the workload on the first unexpected outcome
    pub stop_on_first_violation: bool,
    /// Service configuration
    #[serde(skip)]
    pub app: PlatefulConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            users: 20,
            operations: 500,
            concurrency: 8,
            stop_on_first_violation: false,
            app: PlatefulConfig::default(),
        }
    }
}

/// One workload step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SimulatedOperation {
    /// `actor` follows `target`
    Follow(UserId, UserId),
    /// `actor` unfollows `target`
    Unfollow(UserId, UserId),
    /// `actor` targets themself; must be rejected
    SelfFollow(UserId),
    /// `actor` sets a restaurant like
    LikeRestaurant(UserId, RestaurantId, bool),
    /// `actor` sets a review like
    LikeReview(UserId, ReviewId, bool),
    /// `actor` reviews a restaurant with a food score in half points
    CreateReview(UserId, RestaurantId, u8),
}

/// Result classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExpectedResult {
    /// Must succeed (after conflict retries)
    ShouldSucceed,
    /// Must fail with a self-reference error
    ShouldFailSelfReference,
}

/// A violation detected during simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Violation {
    /// An operation ended differently than expected
    UnexpectedOutcome {
        operation: SimulatedOperation,
        expected: ExpectedResult,
        actual: String,
    },
    /// `user.following` has `other` but `other.followers` lacks `user`, or the reverse
    FollowAsymmetry { user: UserId, other: UserId },
    /// A user follows or is followed by themself
    SelfEdge { user: UserId },
    /// Stored counter differs from the number of likers
    LikeCountMismatch {
        review: ReviewId,
        stored: u64,
        holders: u64,
    },
    /// A review created during the run could not be read back
    ReviewUnreadable { review: ReviewId, error: String },
    /// Feed events out of order or authored by a non-followed user
    FeedInconsistent { user: UserId, detail: String },
}

/// Statistics for simulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulatorStats {
    /// Operations issued
    pub operations_attempted: u64,
    /// Operations that succeeded as expected
    pub operations_succeeded: u64,
    /// Operations correctly rejected
    pub operations_rejected: u64,
    /// Transaction conflicts absorbed by retries
    pub conflicts_retried: u64,
    /// Advisory writes that failed
    pub advisory_failures: u64,
    /// Follow edges at audit time
    pub follow_edges: u64,
    /// Reviews at audit time
    pub reviews: u64,
    /// Review likes at audit time
    pub review_likes: u64,
}

/// Final report from simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorReport {
    /// Configuration used
    pub config: SimulatorConfig,
    /// Run statistics
    pub stats: SimulatorStats,
    /// Violations found
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        let s = &self.stats;
        let _ = writeln!(report, "=== Plateful Simulator Report ===\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Users: {}", self.config.users);
        let _ = writeln!(report, "Concurrency: {}", self.config.concurrency);
        let _ = writeln!(report, "Operations Attempted: {}", s.operations_attempted);
        let _ = writeln!(report, "Operations Succeeded: {}", s.operations_succeeded);
        let _ = writeln!(report, "Operations Rejected: {}", s.operations_rejected);
        let _ = writeln!(report, "Conflicts Retried: {}", s.conflicts_retried);
        let _ = writeln!(report, "Advisory Failures: {}", s.advisory_failures);
        let _ = writeln!(report, "Follow Edges: {}", s.follow_edges);
        let _ = writeln!(report, "Reviews: {}", s.reviews);
        let _ = writeln!(report, "Review Likes: {}", s.review_likes);
        let _ = writeln!(report, "Violations: {}", self.violations.len());

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {v:?}", i + 1);
            }
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// A seeded world the workload runs against
#[derive(Debug, Clone)]
pub struct SimulatedWorld {
    /// Service context over the in-memory store
    pub app: Plateful,
    /// Seeded users, in creation order
    pub users: Vec<UserId>,
    /// Seeded restaurants
    pub restaurants: Vec<RestaurantId>,
    /// Reviews created by the workload so far
    pub reviews: Vec<ReviewId>,
}

const CUISINES: [&str; 5] = ["Diner", "Vietnamese", "Mexican", "Italian", "Thai"];
const FIRST_NAMES: [&str; 8] = ["Ada", "Ben", "Cleo", "Dev", "Eli", "Fay", "Gus", "Hana"];

impl SimulatedWorld {
    /// Create users and restaurants in a fresh in-memory store
    ///
    /// # Errors
    /// `PlatefulError::Config` for fewer than two users; otherwise
    /// propagates any seeding failure.
    pub async fn seed(config: &SimulatorConfig) -> Result<Self, PlatefulError> {
        if config.users < 2 {
            return Err(PlatefulError::Config(format!(
                "simulator needs at least 2 users, got {}",
                config.users
            )));
        }
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let app = Plateful::new(
            store,
            Arc::new(StaticIdentity::anonymous()),
            config.app.clone(),
        )?;

        let mut users = Vec::with_capacity(config.users);
        for n in 0..config.users {
            let id = UserId::new(format!("user-{n:04}"));
            let first = FIRST_NAMES[n % FIRST_NAMES.len()];
            app.users()
                .ensure_profile(
                    &id,
                    NewUser::new(first, format!("Sim{n}"), format!("{id}@sim.local")),
                )
                .await?;
            users.push(id);
        }

        let mut restaurants = Vec::new();
        for n in 0..(config.users / 2).max(3) {
            let cuisine = CUISINES[n % CUISINES.len()];
            let price = u8::try_from(n % 4).unwrap_or(0) + 1;
            let registration = app
                .restaurants()
                .create_or_get(
                    NewRestaurant::new(format!("{cuisine} Place {n}"), format!("{n} Main St"))
                        .with_location("Springfield", "IL")
                        .with_cuisine(cuisine)
                        .with_price_level(price),
                )
                .await?;
            restaurants.push(registration.restaurant.id);
        }

        info!(users = users.len(), restaurants = restaurants.len(), "world seeded");
        Ok(Self {
            app,
            users,
            restaurants,
            reviews: Vec::new(),
        })
    }

    fn generate_operation(&self, rng: &mut StdRng) -> SimulatedOperation {
        let actor = self.users[rng.random_range(0..self.users.len())].clone();
        let other = self.users[rng.random_range(0..self.users.len())].clone();
        let restaurant = self.restaurants[rng.random_range(0..self.restaurants.len())].clone();

        match rng.random_range(0..10) {
            0..=2 if other != actor => SimulatedOperation::Follow(actor, other),
            3 if other != actor => SimulatedOperation::Unfollow(actor, other),
            4 => SimulatedOperation::SelfFollow(actor),
            5 | 6 if !self.reviews.is_empty() => {
                let review = self.reviews[rng.random_range(0..self.reviews.len())].clone();
                SimulatedOperation::LikeReview(actor, review, rng.random_bool(0.75))
            }
            7 => SimulatedOperation::CreateReview(actor, restaurant, rng.random_range(0..=10)),
            _ => SimulatedOperation::LikeRestaurant(actor, restaurant, rng.random_bool(0.7)),
        }
    }
}

fn classify_expected_result(operation: &SimulatedOperation) -> ExpectedResult {
    match operation {
        SimulatedOperation::SelfFollow(_) => ExpectedResult::ShouldFailSelfReference,
        _ => ExpectedResult::ShouldSucceed,
    }
}

/// What a successful operation produced
enum Produced {
    Nothing,
    Review(ReviewId),
}

async fn execute_operation(
    app: &Plateful,
    operation: &SimulatedOperation,
    conflicts: &AtomicU64,
) -> Result<Produced, PlatefulError> {
    let policy = app.config().retry;
    with_backoff(&policy, move || async move {
        let result = match operation {
            SimulatedOperation::Follow(actor, target) => app
                .acting_as(actor)
                .ledger()
                .follow(target)
                .await
                .map(|()| Produced::Nothing),
            SimulatedOperation::Unfollow(actor, target) => app
                .acting_as(actor)
                .ledger()
                .unfollow(target)
                .await
                .map(|()| Produced::Nothing),
            SimulatedOperation::SelfFollow(actor) => app
                .acting_as(actor)
                .ledger()
                .follow(actor)
                .await
                .map(|()| Produced::Nothing),
            SimulatedOperation::LikeRestaurant(actor, restaurant, liked) => app
                .acting_as(actor)
                .ledger()
                .set_restaurant_like(restaurant, *liked)
                .await
                .map(|_| Produced::Nothing),
            SimulatedOperation::LikeReview(actor, review, liked) => app
                .acting_as(actor)
                .ledger()
                .set_review_like(review, *liked)
                .await
                .map(|_| Produced::Nothing),
            SimulatedOperation::CreateReview(actor, restaurant, halves) => app
                .acting_as(actor)
                .reviews()
                .create_review(
                    NewReview::of(restaurant.clone())
                        .food(f64::from(*halves) / 2.0, "simulated visit")
                        .with_tags(["sim"]),
                )
                .await
                .map(|created| Produced::Review(created.review.id)),
        };
        if matches!(result, Err(PlatefulError::TransactionConflict(_))) {
            conflicts.fetch_add(1, Ordering::Relaxed);
        }
        result
    })
    .await
}

/// Run the workload against a freshly seeded world and audit the result
pub async fn run_simulator(config: SimulatorConfig) -> Result<SimulatorReport, PlatefulError> {
    let mut world = SimulatedWorld::seed(&config).await?;
    let report = run_workload(&mut world, config).await;
    Ok(report)
}

/// Run the workload against an existing world and audit the result
pub async fn run_workload(world: &mut SimulatedWorld, config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();
    let conflicts = Arc::new(AtomicU64::new(0));
    let batch_size = config.concurrency.max(1);

    let mut remaining = config.operations;
    'workload: while remaining > 0 {
        let take = remaining.min(batch_size as u64);
        remaining -= take;
        let batch: Vec<SimulatedOperation> =
            (0..take).map(|_| world.generate_operation(&mut rng)).collect();

        let handles = batch.iter().cloned().map(|operation| {
            let app = world.app.clone();
            let conflicts = Arc::clone(&conflicts);
            tokio::spawn(async move { execute_operation(&app, &operation, &conflicts).await })
        });
        let outcomes = join_all(handles).await;

        for (operation, outcome) in batch.into_iter().zip(outcomes) {
            stats.operations_attempted += 1;
            let expected = classify_expected_result(&operation);
            let outcome = outcome.unwrap_or_else(|join| {
                Err(PlatefulError::Storage(format!("task failed: {join}")))
            });
            match (expected, outcome) {
                (ExpectedResult::ShouldSucceed, Ok(produced)) => {
                    stats.operations_succeeded += 1;
                    if let Produced::Review(id) = produced {
                        world.reviews.push(id);
                    }
                }
                (ExpectedResult::ShouldFailSelfReference, Err(PlatefulError::SelfReference(_))) => {
                    stats.operations_rejected += 1;
                }
                (expected, outcome) => {
                    let actual = match outcome {
                        Ok(_) => "succeeded".to_string(),
                        Err(err) => err.to_string(),
                    };
                    debug!(?operation, %actual, "unexpected outcome");
                    violations.push(Violation::UnexpectedOutcome {
                        operation,
                        expected,
                        actual,
                    });
                    if config.stop_on_first_violation {
                        break 'workload;
                    }
                }
            }
        }
    }

    stats.conflicts_retried = conflicts.load(Ordering::Relaxed);
    stats.advisory_failures = world.app.diagnostics().total();
    audit(world, &mut stats, &mut violations).await;

    SimulatorReport {
        config,
        stats,
        violations,
    }
}

async fn audit(world: &SimulatedWorld, stats: &mut SimulatorStats, violations: &mut Vec<Violation>) {
    let profiles: BTreeMap<UserId, _> = world
        .app
        .users()
        .get_many(&world.users)
        .await
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    for (id, profile) in &profiles {
        if profile.following.contains(id) || profile.followers.contains(id) {
            violations.push(Violation::SelfEdge { user: id.clone() });
        }
        for other in &profile.following {
            stats.follow_edges += 1;
            if !profiles.get(other).is_some_and(|o| o.followers.contains(id)) {
                violations.push(Violation::FollowAsymmetry {
                    user: id.clone(),
                    other: other.clone(),
                });
            }
        }
        for other in &profile.followers {
            if !profiles.get(other).is_some_and(|o| o.following.contains(id)) {
                violations.push(Violation::FollowAsymmetry {
                    user: other.clone(),
                    other: id.clone(),
                });
            }
        }
    }

    stats.reviews = world.reviews.len() as u64;
    for review in &world.reviews {
        let holders = profiles
            .values()
            .filter(|p| p.liked_reviews.contains(review))
            .count() as u64;
        stats.review_likes += holders;
        match world.app.reviews().get(review).await {
            Ok(stored) if stored.like_count == holders => {}
            Ok(stored) => violations.push(Violation::LikeCountMismatch {
                review: review.clone(),
                stored: stored.like_count,
                holders,
            }),
            Err(err) => violations.push(Violation::ReviewUnreadable {
                review: review.clone(),
                error: err.to_string(),
            }),
        }
    }

    let feed = world.app.feed();
    let limit = feed.default_limit();
    for (id, profile) in &profiles {
        let events = match feed.recent_activity_for_following(id, limit).await {
            Ok(events) => events,
            Err(err) => {
                violations.push(Violation::FeedInconsistent {
                    user: id.clone(),
                    detail: err.to_string(),
                });
                continue;
            }
        };
        if events.len() > limit {
            violations.push(Violation::FeedInconsistent {
                user: id.clone(),
                detail: format!("{} events exceed limit {limit}", events.len()),
            });
        }
        if events.windows(2).any(|w| w[0].created_at < w[1].created_at) {
            violations.push(Violation::FeedInconsistent {
                user: id.clone(),
                detail: "events not newest first".into(),
            });
        }
        if let Some(stranger) = events.iter().find(|e| !profile.following.contains(&e.actor_id)) {
            violations.push(Violation::FeedInconsistent {
                user: id.clone(),
                detail: format!("event {} by non-followed {}", stranger.id, stranger.actor_id),
            });
        }
    }
}
