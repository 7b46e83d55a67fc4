use std::collections::{hash_map::Entry, HashMap};
use std::hash::Hash;

use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::{
    core::{cluster::DisjointSet, error::HygieneError},
    model::user::UserKey,
    repository,
};

/// Which member of a duplicate cluster survives. Ids stand in for creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeepPolicy {
    /// Keep the smallest id.
    Oldest,
    /// Keep the largest id.
    Newest,
}

/// When two users count as duplicates of each other.
///
/// `Any` (username OR email) is looser than the detailed duplicate report, which
/// groups on username AND email, so it can delete users that report never lists.
/// `Both` matches that report exactly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    #[default]
    Any,
    Both,
}

#[derive(Clone, Debug, Default)]
pub struct CleanupRequest {
    pub policy: Option<KeepPolicy>,
    pub match_mode: MatchMode,
    pub confirmed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DuplicateCluster {
    pub kept: i32,
    pub deleted: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CleanupPlan {
    pub policy: KeepPolicy,
    pub match_mode: MatchMode,
    pub clusters: Vec<DuplicateCluster>,
}

impl CleanupPlan {
    pub fn deleted_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .clusters
            .iter()
            .flat_map(|c| c.deleted.iter().copied())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    pub plan: CleanupPlan,
    pub deleted: u64,
    /// Profiles that pointed at a deleted user. They are left dangling.
    pub orphaned_profiles: i64,
}

fn union_on<'a, K, F>(set: &mut DisjointSet, keys: &'a [UserKey], key_of: F)
where
    K: Eq + Hash,
    F: Fn(&'a UserKey) -> K,
{
    let mut first_seen: HashMap<K, usize> = HashMap::new();
    for (idx, key) in keys.iter().enumerate() {
        match first_seen.entry(key_of(key)) {
            Entry::Occupied(e) => set.union(*e.get(), idx),
            Entry::Vacant(e) => {
                e.insert(idx);
            }
        }
    }
}

/// Clusters `keys` under `match_mode` and picks one survivor per cluster.
/// String comparison is exact, like the "C" collation the reports use.
pub fn plan_cleanup(keys: &[UserKey], policy: KeepPolicy, match_mode: MatchMode) -> CleanupPlan {
    let mut set = DisjointSet::new(keys.len());
    match match_mode {
        MatchMode::Any => {
            union_on(&mut set, keys, |k| k.username.as_str());
            union_on(&mut set, keys, |k| k.email.as_str());
        }
        MatchMode::Both => {
            union_on(&mut set, keys, |k| (k.username.as_str(), k.email.as_str()));
        }
    }

    let mut clusters: Vec<DuplicateCluster> = set
        .groups()
        .into_iter()
        .filter(|members| members.len() > 1)
        .map(|members| {
            let mut ids: Vec<i32> = members.iter().map(|&idx| keys[idx].id).collect();
            ids.sort_unstable();
            let kept = match policy {
                KeepPolicy::Oldest => ids.remove(0),
                KeepPolicy::Newest => ids.remove(ids.len() - 1),
            };
            DuplicateCluster { kept, deleted: ids }
        })
        .collect();
    clusters.sort_by_key(|c| c.kept);

    CleanupPlan {
        policy,
        match_mode,
        clusters,
    }
}

/// Computes what a cleanup would delete without deleting anything.
pub async fn preview_cleanup(
    db: &PgPool,
    policy: Option<KeepPolicy>,
    match_mode: MatchMode,
) -> Result<CleanupPlan, HygieneError> {
    let policy = policy.ok_or(HygieneError::PolicyNotSpecified)?;
    let keys = repository::user::get_user_keys(db).await?;
    let plan = plan_cleanup(&keys, policy, match_mode);
    debug!(
        "cleanup preview: {} users, {} clusters",
        keys.len(),
        plan.clusters.len()
    );
    Ok(plan)
}

/// Deletes all but one user per duplicate cluster in a single transaction.
///
/// Every user row is locked for the duration of the run. Writers inserting new
/// users at the same time can still create duplicates this run does not see.
pub async fn run_cleanup(
    db: &PgPool,
    request: &CleanupRequest,
) -> Result<CleanupOutcome, HygieneError> {
    if !request.confirmed {
        return Err(HygieneError::ConfirmationRequired);
    }
    let policy = request.policy.ok_or(HygieneError::PolicyNotSpecified)?;

    let mut tx = db.begin().await?;
    let keys = repository::user::lock_user_keys(&mut tx).await?;
    let plan = plan_cleanup(&keys, policy, request.match_mode);
    let ids = plan.deleted_ids();

    let orphaned_profiles = repository::profile::count_profiles_of_users(&mut tx, &ids).await?;
    let deleted = repository::user::delete_users_by_ids(&mut tx, &ids).await?;
    if deleted != ids.len() as u64 {
        tx.rollback().await?;
        return Err(HygieneError::DeleteMismatch {
            expected: ids.len() as u64,
            actual: deleted,
        });
    }
    tx.commit().await?;

    for cluster in plan.clusters.iter() {
        info!("kept user {} deleted {:?}", cluster.kept, cluster.deleted);
    }
    info!(
        "cleanup {:?}/{:?} deleted {} users in {} clusters",
        policy,
        request.match_mode,
        deleted,
        plan.clusters.len()
    );
    if orphaned_profiles > 0 {
        warn!(
            "{} profiles now reference deleted users, rerun the orphaned profiles report",
            orphaned_profiles
        );
    }

    Ok(CleanupOutcome {
        plan,
        deleted,
        orphaned_profiles,
    })
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::{
        plan_cleanup, preview_cleanup, run_cleanup, CleanupRequest, DuplicateCluster,
        KeepPolicy, MatchMode,
    };
    use crate::{
        core::{
            error::HygieneError,
            test_utils::{insert_profile, insert_user, timestamp, user_ids},
        },
        factory::user::UserFactory,
        model::user::{User, UserKey},
        repository,
    };

    fn confirmed(policy: KeepPolicy) -> CleanupRequest {
        CleanupRequest {
            policy: Some(policy),
            match_mode: MatchMode::Any,
            confirmed: true,
        }
    }

    fn chain() -> Vec<UserKey> {
        vec![
            UserKey::new(1, "a", "a@x"),
            UserKey::new(2, "a", "b@x"),
            UserKey::new(3, "c", "b@x"),
            UserKey::new(4, "d", "d@x"),
        ]
    }

    #[test]
    fn test_plan_keep_oldest_and_newest() {
        let keys = vec![UserKey::new(1, "a", "a@x"), UserKey::new(2, "a", "b@x")];

        let oldest = plan_cleanup(&keys, KeepPolicy::Oldest, MatchMode::Any);
        let newest = plan_cleanup(&keys, KeepPolicy::Newest, MatchMode::Any);

        assert_eq!(
            oldest.clusters,
            vec![DuplicateCluster {
                kept: 1,
                deleted: vec![2]
            }]
        );
        assert_eq!(
            newest.clusters,
            vec![DuplicateCluster {
                kept: 2,
                deleted: vec![1]
            }]
        );
    }

    #[test]
    fn test_plan_clusters_transitively() {
        let plan = plan_cleanup(&chain(), KeepPolicy::Oldest, MatchMode::Any);
        assert_eq!(
            plan.clusters,
            vec![DuplicateCluster {
                kept: 1,
                deleted: vec![2, 3]
            }]
        );
        assert_eq!(plan.deleted_ids(), vec![2, 3]);
    }

    #[test]
    fn test_plan_match_both_ignores_partial_matches() {
        let plan = plan_cleanup(&chain(), KeepPolicy::Oldest, MatchMode::Both);
        assert!(plan.is_empty());

        let keys = vec![
            UserKey::new(9, "a", "a@x"),
            UserKey::new(3, "a", "a@x"),
            UserKey::new(5, "a", "b@x"),
        ];
        let plan = plan_cleanup(&keys, KeepPolicy::Newest, MatchMode::Both);
        assert_eq!(
            plan.clusters,
            vec![DuplicateCluster {
                kept: 9,
                deleted: vec![3]
            }]
        );
    }

    #[test]
    fn test_plan_is_exact_match() {
        let keys = vec![
            UserKey::new(1, "Alice", "alice@x"),
            UserKey::new(2, "alice", "ALICE@x"),
        ];
        assert!(plan_cleanup(&keys, KeepPolicy::Oldest, MatchMode::Any).is_empty());
    }

    #[test]
    fn test_plan_orders_clusters_by_survivor() {
        let keys = vec![
            UserKey::new(8, "z", "z@x"),
            UserKey::new(7, "z", "other@x"),
            UserKey::new(2, "b", "b@x"),
            UserKey::new(6, "q", "b@x"),
        ];
        let plan = plan_cleanup(&keys, KeepPolicy::Oldest, MatchMode::Any);
        let kept: Vec<i32> = plan.clusters.iter().map(|c| c.kept).collect();
        assert_eq!(kept, vec![2, 7]);
        assert_eq!(plan.deleted_ids(), vec![6, 8]);
    }

    #[sqlx::test(migrations = "fixtures/schema")]
    async fn test_cleanup_keep_oldest(pool: PgPool) -> anyhow::Result<()> {
        // Given
        insert_user(&pool, 1, "a", "a@x", Some(timestamp(1))).await?;
        insert_user(&pool, 2, "a", "b@x", Some(timestamp(2))).await?;

        // When
        let outcome = run_cleanup(&pool, &confirmed(KeepPolicy::Oldest)).await?;

        // Expect
        assert_eq!(outcome.deleted, 1);
        assert_eq!(user_ids(&pool).await?, vec![1]);
        Ok(())
    }

    #[sqlx::test(migrations = "fixtures/schema")]
    async fn test_cleanup_keep_newest(pool: PgPool) -> anyhow::Result<()> {
        // Given
        insert_user(&pool, 1, "a", "a@x", Some(timestamp(1))).await?;
        insert_user(&pool, 2, "a", "b@x", Some(timestamp(2))).await?;

        // When
        let outcome = run_cleanup(&pool, &confirmed(KeepPolicy::Newest)).await?;

        // Expect
        assert_eq!(outcome.deleted, 1);
        assert_eq!(user_ids(&pool).await?, vec![2]);
        Ok(())
    }

    #[sqlx::test(migrations = "fixtures/schema")]
    async fn test_cleanup_requires_confirmation(pool: PgPool) -> anyhow::Result<()> {
        // Given
        insert_user(&pool, 1, "a", "a@x", None).await?;
        insert_user(&pool, 2, "a", "a@x", None).await?;
        let request = CleanupRequest {
            policy: Some(KeepPolicy::Oldest),
            match_mode: MatchMode::Any,
            confirmed: false,
        };

        // When
        let res = run_cleanup(&pool, &request).await;

        // Expect
        assert!(matches!(res, Err(HygieneError::ConfirmationRequired)));
        assert_eq!(repository::user::count_users(&pool).await?, 2);
        Ok(())
    }

    #[sqlx::test(migrations = "fixtures/schema")]
    async fn test_cleanup_requires_policy(pool: PgPool) -> anyhow::Result<()> {
        // Given
        insert_user(&pool, 1, "a", "a@x", None).await?;
        insert_user(&pool, 2, "a", "a@x", None).await?;
        let request = CleanupRequest {
            policy: None,
            match_mode: MatchMode::Any,
            confirmed: true,
        };

        // When
        let res = run_cleanup(&pool, &request).await;
        let preview = preview_cleanup(&pool, None, MatchMode::Any).await;

        // Expect
        assert!(matches!(res, Err(HygieneError::PolicyNotSpecified)));
        assert!(matches!(preview, Err(HygieneError::PolicyNotSpecified)));
        assert_eq!(repository::user::count_users(&pool).await?, 2);
        Ok(())
    }

    #[sqlx::test(migrations = "fixtures/schema")]
    async fn test_cleanup_confirmation_checked_first(pool: PgPool) -> anyhow::Result<()> {
        let res = run_cleanup(&pool, &CleanupRequest::default()).await;
        assert!(matches!(res, Err(HygieneError::ConfirmationRequired)));
        Ok(())
    }

    #[sqlx::test(migrations = "fixtures/schema")]
    async fn test_cleanup_is_idempotent(pool: PgPool) -> anyhow::Result<()> {
        // Given
        insert_user(&pool, 1, "a", "a@x", None).await?;
        insert_user(&pool, 2, "a", "b@x", None).await?;
        insert_user(&pool, 3, "c", "b@x", None).await?;
        insert_user(&pool, 4, "d", "d@x", None).await?;

        // When
        let first = run_cleanup(&pool, &confirmed(KeepPolicy::Oldest)).await?;
        let second = run_cleanup(&pool, &confirmed(KeepPolicy::Oldest)).await?;

        // Expect
        assert_eq!(first.deleted, 2);
        assert_eq!(second.deleted, 0);
        assert!(second.plan.is_empty());
        assert_eq!(user_ids(&pool).await?, vec![1, 4]);
        Ok(())
    }

    #[sqlx::test(migrations = "fixtures/schema")]
    async fn test_cleanup_match_both(pool: PgPool) -> anyhow::Result<()> {
        // Given
        insert_user(&pool, 1, "a", "a@x", None).await?;
        insert_user(&pool, 2, "a", "b@x", None).await?;
        insert_user(&pool, 3, "a", "a@x", None).await?;
        let request = CleanupRequest {
            policy: Some(KeepPolicy::Oldest),
            match_mode: MatchMode::Both,
            confirmed: true,
        };

        // When
        let outcome = run_cleanup(&pool, &request).await?;

        // Expect
        assert_eq!(outcome.plan.deleted_ids(), vec![3]);
        assert_eq!(user_ids(&pool).await?, vec![1, 2]);
        Ok(())
    }

    #[sqlx::test(migrations = "fixtures/schema")]
    async fn test_cleanup_reports_new_orphans(pool: PgPool) -> anyhow::Result<()> {
        // Given
        insert_user(&pool, 1, "a", "a@x", None).await?;
        insert_user(&pool, 2, "a", "a@x", None).await?;
        insert_profile(&pool, 10, "First", Some(1)).await?;
        insert_profile(&pool, 20, "Second", Some(2)).await?;

        // When
        let outcome = run_cleanup(&pool, &confirmed(KeepPolicy::Oldest)).await?;

        // Expect
        assert_eq!(outcome.orphaned_profiles, 1);
        let profile_count = repository::profile::count_profiles(&pool).await?;
        assert_eq!(profile_count, 2);
        Ok(())
    }

    #[sqlx::test(migrations = "fixtures/schema")]
    async fn test_cleanup_rolls_back_on_failure(pool: PgPool) -> anyhow::Result<()> {
        // Given
        sqlx::query(
            "ALTER TABLE profiles ADD CONSTRAINT profiles_user_fk FOREIGN KEY (user_id) REFERENCES users (id)",
        )
        .execute(&pool)
        .await?;
        insert_user(&pool, 1, "a", "a@x", None).await?;
        insert_user(&pool, 2, "a", "a@x", None).await?;
        insert_user(&pool, 3, "b", "b@x", None).await?;
        insert_user(&pool, 4, "b", "b@x", None).await?;
        insert_profile(&pool, 40, "Blocker", Some(4)).await?;

        // When
        let res = run_cleanup(&pool, &confirmed(KeepPolicy::Oldest)).await;

        // Expect
        assert!(matches!(res, Err(HygieneError::Store(_))));
        assert_eq!(user_ids(&pool).await?, vec![1, 2, 3, 4]);
        Ok(())
    }

    #[sqlx::test(migrations = "fixtures/schema")]
    async fn test_preview_does_not_delete(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserFactory::new();
        factory.modified_many(|x, idx, _| User {
            id: idx as i32 + 1,
            username: "same".to_string(),
            email: format!("{}.{}", idx, x.email),
            created_at: x.created_at,
        });
        factory.generate_many(&pool, 4, ()).await?;

        // When
        let plan = preview_cleanup(&pool, Some(KeepPolicy::Newest), MatchMode::Any).await?;

        // Expect
        assert_eq!(
            plan.clusters,
            vec![DuplicateCluster {
                kept: 4,
                deleted: vec![1, 2, 3]
            }]
        );
        assert_eq!(user_ids(&pool).await?, vec![1, 2, 3, 4]);
        Ok(())
    }
}
