//! Recovery intent flows: initiation, trusted-voter quorum, lazy expiry
//! and one-shot password reset.

use vouchr::config::Config;
use vouchr::db::{Store, User};
use vouchr::domain::{AccountState, RecoveryStatus, Role, VoteKind};
use vouchr::services::RecoveryError;
use vouchr::state::SharedState;

async fn spawn_state_with(config: Config) -> SharedState {
    let store = Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("failed to open in-memory store");
    SharedState::with_store(config, store)
}

async fn spawn_state() -> SharedState {
    spawn_state_with(Config::default()).await
}

async fn add_user(store: &Store, name: &str) -> User {
    store
        .create_user(name, "password123")
        .await
        .expect("failed to create user")
}

/// One project: the affected user plus `peers` active regular members.
async fn seed_project(state: &SharedState, peers: usize) -> (i32, User, Vec<User>) {
    let store = &state.store;
    let project = store.create_project("atlas").await.unwrap();

    let affected = add_user(store, "locked-out").await;
    store
        .add_project_member(project.id, affected.id, Role::Editor)
        .await
        .unwrap();

    let mut members = Vec::new();
    for i in 0..peers {
        let user = add_user(store, &format!("peer{i}")).await;
        store
            .add_project_member(project.id, user.id, Role::Editor)
            .await
            .unwrap();
        members.push(user);
    }

    (project.id, affected, members)
}

#[tokio::test]
async fn initiate_computes_required_votes_from_voter_pool() {
    let state = spawn_state().await;
    let (_, _, _) = seed_project(&state, 4).await;

    let intent = state.recovery_service.initiate("locked-out").await.unwrap();
    assert_eq!(intent.status, RecoveryStatus::Pending);
    // ceil(0.33 * 4) = 2
    assert_eq!(intent.required_approvals, 2);
    assert_eq!(intent.approvals_count, 0);
}

#[tokio::test]
async fn unknown_username_gets_unresolvable_intent() {
    let state = spawn_state().await;
    let (_, _, peers) = seed_project(&state, 2).await;

    let intent = state.recovery_service.initiate("ghost").await.unwrap();
    assert_eq!(intent.status, RecoveryStatus::Pending);
    assert_eq!(intent.required_approvals, 1);

    // Even a genuinely trusted member cannot vote it through.
    let err = state
        .recovery_service
        .vote(&intent.token, peers[0].id, VoteKind::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::NotEligibleVoter));
}

#[tokio::test]
async fn quorum_votes_approve_then_reset_reenters_event_path() {
    let state = spawn_state().await;
    let (_, affected, peers) = seed_project(&state, 4).await;

    let intent = state.recovery_service.initiate("locked-out").await.unwrap();

    let after_one = state
        .recovery_service
        .vote(&intent.token, peers[0].id, VoteKind::Approve, None)
        .await
        .unwrap();
    assert_eq!(after_one.status, RecoveryStatus::Pending);
    assert_eq!(after_one.approvals_count, 1);

    let after_two = state
        .recovery_service
        .vote(&intent.token, peers[1].id, VoteKind::Approve, None)
        .await
        .unwrap();
    assert_eq!(after_two.status, RecoveryStatus::Approved);

    let before = state
        .store
        .get_user_by_id(affected.id)
        .await
        .unwrap()
        .unwrap();

    state
        .recovery_service
        .reset_password(&intent.token, "fresh-password-1")
        .await
        .unwrap();

    // New password is live, token version bumped, intent consumed.
    assert!(
        state
            .store
            .verify_user_password("locked-out", "fresh-password-1")
            .await
            .unwrap()
    );
    let after = state
        .store
        .get_user_by_id(affected.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.token_version, before.token_version + 1);
    assert_eq!(after.state, AccountState::PendingApproval);

    let consumed = state.recovery_service.status(&intent.token).await.unwrap();
    assert_eq!(consumed.status, RecoveryStatus::Done);

    // The token is one-shot.
    let err = state
        .recovery_service
        .reset_password(&intent.token, "another-password-2")
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::NotApproved));
}

#[tokio::test]
async fn replaced_vote_does_not_double_count() {
    let state = spawn_state().await;
    let (_, _, peers) = seed_project(&state, 4).await;

    let intent = state.recovery_service.initiate("locked-out").await.unwrap();

    state
        .recovery_service
        .vote(&intent.token, peers[0].id, VoteKind::Approve, None)
        .await
        .unwrap();
    let after = state
        .recovery_service
        .vote(&intent.token, peers[0].id, VoteKind::Approve, Some("still yes"))
        .await
        .unwrap();

    assert_eq!(after.approvals_count, 1);
    assert_eq!(after.status, RecoveryStatus::Pending);
}

#[tokio::test]
async fn affected_user_is_not_in_their_own_pool() {
    let state = spawn_state().await;
    let (_, affected, _) = seed_project(&state, 2).await;

    let intent = state.recovery_service.initiate("locked-out").await.unwrap();

    let err = state
        .recovery_service
        .vote(&intent.token, affected.id, VoteKind::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::NotEligibleVoter));
}

#[tokio::test]
async fn trusted_admin_resolves_instantly() {
    let state = spawn_state().await;
    let (project_id, _, _) = seed_project(&state, 3).await;

    let store = &state.store;
    let admin = add_user(store, "overseer").await;
    store
        .add_project_member(project_id, admin.id, Role::Admin)
        .await
        .unwrap();

    let intent = state.recovery_service.initiate("locked-out").await.unwrap();
    let resolved = state
        .recovery_service
        .vote(&intent.token, admin.id, VoteKind::Reject, Some("suspicious"))
        .await
        .unwrap();
    assert_eq!(resolved.status, RecoveryStatus::Rejected);

    let err = state
        .recovery_service
        .reset_password(&intent.token, "fresh-password-1")
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::Rejected));
}

#[tokio::test]
async fn expired_intent_rejects_votes_and_resets() {
    let mut config = Config::default();
    // Intents are born expired; exercises the lazy expiry on read.
    config.recovery.ttl_hours = -1;
    let state = spawn_state_with(config).await;
    let (_, _, peers) = seed_project(&state, 2).await;

    let intent = state.recovery_service.initiate("locked-out").await.unwrap();

    let refreshed = state.recovery_service.status(&intent.token).await.unwrap();
    assert_eq!(refreshed.status, RecoveryStatus::Expired);

    let err = state
        .recovery_service
        .vote(&intent.token, peers[0].id, VoteKind::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::Expired));

    let err = state
        .recovery_service
        .reset_password(&intent.token, "fresh-password-1")
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::Expired));
}

/// Backdate an intent's deadline so the lazy expiry fires on the next
/// read.
async fn push_deadline_into_the_past(state: &SharedState, token: &str) {
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, sea_query::Expr};
    use vouchr::entities::recovery_intents;

    let past = (chrono::Utc::now() - chrono::Duration::hours(2)).to_rfc3339();
    recovery_intents::Entity::update_many()
        .col_expr(recovery_intents::Column::ExpiresAt, Expr::value(past))
        .filter(recovery_intents::Column::Token.eq(token))
        .exec(&state.store.conn)
        .await
        .unwrap();
}

#[tokio::test]
async fn approved_intent_expires_if_never_consumed() {
    let state = spawn_state().await;
    let (_, _, peers) = seed_project(&state, 4).await;

    let intent = state.recovery_service.initiate("locked-out").await.unwrap();

    for peer in &peers[..2] {
        state
            .recovery_service
            .vote(&intent.token, peer.id, VoteKind::Approve, None)
            .await
            .unwrap();
    }
    let approved = state.recovery_service.status(&intent.token).await.unwrap();
    assert_eq!(approved.status, RecoveryStatus::Approved);

    push_deadline_into_the_past(&state, &intent.token).await;

    // Quorum does not keep a token alive past its deadline.
    let refreshed = state.recovery_service.status(&intent.token).await.unwrap();
    assert_eq!(refreshed.status, RecoveryStatus::Expired);

    let err = state
        .recovery_service
        .reset_password(&intent.token, "fresh-password-1")
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::Expired));
}

#[tokio::test]
async fn short_password_is_rejected_before_touching_the_intent() {
    let state = spawn_state().await;
    seed_project(&state, 2).await;

    let intent = state.recovery_service.initiate("locked-out").await.unwrap();

    let err = state
        .recovery_service
        .reset_password(&intent.token, "short")
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::Validation(_)));
}
