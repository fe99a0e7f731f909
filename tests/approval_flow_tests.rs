//! End-to-end approval flows at the service layer: security events open
//! per-project approvals, votes tally under the quorum rules, and
//! resolutions apply exactly once.

use vouchr::config::Config;
use vouchr::db::{Store, User};
use vouchr::domain::{AccountState, ApprovalStatus, MembershipStatus, Role, VoteKind};
use vouchr::services::{ApprovalError, SecurityEvent};
use vouchr::state::SharedState;

async fn spawn_state() -> SharedState {
    let store = Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("failed to open in-memory store");
    SharedState::with_store(Config::default(), store)
}

async fn add_user(store: &Store, name: &str) -> User {
    store
        .create_user(name, "password123")
        .await
        .expect("failed to create user")
}

/// One project with the affected user plus `peers` regular members, all
/// active. Returns (project_id, affected_user, peer users).
async fn seed_project(state: &SharedState, peers: usize) -> (i32, User, Vec<User>) {
    let store = &state.store;
    let project = store.create_project("atlas").await.unwrap();

    let affected = add_user(store, "affected").await;
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
async fn security_event_opens_one_approval_per_project() {
    let state = spawn_state().await;
    let store = &state.store;

    let user = add_user(store, "multi").await;
    let other = add_user(store, "other").await;
    for name in ["one", "two", "three"] {
        let project = store.create_project(name).await.unwrap();
        store
            .add_project_member(project.id, user.id, Role::Editor)
            .await
            .unwrap();
        store
            .add_project_member(project.id, other.id, Role::Editor)
            .await
            .unwrap();
    }

    let approvals = state
        .approval_service
        .open_for_event(user.id, SecurityEvent::PasswordChange, "corr-1")
        .await
        .unwrap();
    assert_eq!(approvals.len(), 3);

    let refreshed = store.get_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(refreshed.state, AccountState::PendingApproval);

    for membership in store.memberships_for_user(user.id).await.unwrap() {
        assert_eq!(membership.status, MembershipStatus::Pending);
    }

    // Re-opening for the same event is idempotent: same approval ids.
    let again = state
        .approval_service
        .open_for_event(user.id, SecurityEvent::PasswordChange, "corr-2")
        .await
        .unwrap();
    let mut first: Vec<i32> = approvals.iter().map(|a| a.id).collect();
    let mut second: Vec<i32> = again.iter().map(|a| a.id).collect();
    first.sort_unstable();
    second.sort_unstable();
    assert_eq!(first, second);
}

#[tokio::test]
async fn quorum_of_five_member_project_needs_two_approvals() {
    let state = spawn_state().await;

    // 5 members total, 4 eligible voters: ceil(0.33 * 4) = 2.
    let (_, affected, peers) = seed_project(&state, 4).await;

    let approvals = state
        .approval_service
        .open_for_event(affected.id, SecurityEvent::PasswordChange, "corr")
        .await
        .unwrap();
    let approval_id = approvals[0].id;

    let after_one = state
        .approval_service
        .cast_vote(approval_id, peers[0].id, VoteKind::Approve, None)
        .await
        .unwrap();
    assert_eq!(after_one.status, ApprovalStatus::Pending);

    let after_two = state
        .approval_service
        .cast_vote(approval_id, peers[1].id, VoteKind::Approve, None)
        .await
        .unwrap();
    assert_eq!(after_two.status, ApprovalStatus::Approved);

    let user = state
        .store
        .get_user_by_id(affected.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.state, AccountState::Active);

    // Votes after resolution bounce off.
    let err = state
        .approval_service
        .cast_vote(approval_id, peers[2].id, VoteKind::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::ApprovalNotPending));
}

#[tokio::test]
async fn regular_member_reject_only_withholds_approval() {
    let state = spawn_state().await;
    let (_, affected, peers) = seed_project(&state, 3).await;

    let approvals = state
        .approval_service
        .open_for_event(affected.id, SecurityEvent::PasswordChange, "corr")
        .await
        .unwrap();
    let approval_id = approvals[0].id;

    let after = state
        .approval_service
        .cast_vote(approval_id, peers[0].id, VoteKind::Reject, Some("no"))
        .await
        .unwrap();
    assert_eq!(after.status, ApprovalStatus::Pending);

    // The rejector changes their mind: the replacement counts.
    let after = state
        .approval_service
        .cast_vote(approval_id, peers[0].id, VoteKind::Approve, None)
        .await
        .unwrap();
    assert_eq!(after.status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn admin_vote_resolves_instantly_in_either_direction() {
    let state = spawn_state().await;
    let store = &state.store;

    let project = store.create_project("atlas").await.unwrap();
    let affected = add_user(store, "affected").await;
    let admin = add_user(store, "boss").await;
    let bystander = add_user(store, "bystander").await;
    store
        .add_project_member(project.id, affected.id, Role::Editor)
        .await
        .unwrap();
    store
        .add_project_member(project.id, admin.id, Role::Admin)
        .await
        .unwrap();
    store
        .add_project_member(project.id, bystander.id, Role::Editor)
        .await
        .unwrap();

    let approvals = state
        .approval_service
        .open_for_event(affected.id, SecurityEvent::PasswordReset, "corr")
        .await
        .unwrap();

    let resolved = state
        .approval_service
        .cast_vote(approvals[0].id, admin.id, VoteKind::Approve, None)
        .await
        .unwrap();
    assert_eq!(resolved.status, ApprovalStatus::Approved);

    // Second event, admin rejects: resolved rejected, membership stays
    // pending and the account stays suspended.
    let approvals = state
        .approval_service
        .open_for_event(affected.id, SecurityEvent::PasswordReset, "corr-2")
        .await
        .unwrap();

    let resolved = state
        .approval_service
        .cast_vote(approvals[0].id, admin.id, VoteKind::Reject, Some("nope"))
        .await
        .unwrap();
    assert_eq!(resolved.status, ApprovalStatus::Rejected);

    let membership = store
        .get_membership(project.id, affected.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.status, MembershipStatus::Pending);

    let user = store.get_user_by_id(affected.id).await.unwrap().unwrap();
    assert_eq!(user.state, AccountState::PendingApproval);
}

#[tokio::test]
async fn solo_project_has_no_self_approval_path() {
    let state = spawn_state().await;
    let store = &state.store;

    let project = store.create_project("lonely").await.unwrap();
    let user = add_user(store, "solo").await;
    store
        .add_project_member(project.id, user.id, Role::Admin)
        .await
        .unwrap();

    let approvals = state
        .approval_service
        .open_for_event(user.id, SecurityEvent::PasswordChange, "corr")
        .await
        .unwrap();

    let err = state
        .approval_service
        .cast_vote(approvals[0].id, user.id, VoteKind::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::SoloProjectNoSelfApprove));
}

#[tokio::test]
async fn solo_project_recovers_through_admin_override_without_votes() {
    let state = spawn_state().await;
    let store = &state.store;

    let project = store.create_project("lonely").await.unwrap();
    let user = add_user(store, "solo").await;
    store
        .add_project_member(project.id, user.id, Role::Admin)
        .await
        .unwrap();

    let reset = state.admin_service.reset_password("solo").await.unwrap();
    assert_eq!(reset.approvals_opened, 1);

    let pending = state.approval_service.my_pending(user.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    let approval_id = pending[0].id;

    let outcome = state.admin_service.approve("solo").await.unwrap();
    assert_eq!(outcome.approvals_resolved, 1);

    // The override resolves the approval directly; no vote rows exist.
    let approval = store.get_approval(approval_id).await.unwrap().unwrap();
    assert_eq!(approval.status, ApprovalStatus::Approved);
    assert!(store.approval_votes(approval_id).await.unwrap().is_empty());

    let refreshed = store.get_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(refreshed.state, AccountState::Active);
    let membership = store
        .get_membership(project.id, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.status, MembershipStatus::Active);
}

#[tokio::test]
async fn outsiders_and_pending_members_cannot_vote() {
    let state = spawn_state().await;
    let (project_id, affected, peers) = seed_project(&state, 2).await;
    let store = &state.store;

    let outsider = add_user(store, "outsider").await;

    let approvals = state
        .approval_service
        .open_for_event(affected.id, SecurityEvent::PasswordChange, "corr")
        .await
        .unwrap();
    let approval_id = approvals[0].id;

    let err = state
        .approval_service
        .cast_vote(approval_id, outsider.id, VoteKind::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::NotEligibleVoter));

    // A member whose own membership is pending cannot vote either.
    store
        .set_membership_status(project_id, peers[0].id, MembershipStatus::Pending)
        .await
        .unwrap();
    let err = state
        .approval_service
        .cast_vote(approval_id, peers[0].id, VoteKind::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::NotEligibleVoter));

    // The affected user themselves is never eligible.
    let err = state
        .approval_service
        .cast_vote(approval_id, affected.id, VoteKind::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::NotEligibleVoter));
}

#[tokio::test]
async fn memberless_user_is_not_suspended_by_security_event() {
    let state = spawn_state().await;
    let user = add_user(&state.store, "floating").await;

    let approvals = state
        .approval_service
        .open_for_event(user.id, SecurityEvent::PasswordChange, "corr")
        .await
        .unwrap();
    assert!(approvals.is_empty());

    let refreshed = state.store.get_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(refreshed.state, AccountState::Active);
}

#[tokio::test]
async fn admin_override_bypasses_quorum() {
    let state = spawn_state().await;
    let (_, affected, _) = seed_project(&state, 4).await;

    state
        .approval_service
        .open_for_event(affected.id, SecurityEvent::PasswordReset, "corr")
        .await
        .unwrap();

    let outcome = state.admin_service.approve("affected").await.unwrap();
    assert_eq!(outcome.previous_state, AccountState::PendingApproval);
    assert_eq!(outcome.approvals_resolved, 1);

    let user = state
        .store
        .get_user_by_id(affected.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.state, AccountState::Active);

    for membership in state.store.memberships_for_user(affected.id).await.unwrap() {
        assert_eq!(membership.status, MembershipStatus::Active);
    }
}

#[tokio::test]
async fn admin_reset_issues_temp_password_and_bumps_token_version() {
    let state = spawn_state().await;
    let (_, affected, _) = seed_project(&state, 2).await;

    let outcome = state.admin_service.reset_password("affected").await.unwrap();
    assert_eq!(outcome.temp_password.len(), 24);
    assert_eq!(outcome.token_version_after, outcome.token_version_before + 1);
    assert_eq!(outcome.approvals_opened, 1);

    let user = state
        .store
        .get_user_by_id(affected.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.state, AccountState::PendingApproval);
    assert!(user.must_change_password);

    let ok = state
        .store
        .verify_user_password("affected", &outcome.temp_password)
        .await
        .unwrap();
    assert!(ok);
}

#[tokio::test]
async fn admin_revoke_blocks_login_and_invalidates_sessions() {
    let state = spawn_state().await;
    let (_, affected, _) = seed_project(&state, 2).await;

    let before = state
        .auth_service
        .login("affected", "password123")
        .await
        .unwrap();

    let outcome = state.admin_service.revoke("affected").await.unwrap();
    assert_eq!(outcome.token_version_after, outcome.token_version_before + 1);

    let err = state
        .auth_service
        .login("affected", "password123")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ACCOUNT_REVOKED");

    // Outstanding credentials are dead too.
    let err = state
        .auth_service
        .validate(&before.credential)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ACCOUNT_REVOKED");

    let user = state
        .store
        .get_user_by_id(affected.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.state, AccountState::Revoked);
}

#[tokio::test]
async fn audit_chain_stays_intact_across_a_full_flow() {
    let state = spawn_state().await;
    let (_, affected, peers) = seed_project(&state, 2).await;

    let approvals = state
        .approval_service
        .open_for_event(affected.id, SecurityEvent::PasswordChange, "corr")
        .await
        .unwrap();
    state
        .approval_service
        .cast_vote(approvals[0].id, peers[0].id, VoteKind::Approve, None)
        .await
        .unwrap();

    let entries = state.store.audit_chain().await.unwrap();
    assert!(!entries.is_empty());
    assert!(vouchr::domain::verify_chain(&entries).is_ok());
}
