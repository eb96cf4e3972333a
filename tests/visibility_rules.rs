mod support;

use feedline::application::context::{FeedContext, Interrupted};
use feedline::application::visibility::VisibilityError;
use feedline::domain::entities::AccountRecord;
use feedline::domain::types::Visibility;
use support::{
    Harness, account, block, boost, follow, post, post_with, remote_account, reply, status_id,
};
use time::{Duration, OffsetDateTime};
use tokio_util::sync::CancellationToken;

const ALICE: &str = "01HACCOUNTALICE00000000000";
const BOB: &str = "01HACCOUNTBOB0000000000000";
const CAROL: &str = "01HACCOUNTCAROL00000000000";
const REMOTE: &str = "01HACCOUNTREMOTE0000000000";

fn harness() -> Harness {
    let harness = Harness::new();
    harness.accounts(&[ALICE, BOB, CAROL]);
    harness
}

async fn visible(harness: &Harness, viewer: Option<&AccountRecord>, n: usize) -> bool {
    let status = harness_status(harness, n).await;
    harness
        .services
        .visibility
        .status_visible(&FeedContext::new(), viewer, &status)
        .await
        .expect("visibility check")
}

async fn home_timelineable(harness: &Harness, owner: &str, n: usize) -> bool {
    let status = harness_status(harness, n).await;
    harness
        .services
        .visibility
        .status_home_timelineable(&FeedContext::new(), &account(owner), &status)
        .await
        .expect("home check")
}

async fn public_timelineable(harness: &Harness, n: usize) -> bool {
    let status = harness_status(harness, n).await;
    harness
        .services
        .visibility
        .status_public_timelineable(&FeedContext::new(), None, &status)
        .await
        .expect("public check")
}

async fn harness_status(
    harness: &Harness,
    n: usize,
) -> feedline::domain::entities::StatusRecord {
    use feedline::application::repos::StatusesRepo;
    harness
        .store
        .get_status(&status_id(n))
        .await
        .expect("status stored")
}

#[tokio::test]
async fn blocks_hide_posts_in_both_directions() {
    let harness = harness();
    harness.store.insert_block(block(ALICE, BOB));
    harness.statuses([post(1, ALICE), post(2, BOB), post(3, CAROL)]);

    assert!(!visible(&harness, Some(&account(BOB)), 1).await);
    assert!(!visible(&harness, Some(&account(ALICE)), 2).await);
    assert!(visible(&harness, Some(&account(ALICE)), 3).await);
    assert!(visible(&harness, Some(&account(BOB)), 3).await);
}

#[tokio::test]
async fn blocks_against_mentioned_accounts_hide_the_post() {
    let harness = harness();
    harness.store.insert_block(block(BOB, ALICE));
    let mut mentioning = post(1, CAROL);
    mentioning.mentions = vec![ALICE.to_string()];
    harness.statuses([mentioning]);

    assert!(!visible(&harness, Some(&account(BOB)), 1).await);
}

#[tokio::test]
async fn unauthenticated_viewers_only_see_public_posts() {
    let harness = harness();
    harness.statuses([
        post_with(1, ALICE, Visibility::Public),
        post_with(2, ALICE, Visibility::Unlocked),
        post_with(3, ALICE, Visibility::FollowersOnly),
    ]);

    assert!(visible(&harness, None, 1).await);
    assert!(!visible(&harness, None, 2).await);
    assert!(!visible(&harness, None, 3).await);
}

#[tokio::test]
async fn restricted_visibility_follows_the_social_graph() {
    let harness = harness();
    harness.store.insert_follow(follow(BOB, ALICE));
    let mut direct = post_with(3, ALICE, Visibility::Direct);
    direct.mentions = vec![CAROL.to_string()];
    harness.statuses([
        post_with(1, ALICE, Visibility::FollowersOnly),
        post_with(2, ALICE, Visibility::MutualsOnly),
        direct,
    ]);

    let bob = account(BOB);
    let carol = account(CAROL);
    assert!(visible(&harness, Some(&bob), 1).await);
    assert!(!visible(&harness, Some(&carol), 1).await);

    assert!(!visible(&harness, Some(&bob), 2).await);
    harness.store.insert_follow(follow(ALICE, BOB));
    harness.services.invalidate_requester(BOB);
    assert!(visible(&harness, Some(&bob), 2).await);

    assert!(!visible(&harness, Some(&bob), 3).await);
    assert!(visible(&harness, Some(&carol), 3).await);
    assert!(visible(&harness, Some(&account(ALICE)), 3).await);
}

#[tokio::test]
async fn decisions_are_cached_until_invalidated() {
    let harness = harness();
    harness.statuses([post_with(1, ALICE, Visibility::FollowersOnly)]);
    let bob = account(BOB);

    assert!(!visible(&harness, Some(&bob), 1).await);
    harness.store.insert_follow(follow(BOB, ALICE));
    assert!(!visible(&harness, Some(&bob), 1).await);

    assert_eq!(harness.services.visibility.cached_decisions(), 1);
    assert!(harness.services.visibility.invalidate_status(&status_id(1)) > 0);
    assert_eq!(harness.services.visibility.cached_decisions(), 0);
    assert!(visible(&harness, Some(&bob), 1).await);
}

#[tokio::test]
async fn unusable_authors_are_hidden() {
    let harness = harness();
    let mut suspended = account("01HACCOUNTSUSPENDED0000000");
    suspended.suspended = true;
    let mut unconfirmed = account("01HACCOUNTUNCONFIRMED00000");
    unconfirmed.confirmed = false;
    harness.store.insert_account(suspended.clone());
    harness.store.insert_account(unconfirmed.clone());
    harness.statuses([post(1, &suspended.id), post(2, &unconfirmed.id)]);

    let bob = account(BOB);
    assert!(!visible(&harness, Some(&bob), 1).await);
    assert!(!visible(&harness, Some(&bob), 2).await);
}

#[tokio::test]
async fn blocked_domains_cover_subdomains() {
    let harness = harness();
    harness
        .store
        .insert_account(remote_account(REMOTE, "eu.spam.example"));
    harness.store.block_domain("spam.example");
    let mut remote_post = post(1, REMOTE);
    remote_post.local = false;
    let mut mentioning = post(2, ALICE);
    mentioning.mentions = vec![REMOTE.to_string()];
    harness.statuses([remote_post, mentioning, post(3, ALICE)]);

    let bob = account(BOB);
    assert!(!visible(&harness, Some(&bob), 1).await);
    assert!(!visible(&harness, Some(&bob), 2).await);
    assert!(visible(&harness, Some(&bob), 3).await);
}

#[tokio::test]
async fn boosts_inherit_the_original_visibility() {
    let harness = harness();
    let original = post_with(1, CAROL, Visibility::FollowersOnly);
    harness.statuses([original.clone(), boost(2, ALICE, &original)]);

    assert!(!visible(&harness, Some(&account(BOB)), 2).await);
    harness.store.insert_follow(follow(BOB, CAROL));
    harness.services.invalidate_requester(BOB);
    assert!(visible(&harness, Some(&account(BOB)), 2).await);
}

#[tokio::test]
async fn pending_posts_are_limited_to_their_approvers() {
    let harness = harness();
    let parent = post(1, BOB);
    let mut pending = reply(2, ALICE, &parent, Visibility::Public);
    pending.pending_approval = true;
    harness.statuses([parent, pending]);

    assert!(visible(&harness, Some(&account(ALICE)), 2).await);
    assert!(visible(&harness, Some(&account(BOB)), 2).await);
    assert!(!visible(&harness, Some(&account(CAROL)), 2).await);
}

#[tokio::test]
async fn future_posts_never_reach_home_timelines() {
    let harness = harness();
    let mut future = post(1, ALICE);
    future.created_at = OffsetDateTime::now_utc() + Duration::hours(25);
    harness.statuses([future]);

    assert!(!home_timelineable(&harness, ALICE, 1).await);
}

#[tokio::test]
async fn home_timelines_need_a_follow_or_a_mention() {
    let harness = harness();
    let mut mention = post(2, CAROL);
    mention.mentions = vec![BOB.to_string()];
    harness.statuses([post(1, CAROL), mention]);

    assert!(!home_timelineable(&harness, BOB, 1).await);
    assert!(home_timelineable(&harness, BOB, 2).await);
    assert!(home_timelineable(&harness, CAROL, 1).await);
}

#[tokio::test]
async fn self_threads_reach_followers() {
    let harness = harness();
    harness.store.insert_follow(follow(BOB, ALICE));
    let root = post(1, ALICE);
    let continuation = reply(2, ALICE, &root, Visibility::Public);
    harness.statuses([root, continuation]);

    assert!(home_timelineable(&harness, BOB, 2).await);
    assert!(public_timelineable(&harness, 2).await);
}

#[tokio::test]
async fn unresolved_parents_are_retried_rather_than_cached() {
    let harness = harness();
    harness.store.insert_follow(follow(BOB, ALICE));
    let root = post(1, ALICE);
    let continuation = reply(2, ALICE, &root, Visibility::Public);
    harness.statuses([continuation]);

    assert!(!home_timelineable(&harness, BOB, 2).await);

    harness.statuses([root]);
    assert!(home_timelineable(&harness, BOB, 2).await);
}

#[tokio::test]
async fn cyclic_reply_chains_terminate() {
    let harness = harness();
    harness.store.insert_follow(follow(BOB, ALICE));
    let mut first = post(1, ALICE);
    let mut second = post(2, ALICE);
    first.in_reply_to_id = Some(second.id.clone());
    first.in_reply_to_uri = Some("https://example.test/2".to_string());
    first.in_reply_to_account_id = Some(ALICE.to_string());
    second.in_reply_to_id = Some(first.id.clone());
    second.in_reply_to_uri = Some("https://example.test/1".to_string());
    second.in_reply_to_account_id = Some(ALICE.to_string());
    harness.statuses([first, second]);

    assert!(!home_timelineable(&harness, BOB, 2).await);
    assert!(!public_timelineable(&harness, 2).await);
}

#[tokio::test]
async fn public_timelines_skip_boosts_and_foreign_replies() {
    let harness = harness();
    let parent = post(1, BOB);
    harness.statuses([
        parent.clone(),
        reply(2, ALICE, &parent, Visibility::Public),
        boost(3, ALICE, &parent),
        post_with(4, ALICE, Visibility::Unlocked),
        post(5, ALICE),
    ]);

    assert!(public_timelineable(&harness, 1).await);
    assert!(!public_timelineable(&harness, 2).await);
    assert!(!public_timelineable(&harness, 3).await);
    assert!(!public_timelineable(&harness, 4).await);
    assert!(public_timelineable(&harness, 5).await);
}

#[tokio::test]
async fn cancelled_contexts_stop_the_walk() {
    let harness = harness();
    harness.statuses([post(1, ALICE)]);
    let status = harness_status(&harness, 1).await;

    let token = CancellationToken::new();
    let ctx = FeedContext::with_cancellation(token.clone());
    token.cancel();
    let err = harness
        .services
        .visibility
        .status_visible(&ctx, Some(&account(BOB)), &status)
        .await
        .expect_err("cancelled");
    assert!(matches!(
        err,
        VisibilityError::Interrupted(Interrupted::Cancelled)
    ));
}
