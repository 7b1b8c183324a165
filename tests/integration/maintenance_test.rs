//! Operator maintenance and read-model tests

use assert_matches::assert_matches;
use chrono::Duration;
use serial_test::serial;
use HelpChain::database::EngineStats;
use HelpChain::models::{HelpParties, HelpRole, HelpStatus, MatchStatus};
use HelpChain::HelpChainError;

use crate::helpers::{TestContext, OPERATOR_ID};
use crate::integration::matched_pair;

#[tokio::test]
#[serial]
async fn test_payout_state_for_both_sides() {
    let Some(ctx) = TestContext::new().await else { return };
    let pair = matched_pair(&ctx).await;
    ctx.advance(Duration::hours(2));

    let payouts = &ctx.services.payout_service;

    let receiver_view = payouts.user_payout_state(pair.receiver.id).await.unwrap();
    assert!(!receiver_view.banned);
    assert!(receiver_view.offer.is_some());
    assert_eq!(receiver_view.request.as_ref().map(|a| a.id), Some(pair.receiver_request.id));
    let live = receiver_view.live_match.expect("receiver should see the live match");
    assert_eq!(live.role, HelpRole::Receiver);
    assert_eq!(live.counterparty.id, pair.giver.id);
    assert_eq!(live.counterparty.name, "Grace");
    assert_eq!(live.deadline_status.time_remaining, Duration::hours(4));
    assert!(!live.deadline_status.overdue);

    let giver_view = payouts.user_payout_state(pair.giver.id).await.unwrap();
    assert!(giver_view.request.is_none());
    let live = giver_view.live_match.expect("giver should see the live match");
    assert_eq!(live.role, HelpRole::Giver);
    assert_eq!(live.counterparty.id, pair.receiver.id);
    assert_eq!(live.payment_match.status, MatchStatus::Pending);

    assert_matches!(
        payouts.user_payout_state(8080).await,
        Err(HelpChainError::NotFound { entity: "User", id: 8080 })
    );
}

#[tokio::test]
#[serial]
async fn test_engine_stats() {
    let Some(ctx) = TestContext::new().await else { return };
    let pair = matched_pair(&ctx).await;

    let package = ctx.package(50).await;
    let waiting = ctx.user("Wes").await;
    ctx.offer(&waiting, &package).await;
    ctx.request(&waiting, &package).await;

    ctx.services
        .ban_service
        .ban_user(OPERATOR_ID, pair.giver.id, "missed deadline")
        .await
        .unwrap();
    ctx.advance(Duration::hours(7));

    // Rafael's own offer and Wes's offer and request are pending
    let stats = ctx.services.engine_stats().await.unwrap();
    assert_eq!(
        stats,
        EngineStats {
            pending_receivers: 1,
            pending_givers: 2,
            live_matches: 1,
            overdue_matches: 1,
            active_bans: 1,
        }
    );
}

#[tokio::test]
#[serial]
async fn test_purge_user_removes_every_dependent_row() {
    let Some(ctx) = TestContext::new().await else { return };
    let pair = matched_pair(&ctx).await;
    let giver = pair.giver.id;

    let package = ctx.package(100).await;
    let subscription = ctx.services.maturity_service.subscribe(giver, package.id).await.unwrap();
    ctx.services.ban_service.ban_user(OPERATOR_ID, giver, "closing account").await.unwrap();

    assert_matches!(
        ctx.services.purge_user(pair.receiver.id, giver).await,
        Err(HelpChainError::Unauthorized(_))
    );

    let removed = ctx.services.purge_user(OPERATOR_ID, giver).await.unwrap();
    assert!(removed >= 5);

    assert!(ctx.db.users.find_by_id(giver).await.unwrap().is_none());
    assert!(ctx.db.user_packages.find_by_id(subscription.id).await.unwrap().is_none());
    assert_eq!(ctx.database.count_records("payment_matches").await.unwrap(), 0);
    assert_eq!(ctx.database.count_records("banned_accounts").await.unwrap(), 0);

    // The receiver and their own rows are untouched
    assert!(ctx.db.users.find_by_id(pair.receiver.id).await.unwrap().is_some());
    assert_eq!(
        ctx.services.obligation_service.open_activities(pair.receiver.id).await.unwrap().len(),
        2
    );

    // Their request lost its match and is back in the pool
    let request = ctx.activity(pair.receiver_request.id).await;
    assert_eq!(request.status, HelpStatus::Pending);
    assert_eq!(request.parties, HelpParties::Request { receiver_id: pair.receiver.id });
    assert_eq!(request.matched_at, None);
    assert_eq!(request.payment_deadline, None);

    let pool = ctx.services.matching_service.pending_receivers().await.unwrap();
    assert!(pool.iter().any(|a| a.id == pair.receiver_request.id));
}

#[tokio::test]
#[serial]
async fn test_purge_unknown_user() {
    let Some(ctx) = TestContext::new().await else { return };

    assert_matches!(
        ctx.services.purge_user(OPERATOR_ID, 4040).await,
        Err(HelpChainError::NotFound { entity: "User", id: 4040 })
    );
}

#[tokio::test]
#[serial]
async fn test_health_check() {
    let Some(ctx) = TestContext::new().await else { return };

    let health = ctx.services.health_check().await;
    assert!(health.is_healthy(), "issues: {:?}", health.get_issues());
}
