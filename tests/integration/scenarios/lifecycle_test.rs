//! Full lifecycle: registration, matching, settlement, escalation, maturity

use assert_matches::assert_matches;
use chrono::Duration;
use serial_test::serial;
use HelpChain::models::{HelpStatus, MatchStatus, PackageStatus};
use HelpChain::HelpChainError;

use crate::helpers::{dollars, TestContext, OPERATOR_ID};
use crate::integration::matched_pair;

#[tokio::test]
#[serial]
async fn test_auto_match_pairs_giver_with_waiting_receiver() {
    let Some(ctx) = TestContext::new().await else { return };
    let matching = &ctx.services.matching_service;

    let package = ctx.package(100).await;
    let giver = ctx.user("Grace").await;
    let giver_offer = ctx.offer(&giver, &package).await;

    // Nobody is waiting yet
    let report = matching.auto_match(OPERATOR_ID).await.unwrap();
    assert!(report.created.is_empty());
    assert_eq!(ctx.activity(giver_offer.id).await.status, HelpStatus::Pending);

    let receiver = ctx.user("Rafael").await;
    ctx.offer(&receiver, &package).await;
    let request = ctx.request(&receiver, &package).await;

    let matched_at = ctx.now();
    let report = matching.auto_match(OPERATOR_ID).await.unwrap();
    assert_eq!(report.created.len(), 1);
    assert!(report.skipped.is_empty());

    let payment_match = &report.created[0];
    assert_eq!(payment_match.giver_id, giver.id);
    assert_eq!(payment_match.receiver_id, receiver.id);
    assert_eq!(payment_match.amount, dollars(100));
    assert_eq!(payment_match.status, MatchStatus::Pending);
    assert_eq!(payment_match.payment_deadline, matched_at + Duration::hours(6));
    assert_eq!(payment_match.help_activity_id, request.id);
    assert_eq!(payment_match.counterpart_activity_id, Some(giver_offer.id));

    let request = ctx.activity(request.id).await;
    let offer = ctx.activity(giver_offer.id).await;
    assert_eq!(request.status, HelpStatus::Matched);
    assert_eq!(offer.status, HelpStatus::Matched);
    assert_eq!(request.counterparty_id(), Some(giver.id));
    assert_eq!(offer.counterparty_id(), Some(receiver.id));
    assert_eq!(request.matched_at, Some(matched_at));
}

#[tokio::test]
#[serial]
async fn test_giver_confirms_then_operator_settles() {
    let Some(ctx) = TestContext::new().await else { return };
    let settlement = &ctx.services.settlement_service;
    let pair = matched_pair(&ctx).await;

    let sent = settlement
        .confirm_sent(pair.payment_match.id, pair.giver.id)
        .await
        .unwrap();
    assert_eq!(sent.status, MatchStatus::AwaitingConfirmation);
    assert_eq!(ctx.activity(pair.giver_offer.id).await.status, HelpStatus::Active);

    ctx.advance(Duration::hours(1));
    let completed = settlement
        .operator_confirm(OPERATOR_ID, pair.payment_match.id)
        .await
        .unwrap();
    assert_eq!(completed.status, MatchStatus::Completed);
    assert_eq!(completed.completed_at, Some(ctx.now()));

    assert_eq!(ctx.activity(pair.giver_offer.id).await.status, HelpStatus::Completed);
    assert_eq!(ctx.activity(pair.receiver_request.id).await.status, HelpStatus::Completed);
}

#[tokio::test]
#[serial]
async fn test_missed_deadline_surfaces_and_operator_bans() {
    let Some(ctx) = TestContext::new().await else { return };
    let pair = matched_pair(&ctx).await;
    let deadline = pair.payment_match.payment_deadline;

    ctx.advance(Duration::hours(7));

    let view = ctx
        .services
        .deadline_monitor
        .match_status(pair.payment_match.id)
        .await
        .unwrap();
    assert!(view.deadline_status.overdue);
    assert_eq!(view.payment_match.payment_deadline, deadline);
    assert_eq!(view.payment_match.status, MatchStatus::Pending);

    let overdue = ctx.services.deadline_monitor.overdue_matches().await.unwrap();
    assert_eq!(overdue.len(), 1);

    let bans = &ctx.services.ban_service;
    let ban = bans
        .ban_user(OPERATOR_ID, pair.giver.id, "missed deadline")
        .await
        .unwrap();
    assert!(ban.is_active);
    assert_eq!(ban.banned_by, OPERATOR_ID);

    assert_matches!(
        bans.ban_user(OPERATOR_ID, pair.giver.id, "missed deadline").await,
        Err(HelpChainError::Conflict(_))
    );

    // The match is left for audit
    let view = ctx
        .services
        .deadline_monitor
        .match_status(pair.payment_match.id)
        .await
        .unwrap();
    assert_eq!(view.payment_match.status, MatchStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_package_approve_extend_reset() {
    let Some(ctx) = TestContext::new().await else { return };
    let maturity = &ctx.services.maturity_service;

    let package = ctx.package(100).await;
    let user = ctx.user("Uma").await;
    let subscription = maturity.subscribe(user.id, package.id).await.unwrap();
    assert_eq!(subscription.status, PackageStatus::Pending);

    let t = ctx.now();
    let approved = maturity
        .approve(OPERATOR_ID, subscription.id, t + Duration::days(15))
        .await
        .unwrap();
    assert!(approved.admin_approved);
    assert_eq!(approved.status, PackageStatus::Active);
    assert_eq!(approved.maturity_date, Some(t + Duration::days(15)));

    let extended = maturity
        .extend(OPERATOR_ID, subscription.id, t + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(extended.extended_count, 1);
    assert_eq!(extended.maturity_date, Some(t + Duration::days(30)));

    let reset = maturity.reset(OPERATOR_ID, subscription.id).await.unwrap();
    assert_eq!(reset.status, PackageStatus::Pending);
    assert!(!reset.admin_approved);
    assert_eq!(reset.maturity_date, None);
    assert_eq!(reset.extended_count, 1);
}
