//! Matching engine tests

use assert_matches::assert_matches;
use chrono::Duration;
use serial_test::serial;
use HelpChain::models::{CounterpartyDetails, HelpRole, HelpStatus, ManualMatchStatus, MatchedBy};
use HelpChain::services::CreateMatchCommand;
use HelpChain::{ErrorKind, HelpChainError};

use crate::helpers::{dollars, TestContext, OPERATOR_ID};
use crate::integration::matched_pair;

fn counterparty(name: &str) -> CounterpartyDetails {
    CounterpartyDetails {
        name: name.to_string(),
        phone: Some("+1 555 0100".to_string()),
        payment_method: Some("bank transfer".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
#[serial]
async fn test_auto_match_requires_operator() {
    let Some(ctx) = TestContext::new().await else { return };
    let err = ctx.services.matching_service.auto_match(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
#[serial]
async fn test_user_is_never_matched_with_themself() {
    let Some(ctx) = TestContext::new().await else { return };
    let package = ctx.package(100).await;
    let solo = ctx.user("Solo").await;

    ctx.offer(&solo, &package).await;
    let request = ctx.request(&solo, &package).await;

    let report = ctx.services.matching_service.auto_match(OPERATOR_ID).await.unwrap();
    assert!(report.created.is_empty());
    assert_eq!(ctx.activity(request.id).await.status, HelpStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_one_giver_serves_one_receiver_per_run() {
    let Some(ctx) = TestContext::new().await else { return };
    let package = ctx.package(100).await;
    let giver = ctx.user("Gil").await;
    let first = ctx.user("Fay").await;
    let second = ctx.user("Sam").await;

    ctx.offer(&giver, &package).await;
    ctx.offer(&first, &package).await;
    ctx.offer(&second, &package).await;
    let first_request = ctx.request(&first, &package).await;
    let second_request = ctx.request(&second, &package).await;

    let report = ctx.services.matching_service.auto_match(OPERATOR_ID).await.unwrap();

    // Fay waited longest and gets the oldest giver. Sam's only other option
    // is Fay's own offer, and Fay is already engaged in this run.
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].giver_id, giver.id);
    assert_eq!(report.created[0].receiver_id, first.id);
    assert_eq!(ctx.activity(first_request.id).await.status, HelpStatus::Matched);

    assert_eq!(ctx.activity(second_request.id).await.status, HelpStatus::Pending);
    let waiting = ctx.services.matching_service.pending_receivers().await.unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].owner_id, second.id);
}

#[tokio::test]
#[serial]
async fn test_operator_match_conflicts_with_live_match() {
    let Some(ctx) = TestContext::new().await else { return };
    let pair = matched_pair(&ctx).await;
    let package = ctx.package(100).await;
    let late = ctx.user("Lars").await;
    ctx.offer(&late, &package).await;
    let request = ctx.request(&late, &package).await;

    let err = ctx
        .services
        .matching_service
        .create_operator_match(OPERATOR_ID, pair.giver.id, late.id, request.id, dollars(100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(ctx.activity(request.id).await.status, HelpStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_operator_match_records_operator_and_deadline() {
    let Some(ctx) = TestContext::new().await else { return };
    let package = ctx.package(100).await;
    let giver = ctx.user("Gus").await;
    let receiver = ctx.user("Rin").await;
    let offer = ctx.offer(&giver, &package).await;

    // The operator may pair a receiver who holds no request of their own
    let created_at = ctx.now();
    let payment_match = ctx
        .services
        .matching_service
        .create_operator_match(OPERATOR_ID, giver.id, receiver.id, offer.id, dollars(80))
        .await
        .unwrap();

    assert_eq!(payment_match.matched_by(), MatchedBy::Operator(OPERATOR_ID));
    assert_eq!(payment_match.amount, dollars(80));
    assert_eq!(payment_match.help_activity_id, offer.id);
    assert_eq!(payment_match.counterpart_activity_id, None);
    assert_eq!(payment_match.payment_deadline, created_at + Duration::hours(6));
    assert_eq!(ctx.activity(offer.id).await.counterparty_id(), Some(receiver.id));
}

#[tokio::test]
#[serial]
async fn test_create_match_input_errors() {
    let Some(ctx) = TestContext::new().await else { return };
    let matching = &ctx.services.matching_service;
    let package = ctx.package(100).await;
    let giver = ctx.user("Gia").await;
    let receiver = ctx.user("Ron").await;
    let offer = ctx.offer(&giver, &package).await;

    let command = |giver_id, receiver_id, amount| CreateMatchCommand {
        giver_id,
        receiver_id,
        help_activity_id: offer.id,
        amount,
        matched_by: MatchedBy::Auto,
    };

    assert_matches!(
        matching.create_match(command(giver.id, receiver.id, dollars(0))).await,
        Err(HelpChainError::Validation { .. })
    );
    assert_matches!(
        matching.create_match(command(giver.id, giver.id, dollars(100))).await,
        Err(HelpChainError::Validation { .. })
    );
    assert_matches!(
        matching.create_match(command(giver.id, 31337, dollars(100))).await,
        Err(HelpChainError::NotFound { entity: "User", id: 31337 })
    );
    // The activity belongs to the giver, so naming the receiver as giver is refused
    assert_matches!(
        matching.create_match(command(receiver.id, giver.id, dollars(100))).await,
        Err(HelpChainError::PreconditionFailed(_))
    );
}

#[tokio::test]
#[serial]
async fn test_concurrent_pairings_of_one_giver_yield_one_match() {
    let Some(ctx) = TestContext::new().await else { return };
    let matching = ctx.services.matching_service.clone();
    let package = ctx.package(100).await;
    let giver = ctx.user("Gwen").await;
    let a = ctx.user("Ari").await;
    let b = ctx.user("Bea").await;

    ctx.offer(&giver, &package).await;
    for user in [&a, &b] {
        ctx.offer(user, &package).await;
    }
    let request_a = ctx.request(&a, &package).await;
    let request_b = ctx.request(&b, &package).await;

    let command = |receiver_id, help_activity_id| CreateMatchCommand {
        giver_id: giver.id,
        receiver_id,
        help_activity_id,
        amount: dollars(100),
        matched_by: MatchedBy::Auto,
    };

    let (first, second) = tokio::join!(
        matching.create_match(command(a.id, request_a.id)),
        matching.create_match(command(b.id, request_b.id)),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.kind() == ErrorKind::Conflict));
    assert_eq!(ctx.db.matches.count_live().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn test_manual_match_takes_user_out_of_pools() {
    let Some(ctx) = TestContext::new().await else { return };
    let matching = &ctx.services.matching_service;
    let package = ctx.package(100).await;
    let user = ctx.user("Mina").await;
    ctx.offer(&user, &package).await;

    let givers = matching.available_givers().await.unwrap();
    assert!(givers.iter().any(|a| a.owner_id == user.id));

    let manual = matching
        .create_manual_match(OPERATOR_ID, user.id, HelpRole::Giver, dollars(100), counterparty("Walk-in donor"))
        .await
        .unwrap();
    assert_eq!(manual.status, ManualMatchStatus::Active);
    assert_eq!(manual.matched_with_name, "Walk-in donor");
    assert_eq!(manual.created_by, OPERATOR_ID);

    let givers = matching.available_givers().await.unwrap();
    assert!(givers.iter().all(|a| a.owner_id != user.id));

    let completed = matching.complete_manual_match(OPERATOR_ID, manual.id).await.unwrap();
    assert_eq!(completed.status, ManualMatchStatus::Completed);
    let again = matching.complete_manual_match(OPERATOR_ID, manual.id).await.unwrap();
    assert_eq!(again.completed_at, completed.completed_at);

    let givers = matching.available_givers().await.unwrap();
    assert!(givers.iter().any(|a| a.owner_id == user.id));
    assert_eq!(matching.manual_matches(Some(ManualMatchStatus::Active)).await.unwrap().len(), 0);
    assert_eq!(matching.manual_matches(None).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn test_manual_match_validation_names_fields() {
    let Some(ctx) = TestContext::new().await else { return };
    let user = ctx.user("Kit").await;

    let err = ctx
        .services
        .matching_service
        .create_manual_match(OPERATOR_ID, user.id, HelpRole::Receiver, dollars(0), counterparty("  "))
        .await
        .unwrap_err();

    assert_matches!(err, HelpChainError::Validation { fields, .. } => {
        assert_eq!(fields, vec!["amount".to_string(), "matched_with_name".to_string()]);
    });
}

#[tokio::test]
#[serial]
async fn test_manual_match_blocks_direct_pairing() {
    let Some(ctx) = TestContext::new().await else { return };
    let matching = &ctx.services.matching_service;
    let package = ctx.package(100).await;
    let giver = ctx.user("Ines").await;
    let receiver = ctx.user("Tomas").await;
    ctx.offer(&giver, &package).await;
    ctx.offer(&receiver, &package).await;
    let request = ctx.request(&receiver, &package).await;

    let manual = matching
        .create_manual_match(OPERATOR_ID, giver.id, HelpRole::Giver, dollars(100), counterparty("Church fund"))
        .await
        .unwrap();

    let command = CreateMatchCommand {
        giver_id: giver.id,
        receiver_id: receiver.id,
        help_activity_id: request.id,
        amount: dollars(100),
        matched_by: MatchedBy::Auto,
    };
    assert_matches!(matching.create_match(command).await, Err(HelpChainError::Conflict(_)));
    assert_matches!(
        matching
            .create_operator_match(OPERATOR_ID, giver.id, receiver.id, request.id, dollars(100))
            .await,
        Err(HelpChainError::Conflict(_))
    );
    assert_eq!(ctx.database.count_records("payment_matches").await.unwrap(), 0);
    assert_eq!(ctx.activity(request.id).await.status, HelpStatus::Pending);

    matching.complete_manual_match(OPERATOR_ID, manual.id).await.unwrap();
    let payment_match = matching
        .create_operator_match(OPERATOR_ID, giver.id, receiver.id, request.id, dollars(100))
        .await
        .unwrap();
    assert_eq!(payment_match.giver_id, giver.id);
}

#[tokio::test]
#[serial]
async fn test_manual_match_is_one_active_obligation() {
    let Some(ctx) = TestContext::new().await else { return };
    let matching = &ctx.services.matching_service;
    let user = ctx.user("Odile").await;

    let first = matching
        .create_manual_match(OPERATOR_ID, user.id, HelpRole::Giver, dollars(100), counterparty("Neighbour"))
        .await
        .unwrap();
    assert_matches!(
        matching
            .create_manual_match(OPERATOR_ID, user.id, HelpRole::Giver, dollars(100), counterparty("Cousin"))
            .await,
        Err(HelpChainError::Conflict(_))
    );
    assert_eq!(matching.manual_matches(Some(ManualMatchStatus::Active)).await.unwrap().len(), 1);

    matching.complete_manual_match(OPERATOR_ID, first.id).await.unwrap();
    matching
        .create_manual_match(OPERATOR_ID, user.id, HelpRole::Giver, dollars(100), counterparty("Cousin"))
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_manual_match_refused_during_live_match() {
    let Some(ctx) = TestContext::new().await else { return };
    let matching = &ctx.services.matching_service;
    let pair = matched_pair(&ctx).await;

    for (user_id, role) in [(pair.giver.id, HelpRole::Giver), (pair.receiver.id, HelpRole::Receiver)] {
        let err = matching
            .create_manual_match(OPERATOR_ID, user_id, role, dollars(100), counterparty("Walk-in donor"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
    assert_eq!(ctx.database.count_records("manual_matches").await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn test_batch_limit_applies_to_auto_match_only() {
    let Some(ctx) = TestContext::with_settings(|s| s.engine.auto_match_batch_limit = 1).await else { return };
    let matching = &ctx.services.matching_service;
    let package = ctx.package(100).await;
    for name in ["Lea", "Omar"] {
        let user = ctx.user(name).await;
        ctx.offer(&user, &package).await;
        ctx.request(&user, &package).await;
    }

    assert_eq!(matching.pending_receivers().await.unwrap().len(), 2);
    assert_eq!(matching.available_givers().await.unwrap().len(), 2);

    let report = matching.auto_match(OPERATOR_ID).await.unwrap();
    assert_eq!(report.receivers_considered, 1);
    assert_eq!(report.givers_considered, 1);
}

#[tokio::test]
#[serial]
async fn test_banned_giver_left_out_of_pool() {
    let Some(ctx) = TestContext::new().await else { return };
    let package = ctx.package(100).await;
    let giver = ctx.user("Bram").await;
    ctx.offer(&giver, &package).await;

    ctx.services.ban_service.ban_user(OPERATOR_ID, giver.id, "chargeback").await.unwrap();

    let givers = ctx.services.matching_service.available_givers().await.unwrap();
    assert!(givers.is_empty());
}
