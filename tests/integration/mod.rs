//! Integration tests module
//!
//! Organized by engine component, plus the end-to-end scenarios.

pub mod maintenance_test;
pub mod matching_test;

use crate::helpers::{TestContext, OPERATOR_ID};
use HelpChain::models::{HelpActivity, PaymentMatch, User};

/// A giver and a receiver paired by one auto-match run
pub struct MatchedPair {
    pub giver: User,
    pub receiver: User,
    pub giver_offer: HelpActivity,
    pub receiver_request: HelpActivity,
    pub payment_match: PaymentMatch,
}

pub async fn matched_pair(ctx: &TestContext) -> MatchedPair {
    let package = ctx.package(100).await;
    let giver = ctx.user("Grace").await;
    let receiver = ctx.user("Rafael").await;

    let giver_offer = ctx.offer(&giver, &package).await;
    ctx.offer(&receiver, &package).await;
    let receiver_request = ctx.request(&receiver, &package).await;

    let report = ctx
        .services
        .matching_service
        .auto_match(OPERATOR_ID)
        .await
        .expect("auto-match failed");
    assert_eq!(report.created.len(), 1, "expected exactly one match");
    let payment_match = report.created.into_iter().next().unwrap();

    MatchedPair {
        giver,
        receiver,
        giver_offer,
        receiver_request,
        payment_match,
    }
}
