//! Quotation lifecycle tests
//!
//! Issue, reserve, pay, expire, dispatch and delete against the in-memory
//! repositories, including the concurrent reservation race.

mod common;

use chrono::Duration;
use common::{dec, test_app};
use backoffice::services::payment::RecordPaymentInput;
use backoffice::services::quotation::{
    IssueLineInput, IssueQuotationInput, ReviseQuotationInput, LineDiscountInput,
};
use backoffice::services::PaymentService;
use backoffice::AppError;
use shared::{BundleState, PaymentMethod, QuotationState};
use tokio_test::assert_ok;

fn payment(amount: &str) -> RecordPaymentInput {
    RecordPaymentInput {
        amount: dec(amount),
        method: PaymentMethod::DigitalWalletA,
        voucher_url: None,
        notes: None,
    }
}

// ============================================================================
// Issue
// ============================================================================

#[tokio::test]
async fn test_issue_computes_totals() {
    let app = test_app();
    let a = app.available_bundle("500").await;
    let b = app.available_bundle("500").await;

    let quotation = app.issue(&[(&a, "0"), (&b, "10")], "5").await;

    assert_eq!(quotation.state, QuotationState::Issued);
    assert_eq!(quotation.original_total, dec("1000"));
    assert_eq!(quotation.total, dec("902.50"));
    assert_eq!(quotation.lines[0].subtotal, dec("500.00"));
    assert_eq!(quotation.lines[1].subtotal, dec("450.00"));
    assert!(quotation.expires_at.is_none());
    assert!(shared::validate_tracking_code(&quotation.tracking_code).is_ok());

    // Issuing has no bundle side effect
    assert_eq!(app.bundle(a.id).await.state, BundleState::Available);
}

#[tokio::test]
async fn test_issue_without_lines_fails() {
    let app = test_app();
    let err = app
        .quotations()
        .issue(IssueQuotationInput {
            customer_name: "Rosa".to_string(),
            customer_phone: None,
            customer_email: None,
            list_id: None,
            global_discount: dec("0"),
            lines: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyQuotation));
}

#[tokio::test]
async fn test_issue_rejects_out_of_range_discount() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let err = app
        .quotations()
        .issue(IssueQuotationInput {
            customer_name: "Rosa".to_string(),
            customer_phone: None,
            customer_email: None,
            list_id: None,
            global_discount: dec("0"),
            lines: vec![IssueLineInput {
                bundle_id: a.id,
                unit_price: None,
                line_discount: dec("120"),
            }],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidDiscount(_)));
}

#[tokio::test]
async fn test_issue_rejects_sub_cent_price() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let err = app
        .quotations()
        .issue(IssueQuotationInput {
            customer_name: "Rosa".to_string(),
            customer_phone: None,
            customer_email: None,
            list_id: None,
            global_discount: dec("0"),
            lines: vec![IssueLineInput {
                bundle_id: a.id,
                unit_price: Some(dec("10.005")),
                line_discount: dec("10"),
            }],
        })
        .await
        .unwrap_err();
    match err {
        AppError::Validation { field, .. } => assert_eq!(field, "precio_unitario"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_issue_rejects_sub_cent_discount() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let err = app
        .quotations()
        .issue(IssueQuotationInput {
            customer_name: "Rosa".to_string(),
            customer_phone: None,
            customer_email: None,
            list_id: None,
            global_discount: dec("2.505"),
            lines: vec![IssueLineInput {
                bundle_id: a.id,
                unit_price: None,
                line_discount: dec("0"),
            }],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidDiscount(_)));
}

#[tokio::test]
async fn test_blank_email_is_treated_as_absent() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let b = app.available_bundle("100").await;
    let input = |bundle_id, email: &str| IssueQuotationInput {
        customer_name: "Rosa".to_string(),
        customer_phone: Some(String::new()),
        customer_email: Some(email.to_string()),
        list_id: None,
        global_discount: dec("0"),
        lines: vec![IssueLineInput {
            bundle_id,
            unit_price: None,
            line_discount: dec("0"),
        }],
    };

    let quotation = app.quotations().issue(input(a.id, "  ")).await.unwrap();
    assert_eq!(quotation.customer_email, None);
    assert_eq!(quotation.customer_phone, None);

    let err = app
        .quotations()
        .issue(input(b.id, "not-an-email"))
        .await
        .unwrap_err();
    match err {
        AppError::Validation { field, .. } => assert_eq!(field, "cliente_email"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_issue_rejects_duplicate_bundle() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let line = |discount: &str| IssueLineInput {
        bundle_id: a.id,
        unit_price: None,
        line_discount: dec(discount),
    };
    let err = app
        .quotations()
        .issue(IssueQuotationInput {
            customer_name: "Rosa".to_string(),
            customer_phone: None,
            customer_email: None,
            list_id: None,
            global_discount: dec("0"),
            lines: vec![line("0"), line("5")],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn test_issue_retries_tracking_code_collision() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let b = app.available_bundle("100").await;

    app.tokens.queue_tracking(&["PF000001-0001"]);
    let first = app.issue(&[(&a, "0")], "0").await;
    assert_eq!(first.tracking_code, "PF000001-0001");

    app.tokens.queue_tracking(&["PF000001-0001", "PF000002-0002"]);
    let second = app.issue(&[(&b, "0")], "0").await;
    assert_eq!(second.tracking_code, "PF000002-0002");
}

#[tokio::test]
async fn test_issue_gives_up_after_max_attempts() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    app.tokens.queue_tracking(&["PF000009-0009"]);
    app.issue(&[(&a, "0")], "0").await;

    app.tokens.queue_tracking(&["PF000009-0009"; 5]);
    let err = app
        .quotations()
        .issue(IssueQuotationInput {
            customer_name: "Rosa".to_string(),
            customer_phone: None,
            customer_email: None,
            list_id: None,
            global_discount: dec("0"),
            lines: vec![IssueLineInput {
                bundle_id: a.id,
                unit_price: None,
                line_discount: dec("0"),
            }],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateToken(_)));
}

// ============================================================================
// Reserve
// ============================================================================

#[tokio::test]
async fn test_reserve_holds_bundles_and_sets_expiry() {
    let app = test_app();
    let a = app.available_bundle("500").await;
    let b = app.available_bundle("300").await;
    let quotation = app.issue(&[(&a, "0"), (&b, "0")], "0").await;

    let reserved = app.quotations().reserve(quotation.id).await.unwrap();

    assert_eq!(reserved.state, QuotationState::Reserved);
    assert_eq!(
        reserved.expires_at,
        Some(common::start_time() + Duration::days(7))
    );
    assert_eq!(app.bundle(a.id).await.state, BundleState::Reserved);
    assert_eq!(app.bundle(b.id).await.state, BundleState::Reserved);
}

#[tokio::test]
async fn test_reserve_twice_is_invalid_transition() {
    let app = test_app();
    let a = app.available_bundle("500").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;

    app.quotations().reserve(quotation.id).await.unwrap();
    let err = app.quotations().reserve(quotation.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_reserve_is_all_or_nothing() {
    let app = test_app();
    let shared_bundle = app.available_bundle("500").await;
    let free = app.available_bundle("200").await;

    let first = app.issue(&[(&shared_bundle, "0")], "0").await;
    let second = app.issue(&[(&free, "0"), (&shared_bundle, "0")], "0").await;

    app.quotations().reserve(first.id).await.unwrap();
    let err = app.quotations().reserve(second.id).await.unwrap_err();

    match err {
        AppError::BundleUnavailable(ids) => assert_eq!(ids, vec![shared_bundle.id]),
        other => panic!("expected BundleUnavailable, got {:?}", other),
    }
    // The free bundle of the losing quotation was not touched
    assert_eq!(app.bundle(free.id).await.state, BundleState::Available);
    let second = app.quotations().get(second.id).await.unwrap();
    assert_eq!(second.state, QuotationState::Issued);
}

#[tokio::test]
async fn test_concurrent_overlapping_reservations() {
    let app = test_app();
    let a = app.available_bundle("500").await;
    let b = app.available_bundle("500").await;
    let c = app.available_bundle("500").await;

    let q1 = app.issue(&[(&a, "0"), (&b, "0")], "0").await;
    let q2 = app.issue(&[(&b, "0"), (&c, "0")], "0").await;

    let s1 = app.quotations();
    let s2 = app.quotations();
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { s1.reserve(q1.id).await }),
        tokio::spawn(async move { s2.reserve(q2.id).await }),
    );
    let (r1, r2) = (r1.unwrap(), r2.unwrap());

    // Exactly one wins
    assert!(r1.is_ok() ^ r2.is_ok());
    let loser = if r1.is_ok() { r2 } else { r1 };
    assert!(matches!(loser, Err(AppError::BundleUnavailable(_))));

    let reserved = [a.id, b.id, c.id];
    let mut held = 0;
    for id in reserved {
        if app.bundle(id).await.state == BundleState::Reserved {
            held += 1;
        }
    }
    assert_eq!(held, 2);
}

// ============================================================================
// Payments
// ============================================================================

#[tokio::test]
async fn test_full_payment_settles_and_overpayment_is_flagged() {
    let app = test_app();
    let a = app.available_bundle("500").await;
    let b = app.available_bundle("500").await;
    let quotation = app.issue(&[(&a, "0"), (&b, "10")], "5").await;
    app.quotations().reserve(quotation.id).await.unwrap();

    let payments = PaymentService::new(&app.state);
    let receipt = payments
        .record_payment(quotation.id, payment("902.50"))
        .await
        .unwrap();
    assert_eq!(receipt.summary.state, QuotationState::Paid);
    assert_eq!(receipt.summary.outstanding, dec("0"));
    assert!(!receipt.summary.overpaid);
    assert_eq!(app.bundle(a.id).await.state, BundleState::Sold);
    assert_eq!(app.bundle(b.id).await.state, BundleState::Sold);

    let receipt = payments
        .record_payment(quotation.id, payment("1.00"))
        .await
        .unwrap();
    assert_eq!(receipt.summary.state, QuotationState::Paid);
    assert!(receipt.summary.overpaid);
    assert_eq!(receipt.summary.paid, dec("903.50"));
    assert_eq!(receipt.summary.payments.len(), 2);
}

#[tokio::test]
async fn test_partial_payment_keeps_reservation() {
    let app = test_app();
    let a = app.available_bundle("400").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();

    let receipt = PaymentService::new(&app.state)
        .record_payment(quotation.id, payment("150"))
        .await
        .unwrap();
    assert_eq!(receipt.summary.state, QuotationState::Reserved);
    assert_eq!(receipt.summary.outstanding, dec("250"));
    assert_eq!(app.bundle(a.id).await.state, BundleState::Reserved);
}

#[tokio::test]
async fn test_payment_on_issued_quotation_rejected() {
    let app = test_app();
    let a = app.available_bundle("400").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;

    let err = PaymentService::new(&app.state)
        .record_payment(quotation.id, payment("100"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_zero_payment_rejected() {
    let app = test_app();
    let a = app.available_bundle("400").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();

    let err = PaymentService::new(&app.state)
        .record_payment(quotation.id, payment("0"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn test_sub_cent_payment_rejected() {
    let app = test_app();
    let a = app.available_bundle("400").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();

    let err = PaymentService::new(&app.state)
        .record_payment(quotation.id, payment("0.001"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let ledger = PaymentService::new(&app.state).ledger(quotation.id).await.unwrap();
    assert!(ledger.payments.is_empty());
}

#[tokio::test]
async fn test_revision_that_covers_total_settles() {
    let app = test_app();
    let a = app.available_bundle("1000").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();

    PaymentService::new(&app.state)
        .record_payment(quotation.id, payment("900"))
        .await
        .unwrap();

    let revised = app
        .quotations()
        .revise(
            quotation.id,
            ReviseQuotationInput {
                global_discount: None,
                lines: vec![LineDiscountInput {
                    bundle_id: a.id,
                    line_discount: dec("10"),
                }],
            },
        )
        .await
        .unwrap();

    assert_eq!(revised.total, dec("900.00"));
    assert_eq!(revised.state, QuotationState::Paid);
    assert_eq!(app.bundle(a.id).await.state, BundleState::Sold);
}

#[tokio::test]
async fn test_paid_quotation_cannot_be_revised() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();
    PaymentService::new(&app.state)
        .record_payment(quotation.id, payment("100"))
        .await
        .unwrap();

    let err = app
        .quotations()
        .revise(
            quotation.id,
            ReviseQuotationInput {
                global_discount: Some(dec("10")),
                lines: vec![],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

// ============================================================================
// Expiry
// ============================================================================

#[tokio::test]
async fn test_sweep_expires_overdue_reservation() {
    let app = test_app();
    let a = app.available_bundle("500").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();

    // Exactly at the expiry instant nothing happens
    app.clock.advance(Duration::days(7));
    assert_eq!(app.quotations().sweep_expired().await.unwrap(), 0);

    app.clock.advance(Duration::seconds(1));
    let swept = assert_ok!(app.quotations().sweep_expired().await);
    assert_eq!(swept, 1);

    let expired = app.quotations().get(quotation.id).await.unwrap();
    assert_eq!(expired.state, QuotationState::Expired);
    assert_eq!(app.bundle(a.id).await.state, BundleState::Available);
}

#[tokio::test]
async fn test_expire_on_paid_quotation_is_noop() {
    let app = test_app();
    let a = app.available_bundle("500").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();
    PaymentService::new(&app.state)
        .record_payment(quotation.id, payment("500"))
        .await
        .unwrap();

    app.clock.advance(Duration::days(30));
    let expired = assert_ok!(app.quotations().expire(quotation.id).await);
    assert!(!expired);

    let paid = app.quotations().get(quotation.id).await.unwrap();
    assert_eq!(paid.state, QuotationState::Paid);
    assert_eq!(app.bundle(a.id).await.state, BundleState::Sold);
}

#[tokio::test]
async fn test_expired_bundle_can_be_reserved_again() {
    let app = test_app();
    let a = app.available_bundle("500").await;
    let first = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(first.id).await.unwrap();

    app.clock.advance(Duration::days(8));
    app.quotations().sweep_expired().await.unwrap();

    let second = app.issue(&[(&a, "0")], "0").await;
    let reserved = app.quotations().reserve(second.id).await.unwrap();
    assert_eq!(reserved.state, QuotationState::Reserved);

    // A payment on the expired quotation is refused
    let err = PaymentService::new(&app.state)
        .record_payment(first.id, payment("500"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_dispatch_batch_with_unpaid_member_changes_nothing() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let b = app.available_bundle("200").await;

    let paid = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(paid.id).await.unwrap();
    PaymentService::new(&app.state)
        .record_payment(paid.id, payment("100"))
        .await
        .unwrap();

    let reserved = app.issue(&[(&b, "0")], "0").await;
    app.quotations().reserve(reserved.id).await.unwrap();

    let err = app
        .quotations()
        .dispatch(&[paid.id, reserved.id])
        .await
        .unwrap_err();
    match err {
        AppError::InvalidTransition { offending, .. } => assert_eq!(offending, vec![reserved.id]),
        other => panic!("expected InvalidTransition, got {:?}", other),
    }

    let still_paid = app.quotations().get(paid.id).await.unwrap();
    assert_eq!(still_paid.state, QuotationState::Paid);
}

#[tokio::test]
async fn test_dispatch_builds_manifest() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let b = app.available_bundle("200").await;
    let c = app.available_bundle("50").await;
    let payments = PaymentService::new(&app.state);

    let q1 = app.issue(&[(&a, "0"), (&b, "0")], "0").await;
    let q2 = app.issue(&[(&c, "0")], "0").await;
    for (q, amount) in [(&q1, "300"), (&q2, "50")] {
        app.quotations().reserve(q.id).await.unwrap();
        payments.record_payment(q.id, payment(amount)).await.unwrap();
    }

    let manifest = app.quotations().dispatch(&[q1.id, q2.id, q1.id]).await.unwrap();
    assert_eq!(manifest.quotation_count, 2);
    assert_eq!(manifest.item_count, 3);
    assert_eq!(manifest.total_amount, dec("350"));
    assert_eq!(manifest.dispatched_at, common::start_time());

    let q1 = app.quotations().get(q1.id).await.unwrap();
    assert_eq!(q1.state, QuotationState::Dispatched);
}

#[tokio::test]
async fn test_dispatch_empty_batch_rejected() {
    let app = test_app();
    let err = app.quotations().dispatch(&[]).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_reserved_quotation_releases_bundles() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();

    app.quotations().delete(quotation.id).await.unwrap();

    assert_eq!(app.bundle(a.id).await.state, BundleState::Available);
    let err = app.quotations().get(quotation.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_with_payments_rejected() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();
    PaymentService::new(&app.state)
        .record_payment(quotation.id, payment("20"))
        .await
        .unwrap();

    let err = app.quotations().delete(quotation.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
    assert!(app.quotations().get(quotation.id).await.is_ok());
}

#[tokio::test]
async fn test_settled_quotation_without_payments_cannot_be_deleted() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();

    // A full discount settles the reservation with nothing paid
    let settled = app
        .quotations()
        .revise(
            quotation.id,
            ReviseQuotationInput {
                global_discount: Some(dec("100")),
                lines: Vec::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(settled.total, dec("0"));
    assert_eq!(settled.state, QuotationState::Paid);

    let err = app.quotations().delete(quotation.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { ref offending, .. } if offending == &vec![quotation.id]));

    app.quotations().dispatch(&[quotation.id]).await.unwrap();
    let err = app.quotations().delete(quotation.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    assert_eq!(
        app.quotations().get(quotation.id).await.unwrap().state,
        QuotationState::Dispatched
    );
    assert_eq!(app.bundle(a.id).await.state, BundleState::Sold);
}

#[tokio::test]
async fn test_expired_quotation_can_be_deleted() {
    let app = test_app();
    let a = app.available_bundle("100").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();
    app.clock.advance(Duration::days(8));
    assert!(app.quotations().expire(quotation.id).await.unwrap());

    app.quotations().delete(quotation.id).await.unwrap();
    assert_eq!(app.bundle(a.id).await.state, BundleState::Available);
}

// ============================================================================
// Tracking
// ============================================================================

#[tokio::test]
async fn test_tracking_view_reports_balance() {
    let app = test_app();
    let a = app.available_bundle("250").await;
    let quotation = app.issue(&[(&a, "0")], "0").await;
    app.quotations().reserve(quotation.id).await.unwrap();
    PaymentService::new(&app.state)
        .record_payment(quotation.id, payment("100"))
        .await
        .unwrap();

    let view = app.quotations().track(&quotation.tracking_code).await.unwrap();
    assert_eq!(view.state, QuotationState::Reserved);
    assert_eq!(view.paid, dec("100"));
    assert_eq!(view.outstanding, dec("150"));
    assert_eq!(view.item_count, 1);

    let err = app.quotations().track("PF999999-9999").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
