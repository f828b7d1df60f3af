//! Shared fixtures for the integration tests
//!
//! In-memory repositories, a clock the tests move by hand and a token
//! generator that can be scripted to collide.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use backoffice::services::bundle::ReceiveBundleInput;
use backoffice::services::quotation::{IssueLineInput, IssueQuotationInput};
use backoffice::services::supplier::CreateSupplierInput;
use backoffice::services::{BundleService, QuotationService, SupplierService};
use backoffice::{AppState, Clock, Config, Repositories, TokenGenerator};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use shared::{Bundle, Category, GarmentType, Quotation, Season, Supplier};
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Deterministic codes; queued values are handed out first
#[derive(Default)]
pub struct ScriptedTokens {
    counter: AtomicU32,
    tracking: Mutex<VecDeque<String>>,
    share: Mutex<VecDeque<String>>,
    scan: Mutex<VecDeque<String>>,
}

impl ScriptedTokens {
    pub fn queue_tracking(&self, codes: &[&str]) {
        let mut queue = self.tracking.lock().unwrap();
        queue.extend(codes.iter().map(|c| c.to_string()));
    }

    pub fn queue_share(&self, tokens: &[&str]) {
        let mut queue = self.share.lock().unwrap();
        queue.extend(tokens.iter().map(|t| t.to_string()));
    }

    pub fn queue_scan(&self, codes: &[&str]) {
        let mut queue = self.scan.lock().unwrap();
        queue.extend(codes.iter().map(|c| c.to_string()));
    }

    fn next(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl TokenGenerator for ScriptedTokens {
    fn tracking_code(&self) -> String {
        if let Some(code) = self.tracking.lock().unwrap().pop_front() {
            return code;
        }
        format!("PF{:06}-{:04}", self.next(), 1)
    }

    fn share_token(&self) -> String {
        if let Some(token) = self.share.lock().unwrap().pop_front() {
            return token;
        }
        format!("share{:019}", self.next())
    }

    fn scan_code(&self) -> String {
        if let Some(code) = self.scan.lock().unwrap().pop_front() {
            return code;
        }
        format!("SACO-{:08}", self.next())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub tokens: Arc<ScriptedTokens>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
}

pub fn test_app() -> TestApp {
    let clock = Arc::new(ManualClock::new(start_time()));
    let tokens = Arc::new(ScriptedTokens::default());
    let state = AppState::new(Repositories::in_memory(), Config::default())
        .with_clock(clock.clone())
        .with_tokens(tokens.clone());
    TestApp {
        state,
        clock,
        tokens,
    }
}

impl TestApp {
    pub fn quotations(&self) -> QuotationService {
        QuotationService::new(&self.state)
    }

    pub async fn supplier(&self, name: &str) -> Supplier {
        SupplierService::new(&self.state)
            .create(CreateSupplierInput {
                name: name.to_string(),
                contact: None,
                phone: None,
                active: true,
            })
            .await
            .unwrap()
    }

    /// Receive a loose bundle (no purchase order) in state Received
    pub async fn received_bundle(&self, price: &str) -> Bundle {
        BundleService::new(&self.state)
            .receive(ReceiveBundleInput {
                purchase_order_id: None,
                garment_type: GarmentType::CasualMujer,
                season: Season::Summer,
                category: Category::Woman,
                sizes: vec!["S".to_string(), "M".to_string()],
                content_description: "12 blusas".to_string(),
                base_price: dec(price),
                notes: None,
            })
            .await
            .unwrap()
    }

    /// Receive and tag a bundle so it can be sold
    pub async fn available_bundle(&self, price: &str) -> Bundle {
        let bundle = self.received_bundle(price).await;
        BundleService::new(&self.state).tag(bundle.id).await.unwrap()
    }

    /// Issue a quotation at base prices with the given line discounts
    pub async fn issue(&self, lines: &[(&Bundle, &str)], global_discount: &str) -> Quotation {
        self.quotations()
            .issue(IssueQuotationInput {
                customer_name: "María Quispe".to_string(),
                customer_phone: Some("987654321".to_string()),
                customer_email: None,
                list_id: None,
                global_discount: dec(global_discount),
                lines: lines
                    .iter()
                    .map(|(bundle, discount)| IssueLineInput {
                        bundle_id: bundle.id,
                        unit_price: None,
                        line_discount: dec(discount),
                    })
                    .collect(),
            })
            .await
            .unwrap()
    }

    pub async fn bundle(&self, id: Uuid) -> Bundle {
        self.state.repos.bundles.get(id).await.unwrap().unwrap()
    }
}
