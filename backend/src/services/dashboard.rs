//! Dashboard KPIs

use chrono::{Duration, TimeZone, Utc};
use shared::{BundleState, KpiSnapshot, QuotationState};

use crate::error::AppResult;
use crate::repository::QuotationFilter;
use crate::services::DebtService;
use crate::AppState;

#[derive(Clone)]
pub struct DashboardService {
    state: AppState,
}

impl DashboardService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    pub async fn kpis(&self) -> AppResult<KpiSnapshot> {
        let repos = &self.state.repos;
        let now = self.state.clock.now();
        let horizon = now + Duration::hours(self.state.config.lifecycle.expiring_soon_hours);

        let available_stock = repos.bundles.count_by_state(BundleState::Available).await?;

        let expiring_reservations = repos
            .quotations
            .list(&QuotationFilter {
                state: Some(QuotationState::Reserved),
                expires_after: Some(now),
                expires_before: Some(horizon),
                ..Default::default()
            })
            .await?
            .len() as u64;

        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map_or(now, |start| Utc.from_utc_datetime(&start));
        let sales_today = repos.payments.total_since(midnight).await?;

        let supplier_debt = DebtService::new(&self.state).report().await?.total_debt;

        Ok(KpiSnapshot {
            available_stock,
            expiring_reservations,
            sales_today,
            supplier_debt,
        })
    }
}
