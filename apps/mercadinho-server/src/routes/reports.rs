//! # Expenses and Cash-Flow Reports
//!
//! Periods are whole UTC days, both ends inclusive. Without a query the
//! report covers the last 30 days up to today.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use mercadinho_core::cashflow::{self, CashFlowSummary, DailyCashFlow};
use mercadinho_core::validation::{validate_amount_cents, validate_description};
use mercadinho_core::{Expense, PaymentStatus};
use mercadinho_db::repository::generate_id;
use mercadinho_payments::PaymentProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_PERIOD_DAYS: i64 = 30;

// =============================================================================
// Period
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Period {
    pub fn resolve(query: &PeriodQuery, today: NaiveDate) -> ApiResult<Self> {
        let to = query.to.unwrap_or(today);
        let from = match query.from {
            Some(from) => from,
            None => to
                .checked_sub_signed(Duration::days(DEFAULT_PERIOD_DAYS - 1))
                .ok_or_else(|| ApiError::validation(format!("to ({to}) is out of range")))?,
        };

        if from > to {
            return Err(ApiError::validation(format!(
                "from ({from}) must not be after to ({to})"
            )));
        }
        Ok(Period { from, to })
    }

    /// First instant of the period.
    pub fn start(&self) -> DateTime<Utc> {
        self.from.and_time(NaiveTime::MIN).and_utc()
    }

    /// First instant after the period.
    pub fn end(&self) -> DateTime<Utc> {
        self.to
            .succ_opt()
            .unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN)
            .and_utc()
    }
}

// =============================================================================
// Expenses
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NewExpenseRequest {
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub amount_cents: i64,
    /// Defaults to now.
    #[serde(default)]
    pub incurred_at: Option<DateTime<Utc>>,
}

pub async fn list_expenses<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<Vec<Expense>>> {
    let period = Period::resolve(&query, Utc::now().date_naive())?;
    let expenses = state
        .db()
        .expenses()
        .list_between(period.start(), period.end())
        .await?;
    Ok(Json(expenses))
}

pub async fn create_expense<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Json(request): Json<NewExpenseRequest>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    validate_description(&request.description)?;
    validate_amount_cents("amount_cents", request.amount_cents)?;

    let now = Utc::now();
    let expense = Expense {
        id: generate_id(),
        description: request.description.trim().to_string(),
        category: request
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        amount_cents: request.amount_cents,
        incurred_at: request.incurred_at.unwrap_or(now),
        created_at: now,
    };
    state.db().expenses().insert(&expense).await?;
    info!(expense_id = %expense.id, amount_cents = expense.amount_cents, "Expense recorded");

    Ok((StatusCode::CREATED, Json(expense)))
}

// =============================================================================
// Cash Flow
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CashFlowReport {
    pub period: Period,
    pub summary: CashFlowSummary,
    pub daily: Vec<DailyCashFlow>,
}

pub async fn cash_flow<P: PaymentProvider>(
    State(state): State<AppState<P>>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<CashFlowReport>> {
    let period = Period::resolve(&query, Utc::now().date_naive())?;
    let db = state.db();

    let orders = db.orders().list_between(period.start(), period.end()).await?;
    let expenses = db.expenses().list_between(period.start(), period.end()).await?;

    let mut product_ids: Vec<String> = orders
        .iter()
        .filter(|o| o.payment_status == PaymentStatus::Approved)
        .flat_map(|o| o.items.iter().map(|i| i.product_id.clone()))
        .collect();
    product_ids.sort();
    product_ids.dedup();
    let costs = db.products().costs_for(&product_ids).await?;

    let summary = cashflow::summarize(&orders, &costs, &expenses, state.fees());
    let daily = cashflow::daily(&orders, &costs, &expenses, state.fees());
    debug!(
        from = %period.from,
        to = %period.to,
        orders = summary.order_count,
        "Cash-flow report built"
    );

    Ok(Json(CashFlowReport {
        period,
        summary,
        daily,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use mercadinho_core::{Cart, OrderDraft, PaymentMethod};
    use serde_json::json;

    use crate::routes::test_support::{call, TestApp};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_period_defaults_to_last_30_days() {
        let period = Period::resolve(&PeriodQuery::default(), date("2026-03-31")).unwrap();
        assert_eq!(period.from, date("2026-03-02"));
        assert_eq!(period.to, date("2026-03-31"));
        assert_eq!(period.start().to_rfc3339(), "2026-03-02T00:00:00+00:00");
        assert_eq!(period.end().to_rfc3339(), "2026-04-01T00:00:00+00:00");
    }

    #[test]
    fn test_period_rejects_inverted_range() {
        let query = PeriodQuery {
            from: Some(date("2026-03-10")),
            to: Some(date("2026-03-01")),
        };
        assert!(Period::resolve(&query, date("2026-03-31")).is_err());
    }

    #[test]
    fn test_period_near_min_date_is_a_validation_error() {
        let query = PeriodQuery {
            from: None,
            to: Some(NaiveDate::MIN),
        };
        let err = Period::resolve(&query, date("2026-03-31")).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);

        let query = PeriodQuery {
            from: Some(NaiveDate::MIN),
            to: Some(NaiveDate::MIN),
        };
        let period = Period::resolve(&query, date("2026-03-31")).unwrap();
        assert!(period.start() < period.end());
    }

    #[tokio::test]
    async fn test_create_and_list_expenses() {
        let app = TestApp::new().await;

        let (status, created) = call(
            &app.router,
            Method::POST,
            "/api/admin/expenses",
            Some(json!({ "description": "Conta de luz", "category": "utilidades", "amount_cents": 18990 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["amount_cents"], 18990);

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/admin/expenses",
            Some(json!({ "description": "Frete", "amount_cents": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, list) = call(&app.router, Method::GET, "/api/admin/expenses", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["description"], "Conta de luz");
    }

    #[tokio::test]
    async fn test_cash_flow_counts_approved_orders_only() {
        let app = TestApp::new().await;
        let bread = app.product("Pão de queijo", 450, 200, 20).await;

        let mut cart = Cart::new();
        cart.add_item(&bread, 2).unwrap();
        let draft = OrderDraft::build(&cart, None, PaymentMethod::Pix, 1).unwrap();
        let orders = app.state.db().orders();
        let paid = orders.create(&draft).await.unwrap();
        orders
            .mark_payment_status(&paid.id, PaymentStatus::Approved, Some("pix-1"))
            .await
            .unwrap();
        // Neither of these ever brought money in.
        let pending = OrderDraft::build(&cart, None, PaymentMethod::Pix, 1).unwrap();
        orders.create(&pending).await.unwrap();
        let refused = OrderDraft::build(&cart, None, PaymentMethod::Debit, 1).unwrap();
        let refused = orders.create(&refused).await.unwrap();
        orders
            .mark_payment_status(&refused.id, PaymentStatus::Rejected, None)
            .await
            .unwrap();

        call(
            &app.router,
            Method::POST,
            "/api/admin/expenses",
            Some(json!({ "description": "Sacolas", "amount_cents": 100 })),
        )
        .await;

        let (status, report) =
            call(&app.router, Method::GET, "/api/admin/reports/cash-flow", None).await;
        assert_eq!(status, StatusCode::OK);

        let summary = &report["summary"];
        assert_eq!(summary["order_count"], 1);
        assert_eq!(summary["revenue_cents"], 900);
        assert_eq!(summary["cost_cents"], 400);
        assert_eq!(summary["gross_profit_cents"], 500);
        assert_eq!(summary["expenses_cents"], 100);

        let fees = summary["fees_cents"].as_i64().unwrap();
        assert!(fees > 0);
        assert_eq!(summary["net_profit_cents"].as_i64().unwrap(), 500 - 100 - fees);
        assert_eq!(report["daily"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cash_flow_rejects_bad_period() {
        let app = TestApp::new().await;
        let (status, _) = call(
            &app.router,
            Method::GET,
            "/api/admin/reports/cash-flow?from=2026-03-10&to=2026-03-01",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
