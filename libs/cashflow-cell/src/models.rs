// libs/cashflow-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowEntry {
    pub id: Uuid,
    pub entry_date: NaiveDate,
    pub concept: String,
    pub direction: CashDirection,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub patient_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct DbCashFlowEntry {
    pub id: Uuid,
    pub entry_date: NaiveDate,
    pub concept: String,
    pub direction: String,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub patient_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<DbCashFlowEntry> for CashFlowEntry {
    fn from(row: DbCashFlowEntry) -> Self {
        CashFlowEntry {
            id: row.id,
            entry_date: row.entry_date,
            concept: row.concept,
            direction: CashDirection::from_db(&row.direction),
            amount: row.amount,
            payment_method: row.payment_method,
            patient_id: row.patient_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashDirection {
    Income,
    Expense,
}

impl CashDirection {
    pub fn from_db(raw: &str) -> Self {
        match raw {
            "EXPENSE" => CashDirection::Expense,
            _ => CashDirection::Income,
        }
    }
}

impl fmt::Display for CashDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CashDirection::Income => write!(f, "INCOME"),
            CashDirection::Expense => write!(f, "EXPENSE"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCashFlowRequest {
    /// Date-only string or ISO timestamp; normalized by the shared day rule.
    pub entry_date: String,
    pub concept: String,
    pub direction: CashDirection,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub patient_id: Option<Uuid>,
}

impl CreateCashFlowRequest {
    pub fn validate(&self) -> Result<(), CashFlowError> {
        if self.concept.trim().is_empty() {
            return Err(CashFlowError::ValidationError(
                "concept is required".to_string(),
            ));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(CashFlowError::ValidationError(
                "amount must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCashFlowRequest {
    pub entry_date: Option<String>,
    pub concept: Option<String>,
    pub direction: Option<CashDirection>,
    pub amount: Option<f64>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CashFlowQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CashFlowSummary {
    pub income: f64,
    pub expense: f64,
    pub net: f64,
    pub entries: usize,
}

/// Fold a period's entries into the dashboard totals.
pub fn summarize(entries: &[CashFlowEntry]) -> CashFlowSummary {
    let mut income = 0.0;
    let mut expense = 0.0;

    for entry in entries {
        match entry.direction {
            CashDirection::Income => income += entry.amount,
            CashDirection::Expense => expense += entry.amount,
        }
    }

    CashFlowSummary {
        income,
        expense,
        net: income - expense,
        entries: entries.len(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CashFlowError {
    #[error("Cash flow entry not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CashFlowError {
    fn from(err: sqlx::Error) -> Self {
        CashFlowError::DatabaseError(err.to_string())
    }
}

impl From<CashFlowError> for shared_models::error::AppError {
    fn from(err: CashFlowError) -> Self {
        use shared_models::error::AppError;
        match err {
            CashFlowError::NotFound => AppError::NotFound(err.to_string()),
            CashFlowError::ValidationError(msg) => AppError::ValidationError(msg),
            CashFlowError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(direction: CashDirection, amount: f64) -> CashFlowEntry {
        CashFlowEntry {
            id: Uuid::new_v4(),
            entry_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            concept: "Sesión de kinesiología".to_string(),
            direction,
            amount,
            payment_method: None,
            patient_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summary_folds_both_directions() {
        let entries = vec![
            entry(CashDirection::Income, 15000.0),
            entry(CashDirection::Income, 8000.0),
            entry(CashDirection::Expense, 5000.0),
        ];

        let summary = summarize(&entries);
        assert_eq!(summary.income, 23000.0);
        assert_eq!(summary.expense, 5000.0);
        assert_eq!(summary.net, 18000.0);
        assert_eq!(summary.entries, 3);
    }

    #[test]
    fn empty_period_summarizes_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.net, 0.0);
        assert_eq!(summary.entries, 0);
    }

    #[test]
    fn amounts_must_be_positive() {
        let request = CreateCashFlowRequest {
            entry_date: "2025-03-10".to_string(),
            concept: "Sesión".to_string(),
            direction: CashDirection::Income,
            amount: -50.0,
            payment_method: None,
            patient_id: None,
        };
        assert!(request.validate().is_err());
    }
}
