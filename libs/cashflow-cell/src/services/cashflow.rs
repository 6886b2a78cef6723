use chrono::NaiveDate;
use sqlx::{PgPool, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::AppState;
use shared_utils::dates::parse_clinic_day;

use crate::models::{
    summarize, CashFlowEntry, CashFlowError, CashFlowQuery, CashFlowSummary,
    CreateCashFlowRequest, DbCashFlowEntry, UpdateCashFlowRequest,
};

pub struct CashFlowService {
    pool: PgPool,
}

impl CashFlowService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
        }
    }

    pub async fn list_entries(
        &self,
        query: &CashFlowQuery,
    ) -> Result<Vec<CashFlowEntry>, CashFlowError> {
        debug!("Listing cash flow entries for {:?}", query);

        let mut builder = QueryBuilder::new("SELECT * FROM cash_flow_entries WHERE 1=1");
        if let Some(from) = query.from {
            builder.push(" AND entry_date >= ");
            builder.push_bind(from);
        }
        if let Some(to) = query.to {
            builder.push(" AND entry_date <= ");
            builder.push_bind(to);
        }
        builder.push(" ORDER BY entry_date DESC, created_at DESC");

        let rows = builder
            .build_query_as::<DbCashFlowEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CashFlowEntry::from).collect())
    }

    pub async fn summary(&self, query: &CashFlowQuery) -> Result<CashFlowSummary, CashFlowError> {
        let entries = self.list_entries(query).await?;
        Ok(summarize(&entries))
    }

    pub async fn create_entry(
        &self,
        request: CreateCashFlowRequest,
    ) -> Result<CashFlowEntry, CashFlowError> {
        request.validate()?;
        let entry_date = parse_day(&request.entry_date)?;

        let row = sqlx::query_as::<_, DbCashFlowEntry>(
            r#"
            INSERT INTO cash_flow_entries
                (id, entry_date, concept, direction, amount, payment_method, patient_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry_date)
        .bind(request.concept.trim())
        .bind(request.direction.to_string())
        .bind(request.amount)
        .bind(&request.payment_method)
        .bind(request.patient_id)
        .fetch_one(&self.pool)
        .await?;

        info!("Cash flow entry created: {}", row.id);
        Ok(row.into())
    }

    pub async fn update_entry(
        &self,
        entry_id: Uuid,
        request: UpdateCashFlowRequest,
    ) -> Result<CashFlowEntry, CashFlowError> {
        if let Some(amount) = request.amount {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(CashFlowError::ValidationError(
                    "amount must be a positive number".to_string(),
                ));
            }
        }
        let entry_date = match request.entry_date.as_deref() {
            None => None,
            Some(raw) => Some(parse_day(raw)?),
        };

        let row = sqlx::query_as::<_, DbCashFlowEntry>(
            r#"
            UPDATE cash_flow_entries SET
                entry_date = COALESCE($2, entry_date),
                concept = COALESCE($3, concept),
                direction = COALESCE($4, direction),
                amount = COALESCE($5, amount),
                payment_method = COALESCE($6, payment_method)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(entry_id)
        .bind(entry_date)
        .bind(&request.concept)
        .bind(request.direction.map(|d| d.to_string()))
        .bind(request.amount)
        .bind(&request.payment_method)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CashFlowError::NotFound)?;

        Ok(row.into())
    }

    pub async fn delete_entry(&self, entry_id: Uuid) -> Result<(), CashFlowError> {
        let result = sqlx::query("DELETE FROM cash_flow_entries WHERE id = $1")
            .bind(entry_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CashFlowError::NotFound);
        }

        info!("Cash flow entry {} deleted", entry_id);
        Ok(())
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate, CashFlowError> {
    parse_clinic_day(raw).map_err(|e| CashFlowError::ValidationError(e.to_string()))
}
