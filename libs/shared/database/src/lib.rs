use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use shared_config::AppConfig;

/// Shared state handed to every cell router.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool: PgPool,
}

/// SQLSTATE 23505: a unique constraint rejected the write.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

pub async fn connect(config: &AppConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    Ok(pool)
}

/// Create the schema if it does not exist yet.
///
/// The partial unique index on appointments is the store-level guarantee the
/// booking flow relies on: two concurrent requests can never both claim the
/// same (day, time, slot) among non-cancelled rows.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS professionals (
            id UUID PRIMARY KEY,
            full_name VARCHAR(255) NOT NULL,
            license_number VARCHAR(64),
            specialty VARCHAR(128),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS work_schedules (
            id UUID PRIMARY KEY,
            professional_id UUID NOT NULL REFERENCES professionals(id) ON DELETE CASCADE,
            day_of_week SMALLINT NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (professional_id, day_of_week, start_time)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS patients (
            id UUID PRIMARY KEY,
            dni VARCHAR(32) UNIQUE NOT NULL,
            full_name VARCHAR(255) NOT NULL,
            phone VARCHAR(64),
            health_insurance VARCHAR(128),
            birth_date DATE,
            has_cancer BOOLEAN NOT NULL DEFAULT FALSE,
            has_marcapasos BOOLEAN NOT NULL DEFAULT FALSE,
            uses_ea BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY,
            patient_id UUID NOT NULL REFERENCES patients(id),
            professional_id UUID NOT NULL REFERENCES professionals(id),
            session_date DATE NOT NULL,
            session_time TIME NOT NULL,
            slot_number SMALLINT NOT NULL CHECK (slot_number BETWEEN 1 AND 5),
            status VARCHAR(16) NOT NULL DEFAULT 'SCHEDULED',
            session_number INTEGER NOT NULL DEFAULT 1,
            is_first_session BOOLEAN NOT NULL DEFAULT FALSE,
            diagnosis TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clinical_histories (
            id UUID PRIMARY KEY,
            patient_id UUID NOT NULL REFERENCES patients(id),
            professional_id UUID NOT NULL REFERENCES professionals(id),
            diagnosis TEXT NOT NULL,
            evolution TEXT NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cash_flow_entries (
            id UUID PRIMARY KEY,
            entry_date DATE NOT NULL,
            concept VARCHAR(255) NOT NULL,
            direction VARCHAR(8) NOT NULL CHECK (direction IN ('INCOME', 'EXPENSE')),
            amount DOUBLE PRECISION NOT NULL,
            payment_method VARCHAR(32),
            patient_id UUID REFERENCES patients(id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_indexes(pool).await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_indexes(pool: &PgPool) -> Result<()> {
    let indexes = vec![
        // Capacity invariant: one non-cancelled appointment per (day, time, slot).
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_slot_claim \
         ON appointments (session_date, session_time, slot_number) \
         WHERE status <> 'CANCELLED'",
        "CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments (patient_id)",
        "CREATE INDEX IF NOT EXISTS idx_appointments_day ON appointments (session_date)",
        "CREATE INDEX IF NOT EXISTS idx_histories_patient ON clinical_histories (patient_id)",
        "CREATE INDEX IF NOT EXISTS idx_cash_flow_date ON cash_flow_entries (entry_date)",
        "CREATE INDEX IF NOT EXISTS idx_work_schedules_professional ON work_schedules (professional_id)",
    ];

    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    Ok(())
}
