use crate::models::DbSlot;
use chrono::{NaiveDate, NaiveTime};
use clinic_core::models::slot::SlotKey;
use eyre::Result;
use sqlx::{PgConnection, Pool, Postgres};

/// Row-locks the available slot containing `key.time`. Contenders for the
/// same row block here until the holder commits or rolls back, then see
/// `is_available = FALSE` and get `None`.
pub async fn lock_available_slot(conn: &mut PgConnection, key: &SlotKey) -> Result<Option<i32>> {
    let slot_id = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT id FROM schedule_slots
        WHERE doctor_id = $1 AND date = $2 AND start_time <= $3 AND end_time > $3
          AND is_available = TRUE
        FOR UPDATE
        "#,
    )
    .bind(key.doctor_id)
    .bind(key.date)
    .bind(key.time)
    .fetch_optional(conn)
    .await?;

    Ok(slot_id)
}

pub async fn mark_slot_unavailable(conn: &mut PgConnection, slot_id: i32) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE schedule_slots
        SET is_available = FALSE, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(slot_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Marks the slot containing `key.time` available again. Returns the number
/// of rows touched, which is zero when the slot no longer exists.
pub async fn release_slot(conn: &mut PgConnection, key: &SlotKey) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE schedule_slots
        SET is_available = TRUE, updated_at = NOW()
        WHERE doctor_id = $1 AND date = $2 AND start_time <= $3 AND end_time > $3
        "#,
    )
    .bind(key.doctor_id)
    .bind(key.date)
    .bind(key.time)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn create_slot(
    conn: &mut PgConnection,
    schedule_id: i32,
    doctor_id: i32,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<DbSlot> {
    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        INSERT INTO schedule_slots (doctor_id, schedule_id, date, start_time, end_time, is_available)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        RETURNING id, doctor_id, schedule_id, date, start_time, end_time, is_available, updated_at
        "#,
    )
    .bind(doctor_id)
    .bind(schedule_id)
    .bind(date)
    .bind(start_time)
    .bind(end_time)
    .fetch_one(conn)
    .await?;

    Ok(slot)
}

pub async fn get_slots_by_doctor_and_date(
    pool: &Pool<Postgres>,
    doctor_id: i32,
    date: NaiveDate,
) -> Result<Vec<DbSlot>> {
    let slots = sqlx::query_as::<_, DbSlot>(
        r#"
        SELECT id, doctor_id, schedule_id, date, start_time, end_time, is_available, updated_at
        FROM schedule_slots
        WHERE doctor_id = $1 AND date = $2
        ORDER BY start_time ASC
        "#,
    )
    .bind(doctor_id)
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(slots)
}
