use crate::models::{DbSchedule, DbSlot};
use crate::repositories::slot::create_slot;
use clinic_core::models::schedule::CreateScheduleRequest;
use eyre::{ensure, Result};
use sqlx::{Pool, Postgres};

/// Inserts a day schedule and tiles it into available half-hour slots, all
/// in one transaction so a schedule never exists with a partial ledger.
pub async fn create_schedule_with_slots(
    pool: &Pool<Postgres>,
    request: &CreateScheduleRequest,
) -> Result<(DbSchedule, Vec<DbSlot>)> {
    ensure!(
        request.is_aligned(),
        "Schedule window {}-{} for doctor {} is not on half-hour boundaries",
        request.start_appointment,
        request.end_appointment,
        request.doctor_id
    );

    let mut tx = pool.begin().await?;

    let schedule = sqlx::query_as::<_, DbSchedule>(
        r#"
        INSERT INTO schedules (doctor_id, available_date, start_appointment, end_appointment)
        VALUES ($1, $2, $3, $4)
        RETURNING id, doctor_id, available_date, start_appointment, end_appointment
        "#,
    )
    .bind(request.doctor_id)
    .bind(request.available_date)
    .bind(request.start_appointment)
    .bind(request.end_appointment)
    .fetch_one(&mut *tx)
    .await?;

    let mut slots = Vec::new();
    for (start, end) in request.default_slot_windows() {
        let slot = create_slot(
            &mut *tx,
            schedule.id,
            schedule.doctor_id,
            schedule.available_date,
            start,
            end,
        )
        .await?;
        slots.push(slot);
    }

    tx.commit().await?;

    tracing::debug!(
        "Schedule created: id={}, doctor_id={}, date={}, slots={}",
        schedule.id,
        schedule.doctor_id,
        schedule.available_date,
        slots.len()
    );
    Ok((schedule, slots))
}

pub async fn get_schedules_by_doctor_id(
    pool: &Pool<Postgres>,
    doctor_id: i32,
) -> Result<Vec<DbSchedule>> {
    let schedules = sqlx::query_as::<_, DbSchedule>(
        r#"
        SELECT id, doctor_id, available_date, start_appointment, end_appointment
        FROM schedules
        WHERE doctor_id = $1
        ORDER BY available_date ASC, start_appointment ASC
        "#,
    )
    .bind(doctor_id)
    .fetch_all(pool)
    .await?;

    Ok(schedules)
}
