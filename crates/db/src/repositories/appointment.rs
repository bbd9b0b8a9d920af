use crate::models::{DbAppointment, DbHeldSlot};
use clinic_core::models::{appointment::CreateAppointmentRequest, slot::SlotKey};
use eyre::Result;
use sqlx::{PgConnection, Pool, Postgres};

pub async fn insert_appointment(
    conn: &mut PgConnection,
    request: &CreateAppointmentRequest,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        INSERT INTO appointments (patient_id, doctor_id, appointment_date, time, reason, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, patient_id, doctor_id, appointment_date, time, reason, status, created_at, updated_at
        "#,
    )
    .bind(request.patient_id)
    .bind(request.doctor_id)
    .bind(request.appointment_date)
    .bind(request.time)
    .bind(request.reason.as_deref())
    .bind(request.status.as_deref())
    .fetch_optional(conn)
    .await?;

    Ok(appointment)
}

/// Row-locks the appointment so concurrent rebookings of it serialize.
pub async fn lock_appointment(conn: &mut PgConnection, id: i32) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, patient_id, doctor_id, appointment_date, time, reason, status, created_at, updated_at
        FROM appointments
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(appointment)
}

pub async fn update_appointment(
    conn: &mut PgConnection,
    id: i32,
    request: &CreateAppointmentRequest,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        UPDATE appointments
        SET patient_id = $2, doctor_id = $3, appointment_date = $4, time = $5,
            reason = $6, status = $7, updated_at = NOW()
        WHERE id = $1
        RETURNING id, patient_id, doctor_id, appointment_date, time, reason, status, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(request.patient_id)
    .bind(request.doctor_id)
    .bind(request.appointment_date)
    .bind(request.time)
    .bind(request.reason.as_deref())
    .bind(request.status.as_deref())
    .fetch_optional(conn)
    .await?;

    Ok(appointment)
}

/// Deletes the appointment and returns the slot it was holding.
pub async fn delete_appointment(conn: &mut PgConnection, id: i32) -> Result<Option<SlotKey>> {
    let held = sqlx::query_as::<_, DbHeldSlot>(
        r#"
        DELETE FROM appointments
        WHERE id = $1
        RETURNING doctor_id, appointment_date, time
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(held.map(SlotKey::from))
}

pub async fn get_appointments_by_patient_id(
    pool: &Pool<Postgres>,
    patient_id: i32,
) -> Result<Vec<DbAppointment>> {
    let appointments = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, patient_id, doctor_id, appointment_date, time, reason, status, created_at, updated_at
        FROM appointments
        WHERE patient_id = $1
        ORDER BY appointment_date ASC, time ASC
        "#,
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}
