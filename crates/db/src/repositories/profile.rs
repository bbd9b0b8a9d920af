use crate::models::{DbDoctorProfile, DbPatientProfile};
use eyre::Result;
use sqlx::{Pool, Postgres};

pub async fn get_patient_profile(pool: &Pool<Postgres>, id: i32) -> Result<Option<DbPatientProfile>> {
    let patient = sqlx::query_as::<_, DbPatientProfile>(
        r#"
        SELECT id, first_name, last_name, email
        FROM patients
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(patient)
}

pub async fn get_doctor_profile(pool: &Pool<Postgres>, id: i32) -> Result<Option<DbDoctorProfile>> {
    let doctor = sqlx::query_as::<_, DbDoctorProfile>(
        r#"
        SELECT id, first_name, last_name, email, specialization
        FROM doctors
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(doctor)
}
