use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_schedules_doctor_id ON schedules(doctor_id)",
    "CREATE INDEX IF NOT EXISTS idx_schedule_slots_doctor_date ON schedule_slots(doctor_id, date)",
    "CREATE INDEX IF NOT EXISTS idx_schedule_slots_schedule_id ON schedule_slots(schedule_id)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_patient_id ON appointments(patient_id)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_slot ON appointments(doctor_id, appointment_date, time)",
];

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create patients table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS patients (
            id SERIAL PRIMARY KEY,
            first_name VARCHAR(100) NOT NULL,
            last_name VARCHAR(100) NOT NULL,
            email VARCHAR(255) NOT NULL UNIQUE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create doctors table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS doctors (
            id SERIAL PRIMARY KEY,
            first_name VARCHAR(100) NOT NULL,
            last_name VARCHAR(100) NOT NULL,
            email VARCHAR(255) NOT NULL UNIQUE,
            specialization VARCHAR(100) NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create schedules table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedules (
            id SERIAL PRIMARY KEY,
            doctor_id INT NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
            available_date DATE NOT NULL,
            start_appointment TIME NOT NULL,
            end_appointment TIME NOT NULL,
            CONSTRAINT valid_schedule_window CHECK (end_appointment > start_appointment),
            CONSTRAINT aligned_schedule_window CHECK (
                EXTRACT(MINUTE FROM start_appointment)::int % 30 = 0
                AND EXTRACT(SECOND FROM start_appointment) = 0
                AND EXTRACT(MINUTE FROM end_appointment)::int % 30 = 0
                AND EXTRACT(SECOND FROM end_appointment) = 0
            )
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create schedule_slots table, the slot ledger
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedule_slots (
            id SERIAL PRIMARY KEY,
            doctor_id INT NOT NULL REFERENCES doctors(id),
            schedule_id INT NOT NULL REFERENCES schedules(id) ON DELETE CASCADE,
            date DATE NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            is_available BOOLEAN NOT NULL DEFAULT TRUE,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_slot_range CHECK (end_time > start_time),
            CONSTRAINT unique_slot_start UNIQUE (doctor_id, date, start_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create appointments table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id SERIAL PRIMARY KEY,
            patient_id INT NOT NULL REFERENCES patients(id),
            doctor_id INT NOT NULL REFERENCES doctors(id),
            appointment_date DATE NOT NULL,
            time TIME NOT NULL,
            reason TEXT NULL,
            status VARCHAR(100) NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes, one statement at a time
    for statement in INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
