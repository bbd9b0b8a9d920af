//! Transactional access to the slot ledger and the appointment store.
//!
//! [`BookingStore`] hands out one [`BookingTx`] per logical operation. The
//! coordinator drives every statement of the booking protocol through that
//! transaction and ends it with exactly one `commit` or `rollback`.

use async_trait::async_trait;
use clinic_core::models::{
    appointment::{Appointment, CreateAppointmentRequest, UpdateAppointmentRequest},
    profile::{DoctorProfile, PatientProfile},
    slot::SlotKey,
};
use eyre::Result;
use sqlx::{Postgres, Transaction};

use crate::{
    repositories::{appointment, profile, slot},
    DbPool,
};

#[async_trait]
pub trait BookingTx: Send {
    /// Locks the available slot containing `key` and returns its id, or
    /// `None` when no such slot is free.
    async fn lock_available_slot(&mut self, key: &SlotKey) -> Result<Option<i32>>;

    async fn mark_slot_unavailable(&mut self, slot_id: i32) -> Result<()>;

    /// Unconditional, non-locking release of the slot containing `key`.
    async fn release_slot(&mut self, key: &SlotKey) -> Result<u64>;

    async fn insert_appointment(
        &mut self,
        request: &CreateAppointmentRequest,
    ) -> Result<Option<Appointment>>;

    async fn lock_appointment(&mut self, id: i32) -> Result<Option<Appointment>>;

    async fn update_appointment(
        &mut self,
        id: i32,
        request: &UpdateAppointmentRequest,
    ) -> Result<Option<Appointment>>;

    /// Deletes the appointment, returning the slot it held.
    async fn delete_appointment(&mut self, id: i32) -> Result<Option<SlotKey>>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    type Tx: BookingTx;

    async fn begin(&self) -> Result<Self::Tx>;

    async fn patient_profile(&self, id: i32) -> Result<Option<PatientProfile>>;

    async fn doctor_profile(&self, id: i32) -> Result<Option<DoctorProfile>>;

    async fn appointments_for_patient(&self, patient_id: i32) -> Result<Vec<Appointment>>;
}

#[derive(Clone)]
pub struct PgBookingStore {
    pool: DbPool,
}

impl PgBookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// A pooled connection inside `BEGIN`. Dropping it uncommitted aborts the
/// transaction and returns the connection to the pool.
pub struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn lock_available_slot(&mut self, key: &SlotKey) -> Result<Option<i32>> {
        slot::lock_available_slot(&mut self.tx, key).await
    }

    async fn mark_slot_unavailable(&mut self, slot_id: i32) -> Result<()> {
        slot::mark_slot_unavailable(&mut self.tx, slot_id).await
    }

    async fn release_slot(&mut self, key: &SlotKey) -> Result<u64> {
        slot::release_slot(&mut self.tx, key).await
    }

    async fn insert_appointment(
        &mut self,
        request: &CreateAppointmentRequest,
    ) -> Result<Option<Appointment>> {
        let row = appointment::insert_appointment(&mut self.tx, request).await?;
        Ok(row.map(Appointment::from))
    }

    async fn lock_appointment(&mut self, id: i32) -> Result<Option<Appointment>> {
        let row = appointment::lock_appointment(&mut self.tx, id).await?;
        Ok(row.map(Appointment::from))
    }

    async fn update_appointment(
        &mut self,
        id: i32,
        request: &UpdateAppointmentRequest,
    ) -> Result<Option<Appointment>> {
        let row = appointment::update_appointment(&mut self.tx, id, request).await?;
        Ok(row.map(Appointment::from))
    }

    async fn delete_appointment(&mut self, id: i32) -> Result<Option<SlotKey>> {
        appointment::delete_appointment(&mut self.tx, id).await
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    type Tx = PgBookingTx;

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PgBookingTx { tx })
    }

    async fn patient_profile(&self, id: i32) -> Result<Option<PatientProfile>> {
        let row = profile::get_patient_profile(&self.pool, id).await?;
        Ok(row.map(PatientProfile::from))
    }

    async fn doctor_profile(&self, id: i32) -> Result<Option<DoctorProfile>> {
        let row = profile::get_doctor_profile(&self.pool, id).await?;
        Ok(row.map(DoctorProfile::from))
    }

    async fn appointments_for_patient(&self, patient_id: i32) -> Result<Vec<Appointment>> {
        let rows = appointment::get_appointments_by_patient_id(&self.pool, patient_id).await?;
        Ok(rows.into_iter().map(Appointment::from).collect())
    }
}

// These run against a live Postgres (TEST_DATABASE_URL) and are skipped by default.
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime, Utc};
    use clinic_core::{errors::ErrorKind, models::schedule::CreateScheduleRequest};

    use super::*;
    use crate::{
        booking::{AppointmentService, BookingCoordinator},
        mock::create_test_pool,
        repositories::{schedule, slot::get_slots_by_doctor_and_date},
    };

    async fn seed_doctor_and_patient(pool: &DbPool) -> (i32, i32) {
        let tag = Utc::now().timestamp_nanos_opt().unwrap_or_default();

        let doctor_id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO doctors (first_name, last_name, email, specialization) VALUES ('Ada', 'Byron', $1, 'Neurology') RETURNING id",
        )
        .bind(format!("doctor-{}@clinic.test", tag))
        .fetch_one(pool)
        .await
        .unwrap();

        let patient_id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO patients (first_name, last_name, email) VALUES ('Alan', 'Turing', $1) RETURNING id",
        )
        .bind(format!("patient-{}@clinic.test", tag))
        .fetch_one(pool)
        .await
        .unwrap();

        (doctor_id, patient_id)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 20).unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn booking(patient_id: i32, doctor_id: i32, time: NaiveTime) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id,
            doctor_id,
            appointment_date: day(),
            time,
            reason: None,
            status: Some("scheduled".to_string()),
        }
    }

    async fn setup() -> (Arc<BookingCoordinator<PgBookingStore>>, DbPool, i32, i32) {
        let pool = create_test_pool().await;
        let (doctor_id, patient_id) = seed_doctor_and_patient(&pool).await;
        let (_, slots) = schedule::create_schedule_with_slots(
            &pool,
            &CreateScheduleRequest {
                doctor_id,
                available_date: day(),
                start_appointment: at(9, 0),
                end_appointment: at(11, 0),
            },
        )
        .await
        .unwrap();
        assert_eq!(slots.len(), 4);

        let coordinator = Arc::new(BookingCoordinator::new(PgBookingStore::new(pool.clone())));
        (coordinator, pool, doctor_id, patient_id)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore]
    async fn row_lock_grants_a_slot_once() {
        let (coordinator, pool, doctor_id, patient_id) = setup().await;

        let contenders: Vec<_> = (0..4)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .create_appointment(booking(patient_id, doctor_id, at(9, 0)))
                        .await
                })
            })
            .collect();

        let mut kinds = Vec::new();
        for contender in contenders {
            kinds.push(contender.await.unwrap().map_err(|e| e.kind()));
        }
        assert_eq!(kinds.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        assert!(kinds
            .iter()
            .filter_map(|outcome| outcome.as_ref().err())
            .all(|kind| *kind == ErrorKind::SlotUnavailable));

        let slots = get_slots_by_doctor_and_date(&pool, doctor_id, day()).await.unwrap();
        assert_eq!(slots.iter().filter(|slot| !slot.is_available).count(), 1);
    }

    #[tokio::test]
    #[ignore]
    async fn rebooking_and_cancelling_keep_the_ledger_in_sync() {
        let (coordinator, pool, doctor_id, patient_id) = setup().await;

        let created = coordinator
            .create_appointment(booking(patient_id, doctor_id, at(9, 0)))
            .await
            .unwrap();
        assert_eq!(created.doctor.as_ref().map(|d| d.id), Some(doctor_id));

        coordinator
            .update_appointment(created.id, booking(patient_id, doctor_id, at(10, 30)))
            .await
            .unwrap();
        let slots = get_slots_by_doctor_and_date(&pool, doctor_id, day()).await.unwrap();
        let held: Vec<_> = slots
            .iter()
            .filter(|slot| !slot.is_available)
            .map(|slot| slot.start_time)
            .collect();
        assert_eq!(held, vec![at(10, 30)]);

        coordinator.delete_appointment(created.id).await.unwrap();
        let slots = get_slots_by_doctor_and_date(&pool, doctor_id, day()).await.unwrap();
        assert!(slots.iter().all(|slot| slot.is_available));

        let err = coordinator.get_appointments(patient_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoAppointmentsFound);

        let schedules = schedule::get_schedules_by_doctor_id(&pool, doctor_id).await.unwrap();
        assert_eq!(schedules.len(), 1);
    }

    #[tokio::test]
    #[ignore]
    async fn misaligned_schedule_windows_are_refused() {
        let pool = create_test_pool().await;
        let (doctor_id, _) = seed_doctor_and_patient(&pool).await;

        let refused = schedule::create_schedule_with_slots(
            &pool,
            &CreateScheduleRequest {
                doctor_id,
                available_date: day(),
                start_appointment: at(9, 15),
                end_appointment: at(10, 15),
            },
        )
        .await;
        assert!(refused.is_err());
        assert!(schedule::get_schedules_by_doctor_id(&pool, doctor_id).await.unwrap().is_empty());

        // The table refuses the window even when written directly
        let direct = sqlx::query(
            "INSERT INTO schedules (doctor_id, available_date, start_appointment, end_appointment) VALUES ($1, $2, $3, $4)",
        )
        .bind(doctor_id)
        .bind(day())
        .bind(at(9, 15))
        .bind(at(10, 15))
        .execute(&pool)
        .await;
        assert!(direct.is_err());
    }
}
