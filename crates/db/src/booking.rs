//! # Booking Transaction Coordinator
//!
//! Books, rebooks and cancels appointments against the slot ledger so that a
//! slot is never held by more than one appointment and an appointment never
//! exists without the slot it references being held.
//!
//! Every mutating operation runs as one store transaction:
//!
//! 1. lock the row(s) the operation depends on (`SELECT ... FOR UPDATE`),
//! 2. check availability under that lock,
//! 3. mutate the appointment and flip slot availability,
//! 4. commit, or roll back on the first failure.
//!
//! Mutual exclusion comes entirely from the store's row locks. Contenders
//! for one slot queue on the lock; the loser re-reads the row after the
//! winner commits, finds it unavailable and fails with
//! [`BookingError::SlotUnavailable`]. Nothing is retried here.

use async_trait::async_trait;
use clinic_core::{
    errors::{BookingError, BookingResult, Operation},
    models::appointment::{Appointment, CreateAppointmentRequest, UpdateAppointmentRequest},
};
use eyre::eyre;
use tracing::{debug, error, info, warn};

use crate::store::{BookingStore, BookingTx};

pub const DELETE_CONFIRMATION: &str =
    "Appointment deleted successfully and doctor's slot is now available";

/// The booking operations exposed to the HTTP layer.
#[async_trait]
pub trait AppointmentService: Send + Sync {
    async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> BookingResult<Appointment>;

    async fn update_appointment(
        &self,
        id: i32,
        request: UpdateAppointmentRequest,
    ) -> BookingResult<Appointment>;

    async fn delete_appointment(&self, id: i32) -> BookingResult<String>;

    async fn get_appointments(&self, patient_id: i32) -> BookingResult<Vec<Appointment>>;
}

pub struct BookingCoordinator<S> {
    store: S,
}

impl<S: BookingStore> BookingCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn begin(&self, operation: Operation) -> BookingResult<S::Tx> {
        self.store.begin().await.map_err(|e| {
            error!("Could not open transaction while {} appointment: {:?}", operation, e);
            BookingError::persistence(operation, e)
        })
    }

    /// Attaches patient and doctor profiles. Lookups run outside the booking
    /// transaction; a failed lookup leaves the profile empty.
    async fn enrich(&self, mut appointment: Appointment) -> Appointment {
        appointment.patient = match self.store.patient_profile(appointment.patient_id).await {
            Ok(patient) => patient,
            Err(e) => {
                warn!(
                    "Patient lookup failed for appointment {}: {:?}",
                    appointment.id, e
                );
                None
            }
        };

        appointment.doctor = match self.store.doctor_profile(appointment.doctor_id).await {
            Ok(doctor) => doctor,
            Err(e) => {
                warn!(
                    "Doctor lookup failed for appointment {}: {:?}",
                    appointment.id, e
                );
                None
            }
        };

        appointment
    }
}

/// Ends the transaction: commit on success, otherwise roll back and return
/// the failure classified as a domain error or a persistence failure.
async fn settle<T: BookingTx, V>(
    tx: T,
    outcome: eyre::Result<V>,
    operation: Operation,
) -> BookingResult<V> {
    match outcome {
        Ok(value) => match tx.commit().await {
            Ok(()) => Ok(value),
            Err(e) => {
                error!("Commit failed while {} appointment: {:?}", operation, e);
                Err(BookingError::persistence(operation, e))
            }
        },
        Err(report) => {
            if let Err(rollback_error) = tx.rollback().await {
                error!(
                    "Rollback failed while {} appointment: {:?}",
                    operation, rollback_error
                );
            }

            let err = BookingError::classify(report, operation);
            match &err {
                BookingError::PersistenceFailure { source, .. } => {
                    error!("{}: {:?}", err, source);
                }
                domain => warn!("Rejected while {} appointment: {}", operation, domain),
            }
            Err(err)
        }
    }
}

fn ensure_on_boundary(request: &CreateAppointmentRequest) -> BookingResult<()> {
    let key = request.slot_key();
    if key.is_on_boundary() {
        Ok(())
    } else {
        warn!(
            "Requested time {} for doctor {} is not on a slot boundary",
            key.time, key.doctor_id
        );
        Err(BookingError::SlotUnavailable)
    }
}

async fn book<T: BookingTx>(
    tx: &mut T,
    request: &CreateAppointmentRequest,
) -> eyre::Result<Appointment> {
    let key = request.slot_key();
    let slot_id = tx
        .lock_available_slot(&key)
        .await?
        .ok_or(BookingError::SlotUnavailable)?;
    debug!("Locked slot {} for doctor {} at {} {}", slot_id, key.doctor_id, key.date, key.time);

    let appointment = tx
        .insert_appointment(request)
        .await?
        .ok_or_else(|| eyre!("Insert returned no appointment row"))?;

    tx.mark_slot_unavailable(slot_id).await?;
    Ok(appointment)
}

async fn rebook<T: BookingTx>(
    tx: &mut T,
    id: i32,
    request: &UpdateAppointmentRequest,
) -> eyre::Result<Appointment> {
    let original = tx
        .lock_appointment(id)
        .await?
        .ok_or(BookingError::AppointmentNotFound)?;
    ensure_on_boundary(request)?;

    // The appointment row lock already makes this caller the only one moving
    // this booking, so the old slot is released without locking it.
    let released = tx.release_slot(&original.slot_key()).await?;
    debug!("Released {} slot(s) held by appointment {}", released, id);

    let slot_id = tx
        .lock_available_slot(&request.slot_key())
        .await?
        .ok_or(BookingError::SlotUnavailable)?;

    let appointment = tx
        .update_appointment(id, request)
        .await?
        .ok_or_else(|| eyre!("Update returned no appointment row"))?;

    tx.mark_slot_unavailable(slot_id).await?;
    Ok(appointment)
}

async fn cancel<T: BookingTx>(tx: &mut T, id: i32) -> eyre::Result<()> {
    let key = tx
        .delete_appointment(id)
        .await?
        .ok_or(BookingError::AppointmentNotFound)?;

    let released = tx.release_slot(&key).await?;
    if released == 0 {
        warn!(
            "Appointment {} referenced no slot for doctor {} at {} {}",
            id, key.doctor_id, key.date, key.time
        );
    }
    Ok(())
}

#[async_trait]
impl<S: BookingStore> AppointmentService for BookingCoordinator<S> {
    async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> BookingResult<Appointment> {
        ensure_on_boundary(&request)?;

        let mut tx = self.begin(Operation::Creating).await?;
        let outcome = book(&mut tx, &request).await;
        let appointment = settle(tx, outcome, Operation::Creating).await?;

        info!(
            "Appointment {} booked: patient={}, doctor={}, date={}, time={}",
            appointment.id,
            appointment.patient_id,
            appointment.doctor_id,
            appointment.appointment_date,
            appointment.time
        );
        Ok(self.enrich(appointment).await)
    }

    async fn update_appointment(
        &self,
        id: i32,
        request: UpdateAppointmentRequest,
    ) -> BookingResult<Appointment> {
        let mut tx = self.begin(Operation::Updating).await?;
        let outcome = rebook(&mut tx, id, &request).await;
        let appointment = settle(tx, outcome, Operation::Updating).await?;

        info!(
            "Appointment {} rebooked: doctor={}, date={}, time={}",
            appointment.id, appointment.doctor_id, appointment.appointment_date, appointment.time
        );
        Ok(self.enrich(appointment).await)
    }

    async fn delete_appointment(&self, id: i32) -> BookingResult<String> {
        let mut tx = self.begin(Operation::Deleting).await?;
        let outcome = cancel(&mut tx, id).await;
        settle(tx, outcome, Operation::Deleting).await?;

        info!("Appointment {} deleted", id);
        Ok(DELETE_CONFIRMATION.to_string())
    }

    async fn get_appointments(&self, patient_id: i32) -> BookingResult<Vec<Appointment>> {
        let appointments = self
            .store
            .appointments_for_patient(patient_id)
            .await
            .map_err(|e| {
                error!("Error retrieving appointments for patient {}: {:?}", patient_id, e);
                BookingError::persistence(Operation::Retrieving, e)
            })?;

        if appointments.is_empty() {
            return Err(BookingError::NoAppointmentsFound);
        }

        Ok(appointments)
    }
}
