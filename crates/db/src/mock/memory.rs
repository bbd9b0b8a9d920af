//! An in-process [`BookingStore`] for tests.
//!
//! A transaction takes the whole table set behind an async mutex, works on a
//! staged copy and writes it back on commit. Transactions therefore run one
//! at a time, which is stricter than row locking but keeps the same
//! observable outcome for the booking protocol. Faults can be armed to make
//! a given step fail.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::Utc;
use clinic_core::models::{
    appointment::{Appointment, CreateAppointmentRequest, UpdateAppointmentRequest},
    profile::{DoctorProfile, PatientProfile},
    schedule::{CreateScheduleRequest, Schedule},
    slot::{Slot, SlotKey},
};
use eyre::{eyre, Result};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::store::{BookingStore, BookingTx};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Begin,
    LockSlot,
    MarkSlot,
    ReleaseSlot,
    InsertAppointment,
    /// The insert succeeds but returns no row.
    InsertReturnsNothing,
    LockAppointment,
    UpdateAppointment,
    DeleteAppointment,
    Commit,
    Rollback,
    ProfileLookup,
    ReadAppointments,
}

type Faults = Arc<Mutex<HashSet<Fault>>>;

fn armed(faults: &Faults, fault: Fault) -> bool {
    faults
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .contains(&fault)
}

fn check(faults: &Faults, fault: Fault) -> Result<()> {
    if armed(faults, fault) {
        Err(eyre!("injected store fault: {:?}", fault))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub schedules: Vec<Schedule>,
    pub slots: Vec<Slot>,
    pub appointments: Vec<Appointment>,
    pub patients: HashMap<i32, PatientProfile>,
    pub doctors: HashMap<i32, DoctorProfile>,
    next_schedule_id: i32,
    next_slot_id: i32,
    next_appointment_id: i32,
}

impl Tables {
    pub fn slot_at(&self, key: &SlotKey) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.matches(key))
    }

    /// Appointments currently referencing `slot`.
    pub fn holders(&self, slot: &Slot) -> usize {
        self.appointments
            .iter()
            .filter(|appointment| slot.matches(&appointment.slot_key()))
            .count()
    }

    fn next_appointment_id(&mut self) -> i32 {
        self.next_appointment_id += 1;
        self.next_appointment_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<AsyncMutex<Tables>>,
    faults: Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_at(&self, fault: Fault) {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(fault);
    }

    pub fn clear_faults(&self) {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub async fn add_patient(&self, patient: PatientProfile) {
        self.tables.lock().await.patients.insert(patient.id, patient);
    }

    pub async fn add_doctor(&self, doctor: DoctorProfile) {
        self.tables.lock().await.doctors.insert(doctor.id, doctor);
    }

    /// Stores the schedule and tiles it into available slots. Windows off
    /// the half-hour grid are rejected, as the Postgres schema does.
    pub async fn add_schedule(&self, request: &CreateScheduleRequest) -> Result<Vec<Slot>> {
        if !request.is_aligned() {
            return Err(eyre!(
                "Schedule window {}-{} for doctor {} is not on half-hour boundaries",
                request.start_appointment,
                request.end_appointment,
                request.doctor_id
            ));
        }

        let mut tables = self.tables.lock().await;

        tables.next_schedule_id += 1;
        let schedule_id = tables.next_schedule_id;
        tables.schedules.push(Schedule {
            id: schedule_id,
            doctor_id: request.doctor_id,
            available_date: request.available_date,
            start_appointment: request.start_appointment,
            end_appointment: request.end_appointment,
        });

        let mut created = Vec::new();
        for (start_time, end_time) in request.default_slot_windows() {
            tables.next_slot_id += 1;
            let slot = Slot {
                id: tables.next_slot_id,
                doctor_id: request.doctor_id,
                schedule_id,
                date: request.available_date,
                start_time,
                end_time,
                is_available: true,
                updated_at: Utc::now(),
            };
            tables.slots.push(slot.clone());
            created.push(slot);
        }

        Ok(created)
    }

    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }

    pub async fn slot_at(&self, key: &SlotKey) -> Option<Slot> {
        self.tables.lock().await.slot_at(key).cloned()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    faults: Faults,
}

#[async_trait]
impl BookingTx for MemoryTx {
    async fn lock_available_slot(&mut self, key: &SlotKey) -> Result<Option<i32>> {
        check(&self.faults, Fault::LockSlot)?;
        Ok(self
            .staged
            .slots
            .iter()
            .find(|slot| slot.is_available && slot.matches(key))
            .map(|slot| slot.id))
    }

    async fn mark_slot_unavailable(&mut self, slot_id: i32) -> Result<()> {
        check(&self.faults, Fault::MarkSlot)?;
        if let Some(slot) = self.staged.slots.iter_mut().find(|slot| slot.id == slot_id) {
            slot.is_available = false;
            slot.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn release_slot(&mut self, key: &SlotKey) -> Result<u64> {
        check(&self.faults, Fault::ReleaseSlot)?;
        let mut released = 0;
        for slot in self.staged.slots.iter_mut().filter(|slot| slot.matches(key)) {
            slot.is_available = true;
            slot.updated_at = Utc::now();
            released += 1;
        }
        Ok(released)
    }

    async fn insert_appointment(
        &mut self,
        request: &CreateAppointmentRequest,
    ) -> Result<Option<Appointment>> {
        check(&self.faults, Fault::InsertAppointment)?;
        if armed(&self.faults, Fault::InsertReturnsNothing) {
            return Ok(None);
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: self.staged.next_appointment_id(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            appointment_date: request.appointment_date,
            time: request.time,
            reason: request.reason.clone(),
            status: request.status.clone(),
            created_at: now,
            updated_at: now,
            patient: None,
            doctor: None,
        };
        self.staged.appointments.push(appointment.clone());
        Ok(Some(appointment))
    }

    async fn lock_appointment(&mut self, id: i32) -> Result<Option<Appointment>> {
        check(&self.faults, Fault::LockAppointment)?;
        Ok(self
            .staged
            .appointments
            .iter()
            .find(|appointment| appointment.id == id)
            .cloned())
    }

    async fn update_appointment(
        &mut self,
        id: i32,
        request: &UpdateAppointmentRequest,
    ) -> Result<Option<Appointment>> {
        check(&self.faults, Fault::UpdateAppointment)?;
        let Some(appointment) = self
            .staged
            .appointments
            .iter_mut()
            .find(|appointment| appointment.id == id)
        else {
            return Ok(None);
        };

        appointment.patient_id = request.patient_id;
        appointment.doctor_id = request.doctor_id;
        appointment.appointment_date = request.appointment_date;
        appointment.time = request.time;
        appointment.reason = request.reason.clone();
        appointment.status = request.status.clone();
        appointment.updated_at = Utc::now();
        Ok(Some(appointment.clone()))
    }

    async fn delete_appointment(&mut self, id: i32) -> Result<Option<SlotKey>> {
        check(&self.faults, Fault::DeleteAppointment)?;
        let position = self
            .staged
            .appointments
            .iter()
            .position(|appointment| appointment.id == id);
        Ok(position.map(|index| self.staged.appointments.remove(index).slot_key()))
    }

    async fn commit(self) -> Result<()> {
        let MemoryTx {
            mut guard,
            staged,
            faults,
        } = self;
        check(&faults, Fault::Commit)?;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        check(&self.faults, Fault::Rollback)
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx> {
        check(&self.faults, Fault::Begin)?;
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx {
            guard,
            staged,
            faults: self.faults.clone(),
        })
    }

    async fn patient_profile(&self, id: i32) -> Result<Option<PatientProfile>> {
        check(&self.faults, Fault::ProfileLookup)?;
        Ok(self.tables.lock().await.patients.get(&id).cloned())
    }

    async fn doctor_profile(&self, id: i32) -> Result<Option<DoctorProfile>> {
        check(&self.faults, Fault::ProfileLookup)?;
        Ok(self.tables.lock().await.doctors.get(&id).cloned())
    }

    async fn appointments_for_patient(&self, patient_id: i32) -> Result<Vec<Appointment>> {
        check(&self.faults, Fault::ReadAppointments)?;
        let mut appointments: Vec<Appointment> = self
            .tables
            .lock()
            .await
            .appointments
            .iter()
            .filter(|appointment| appointment.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|appointment| (appointment.appointment_date, appointment.time));
        Ok(appointments)
    }
}
