use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clinic_core::models::{
    appointment::Appointment,
    profile::{DoctorProfile, PatientProfile},
    schedule::Schedule,
    slot::{Slot, SlotKey},
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSchedule {
    pub id: i32,
    pub doctor_id: i32,
    pub available_date: NaiveDate,
    pub start_appointment: NaiveTime,
    pub end_appointment: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSlot {
    pub id: i32,
    pub doctor_id: i32,
    pub schedule_id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: i32,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub appointment_date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slot reference returned by a deleted appointment row.
#[derive(Debug, Clone, FromRow)]
pub struct DbHeldSlot {
    pub doctor_id: i32,
    pub appointment_date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbPatientProfile {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbDoctorProfile {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialization: Option<String>,
}

impl From<DbSchedule> for Schedule {
    fn from(row: DbSchedule) -> Self {
        Schedule {
            id: row.id,
            doctor_id: row.doctor_id,
            available_date: row.available_date,
            start_appointment: row.start_appointment,
            end_appointment: row.end_appointment,
        }
    }
}

impl From<DbSlot> for Slot {
    fn from(row: DbSlot) -> Self {
        Slot {
            id: row.id,
            doctor_id: row.doctor_id,
            schedule_id: row.schedule_id,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            is_available: row.is_available,
            updated_at: row.updated_at,
        }
    }
}

impl From<DbAppointment> for Appointment {
    fn from(row: DbAppointment) -> Self {
        Appointment {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            appointment_date: row.appointment_date,
            time: row.time,
            reason: row.reason,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            patient: None,
            doctor: None,
        }
    }
}

impl From<DbHeldSlot> for SlotKey {
    fn from(row: DbHeldSlot) -> Self {
        SlotKey::new(row.doctor_id, row.appointment_date, row.time)
    }
}

impl From<DbPatientProfile> for PatientProfile {
    fn from(row: DbPatientProfile) -> Self {
        PatientProfile {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
        }
    }
}

impl From<DbDoctorProfile> for DoctorProfile {
    fn from(row: DbDoctorProfile) -> Self {
        DoctorProfile {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            specialization: row.specialization,
        }
    }
}
