use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    profile::{DoctorProfile, PatientProfile},
    slot::SlotKey,
};

/// A booked appointment. `patient` and `doctor` are only filled on
/// responses to create/update and serialize as `null` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i32,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub appointment_date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub patient: Option<PatientProfile>,
    #[serde(default)]
    pub doctor: Option<DoctorProfile>,
}

impl Appointment {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.doctor_id, self.appointment_date, self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_id: i32,
    pub doctor_id: i32,
    pub appointment_date: NaiveDate,
    pub time: NaiveTime,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.doctor_id, self.appointment_date, self.time)
    }
}

/// Replacement field values for an existing appointment. Every field is
/// written, so a move to another doctor, date or time is a full rebooking.
pub type UpdateAppointmentRequest = CreateAppointmentRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAppointmentResponse {
    pub message: String,
}
