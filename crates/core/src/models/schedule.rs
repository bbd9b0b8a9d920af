use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::slot::{is_slot_boundary, SLOT_MINUTES};

/// A doctor's working window on one day. Slots are tiled out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: i32,
    pub doctor_id: i32,
    pub available_date: NaiveDate,
    pub start_appointment: NaiveTime,
    pub end_appointment: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub doctor_id: i32,
    pub available_date: NaiveDate,
    pub start_appointment: NaiveTime,
    pub end_appointment: NaiveTime,
}

impl CreateScheduleRequest {
    /// Consecutive `[start, end)` windows of `length` covering the working
    /// window. A trailing window that would overrun the end is dropped.
    pub fn slot_windows(&self, length: Duration) -> Vec<(NaiveTime, NaiveTime)> {
        let mut windows = Vec::new();
        if length <= Duration::zero() {
            return windows;
        }

        let mut start = self.start_appointment;
        while start < self.end_appointment {
            let (end, wrapped) = start.overflowing_add_signed(length);
            // Wrapping past midnight means the window cannot fit in this day.
            if wrapped != 0 || end > self.end_appointment {
                break;
            }
            windows.push((start, end));
            start = end;
        }

        windows
    }

    pub fn default_slot_windows(&self) -> Vec<(NaiveTime, NaiveTime)> {
        self.slot_windows(Duration::minutes(SLOT_MINUTES as i64))
    }

    /// Both ends of the working window sit on slot boundaries, so every
    /// tiled slot starts at a time a booking may ask for.
    pub fn is_aligned(&self) -> bool {
        is_slot_boundary(self.start_appointment) && is_slot_boundary(self.end_appointment)
    }
}
