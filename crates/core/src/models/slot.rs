use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Length of one bookable slot, in minutes.
pub const SLOT_MINUTES: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: i32,
    pub doctor_id: i32,
    pub schedule_id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    /// Whether `key` falls inside this slot's `[start, end)` window.
    pub fn matches(&self, key: &SlotKey) -> bool {
        self.doctor_id == key.doctor_id
            && self.date == key.date
            && self.start_time <= key.time
            && key.time < self.end_time
    }
}

/// The (doctor, date, time) triple an appointment holds a slot by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotKey {
    pub doctor_id: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl SlotKey {
    pub fn new(doctor_id: i32, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            doctor_id,
            date,
            time,
        }
    }

    /// True when the time sits exactly on a slot boundary.
    pub fn is_on_boundary(&self) -> bool {
        is_slot_boundary(self.time)
    }
}

/// Whole half hours only: minutes 0 or 30, no seconds.
pub fn is_slot_boundary(time: NaiveTime) -> bool {
    time.minute() % SLOT_MINUTES == 0 && time.second() == 0 && time.nanosecond() == 0
}
