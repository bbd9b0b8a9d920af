use axum::http::StatusCode;
use axum_test::{TestRequest, TestServer};
use clinic_core::{
    errors::{BookingError, Operation},
    models::{
        appointment::{Appointment, DeleteAppointmentResponse},
        profile::{DoctorProfile, PatientProfile},
        schedule::CreateScheduleRequest,
    },
};
use clinic_db::{booking::DELETE_CONFIRMATION, mock::memory::MemoryStore};
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::test_utils::{
    appointment_for, at, booking_request, caller_headers, day, memory_server, TestContext,
    DOCTOR, PATIENT,
};

fn as_caller(request: TestRequest, user_id: i32, role: &str) -> TestRequest {
    caller_headers(user_id, role)
        .into_iter()
        .fold(request, |request, (name, value)| request.add_header(name, value))
}

#[tokio::test]
async fn create_returns_created_with_the_booking() {
    let mut ctx = TestContext::new();
    ctx.coordinator
        .expect_create_appointment()
        .withf(|request| request.time == at(9, 30))
        .times(1)
        .returning(|request| Ok(appointment_for(7, &request)));
    let server = ctx.into_server();

    let response = as_caller(server.post("/appointments"), PATIENT, "patient")
        .json(&booking_request(9, 30))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Appointment = response.json();
    assert_eq!(body.id, 7);
    assert_eq!(body.time, at(9, 30));
}

#[tokio::test]
async fn taken_slot_is_a_bad_request() {
    let mut ctx = TestContext::new();
    ctx.coordinator
        .expect_create_appointment()
        .returning(|_| Err(BookingError::SlotUnavailable));
    let server = ctx.into_server();

    let response = as_caller(server.post("/appointments"), PATIENT, "patient")
        .json(&booking_request(9, 0))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "The time slot is not available");
    assert_eq!(body["kind"], "SlotUnavailable");
}

#[tokio::test]
async fn persistence_failure_hides_the_store_error() {
    let mut ctx = TestContext::new();
    ctx.coordinator.expect_create_appointment().returning(|_| {
        Err(BookingError::persistence(
            Operation::Creating,
            eyre::eyre!("connection reset by peer"),
        ))
    });
    let server = ctx.into_server();

    let response = as_caller(server.post("/appointments"), PATIENT, "patient")
        .json(&booking_request(9, 0))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Error creating appointment");
    assert!(!response.text().contains("connection reset"));
}

#[tokio::test]
async fn update_of_missing_appointment_is_not_found() {
    let mut ctx = TestContext::new();
    ctx.coordinator
        .expect_update_appointment()
        .withf(|id, _| *id == 42)
        .returning(|_, _| Err(BookingError::AppointmentNotFound));
    let server = ctx.into_server();

    let response = as_caller(server.put("/appointments/42"), PATIENT, "patient")
        .json(&booking_request(10, 0))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["kind"], "AppointmentNotFound");
}

#[tokio::test]
async fn delete_requires_admin_or_patient() {
    let mut ctx = TestContext::new();
    ctx.coordinator.expect_delete_appointment().never();
    let server = ctx.into_server();

    let response = as_caller(server.delete("/appointments/3"), DOCTOR, "doctor").await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_can_delete() {
    let mut ctx = TestContext::new();
    ctx.coordinator
        .expect_delete_appointment()
        .withf(|id| *id == 3)
        .times(1)
        .returning(|_| Ok(DELETE_CONFIRMATION.to_string()));
    let server = ctx.into_server();

    let response = as_caller(server.delete("/appointments/3"), 1, "admin").await;

    response.assert_status_ok();
    let body: DeleteAppointmentResponse = response.json();
    assert_eq!(body.message, DELETE_CONFIRMATION);
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let mut ctx = TestContext::new();
    ctx.coordinator.expect_get_appointments().never();
    let server = ctx.into_server();

    let response = server.get("/appointments/10").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_role_is_unauthorized() {
    let ctx = TestContext::new();
    let server = ctx.into_server();

    let response = as_caller(server.get("/appointments/10"), PATIENT, "receptionist").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_history_is_not_found() {
    let mut ctx = TestContext::new();
    ctx.coordinator
        .expect_get_appointments()
        .withf(|patient_id| *patient_id == PATIENT)
        .returning(|_| Err(BookingError::NoAppointmentsFound));
    let server = ctx.into_server();

    let response = as_caller(server.get("/appointments/10"), PATIENT, "patient").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "No appointments found for this patient");
}

async fn clinic_day() -> TestServer {
    let store = MemoryStore::new();
    store
        .add_doctor(DoctorProfile {
            id: DOCTOR,
            first_name: "Ada".to_string(),
            last_name: "Moss".to_string(),
            email: "ada.moss@clinic.test".to_string(),
            specialization: None,
        })
        .await;
    store
        .add_patient(PatientProfile {
            id: PATIENT,
            first_name: "Rui".to_string(),
            last_name: "Tan".to_string(),
            email: "rui.tan@clinic.test".to_string(),
        })
        .await;
    store
        .add_schedule(&CreateScheduleRequest {
            doctor_id: DOCTOR,
            available_date: day(),
            start_appointment: at(9, 0),
            end_appointment: at(11, 0),
        })
        .await
        .unwrap();

    memory_server(store)
}

#[tokio::test]
async fn booking_lifecycle_over_http() {
    let server = clinic_day().await;

    let created = as_caller(server.post("/appointments"), PATIENT, "patient")
        .json(&booking_request(9, 0))
        .await;
    created.assert_status(StatusCode::CREATED);
    let booked: Appointment = created.json();
    assert_eq!(booked.doctor.map(|doctor| doctor.last_name), Some("Moss".to_string()));

    // Same slot again
    as_caller(server.post("/appointments"), PATIENT, "patient")
        .json(&booking_request(9, 0))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let moved = as_caller(server.put(&format!("/appointments/{}", booked.id)), PATIENT, "patient")
        .json(&booking_request(10, 30))
        .await;
    moved.assert_status_ok();
    let moved: Appointment = moved.json();
    assert_eq!(moved.time, at(10, 30));

    // The original slot is free again after the move
    as_caller(server.post("/appointments"), PATIENT, "patient")
        .json(&booking_request(9, 0))
        .await
        .assert_status(StatusCode::CREATED);

    let listed = as_caller(server.get("/appointments/10"), PATIENT, "patient").await;
    listed.assert_status_ok();
    let times: Vec<_> = listed
        .json::<Vec<Appointment>>()
        .into_iter()
        .map(|appointment| appointment.time)
        .collect();
    assert_eq!(times, vec![at(9, 0), at(10, 30)]);

    let deleted = as_caller(server.delete(&format!("/appointments/{}", booked.id)), PATIENT, "patient")
        .await;
    deleted.assert_status_ok();
    assert_eq!(deleted.json::<DeleteAppointmentResponse>().message, DELETE_CONFIRMATION);

    as_caller(server.delete(&format!("/appointments/{}", booked.id)), PATIENT, "patient")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn misaligned_time_is_rejected_over_http() {
    let server = clinic_day().await;

    let response = as_caller(server.post("/appointments"), PATIENT, "patient")
        .json(&booking_request(9, 15))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_needs_no_caller() {
    let server = TestContext::new().into_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: clinic_api::routes::health::HealthResponse = response.json();
    assert_eq!(body.status, "ok");
    assert_eq!(body.service, "clinic-api");
}
