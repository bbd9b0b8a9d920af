use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use clinic_core::models::{
    appointment::{
        Appointment, CreateAppointmentRequest, DeleteAppointmentResponse,
        UpdateAppointmentRequest,
    },
    identity::Role,
};
use std::sync::Arc;

use crate::{
    middleware::{
        auth::{require_role, Caller},
        error_handling::AppError,
    },
    ApiState,
};

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<ApiState>>,
    Caller(caller): Caller,
    Json(payload): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    tracing::debug!(
        "Caller {} booking doctor {} on {} at {}",
        caller.user_id,
        payload.doctor_id,
        payload.appointment_date,
        payload.time
    );

    let appointment = state.appointments.create_appointment(payload).await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<ApiState>>,
    Caller(caller): Caller,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    tracing::debug!("Caller {} moving appointment {}", caller.user_id, id);

    let appointment = state.appointments.update_appointment(id, payload).await?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    Path(id): Path<i32>,
) -> Result<Json<DeleteAppointmentResponse>, AppError> {
    require_role(&caller, &[Role::Admin, Role::Patient])?;

    let message = state.appointments.delete_appointment(id).await?;

    Ok(Json(DeleteAppointmentResponse { message }))
}

/// Lists a patient's appointments, earliest first
#[axum::debug_handler]
pub async fn get_appointments(
    State(state): State<Arc<ApiState>>,
    Caller(_caller): Caller,
    Path(patient_id): Path<i32>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = state.appointments.get_appointments(patient_id).await?;

    Ok(Json(appointments))
}
