use axum::http::StatusCode;
use clinic_api::middleware::{
    auth::{require_role, Caller},
    error_handling::{map_error, AppError},
};
use clinic_core::{
    errors::{BookingError, Operation},
    models::identity::{CallerIdentity, Role},
};
use rstest::rstest;

#[rstest]
#[case(BookingError::SlotUnavailable, StatusCode::BAD_REQUEST)]
#[case(BookingError::AppointmentNotFound, StatusCode::NOT_FOUND)]
#[case(BookingError::NoAppointmentsFound, StatusCode::NOT_FOUND)]
#[case(
    BookingError::persistence(Operation::Deleting, eyre::eyre!("deadlock detected")),
    StatusCode::INTERNAL_SERVER_ERROR
)]
fn booking_errors_map_to_status(#[case] error: BookingError, #[case] expected: StatusCode) {
    let response = map_error(error);

    assert_eq!(response.status(), expected);
}

#[rstest]
#[case(Role::Admin, true)]
#[case(Role::Patient, true)]
#[case(Role::Doctor, false)]
fn delete_roles(#[case] role: Role, #[case] allowed: bool) {
    let caller = Caller(CallerIdentity { user_id: 5, role });

    let outcome = require_role(&caller, &[Role::Admin, Role::Patient]);

    assert_eq!(outcome.is_ok(), allowed);
    if let Err(err) = outcome {
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}

#[test]
fn unauthorized_maps_to_401() {
    let error = AppError::Unauthorized("A caller identity is required".to_string());

    assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
}
