use async_trait::async_trait;
use clinic_core::{
    errors::BookingResult,
    models::appointment::{Appointment, CreateAppointmentRequest, UpdateAppointmentRequest},
};
use mockall::mock;

use crate::booking::AppointmentService;

// Mock of the booking operations for exercising the HTTP layer
mock! {
    pub Coordinator {}

    #[async_trait]
    impl AppointmentService for Coordinator {
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
}
