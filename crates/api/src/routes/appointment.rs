use axum::{
    routing::{post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/appointments", post(handlers::appointment::create_appointment))
        // GET reads the segment as a patient id; the router needs one name per position
        .route(
            "/appointments/:id",
            put(handlers::appointment::update_appointment)
                .delete(handlers::appointment::delete_appointment)
                .get(handlers::appointment::get_appointments),
        )
}
