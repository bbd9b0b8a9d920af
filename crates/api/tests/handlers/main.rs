#[path = "../test_utils.rs"]
mod test_utils;

mod appointment_test;
mod middleware_test;
