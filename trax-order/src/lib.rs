pub mod models;
pub mod orchestrator;
pub mod sweeper;

pub use models::{PassengerSpec, SubmitRequest};
pub use orchestrator::BookingOrchestrator;
pub use sweeper::Sweeper;
