use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trax_core::models::SeatClass;

/// One traveller on a submission. The identity string comes from the
/// passenger-profile system, which is outside this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerSpec {
    pub name: String,
    pub seat_class: SeatClass,
}

/// A booking request for one sub-journey on one scheduled run.
///
/// Origin and destination are station names; the orchestrator resolves them
/// to stop sequences through the stop index before anything else happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub user_id: String,
    pub schedule_id: Uuid,
    pub train_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub passengers: Vec<PassengerSpec>,
}
