pub mod assignment;
pub mod cancellation;
pub mod overdue;
pub mod sequencer;
pub mod status;
