//! Response bodies.

mod error_response;
mod monitors;
mod processing;
mod tasks;

pub use error_response::ErrorResponse;
pub use monitors::HealthResponse;
pub use processing::AssistantResponse;
pub use tasks::{TaskStatus, TaskSubmission};
