pub mod controller;
pub mod session;

pub use controller::WorkflowController;
pub use session::{Session, WorkflowState};
