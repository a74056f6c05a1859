pub mod operation;

pub use operation::{OperationService, Repo};
