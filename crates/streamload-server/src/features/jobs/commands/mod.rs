pub mod abort;
pub mod enqueue;

pub use abort::{AbortJobCommand, AbortJobError};
pub use enqueue::{EnqueueUrlCommand, EnqueueUrlError};
