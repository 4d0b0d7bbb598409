//! Infrastructure around the job core: the named registry that workers
//! dispatch through, the stored-column adapter for argument lists, and the
//! retry decision a scheduler applies after a failed run.

pub mod column;
pub mod registry;
pub mod retry;

pub use column::StoredArgs;
pub use registry::{JobRegistry, PreparedJob, RegistryError};
pub use retry::{Attempts, Failure, GiveUpReason, RetryDecision, decide};
