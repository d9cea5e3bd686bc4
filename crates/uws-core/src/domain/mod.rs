//! Domain model (ids, phases, job records, expiry, errors).

pub mod errors;
pub mod expiry;
pub mod ids;
pub mod job;
pub mod phase;

pub use self::errors::UwsError;
pub use self::expiry::ExpiryPolicy;
pub use self::ids::JobId;
pub use self::job::{
    ErrorSummary, ErrorType, JobList, JobRecord, Parameter, ResultReference, ShortJobDescription,
    UWS_VERSION, validate_parameters,
};
pub use self::phase::{ExecutionPhase, PhaseAction};
