//! Wire format for the job-execution service.
//!
//! A job definition is a generic JSON tree with `objects`, `parameters`
//! and `values` sections. The execution service wants three flat lists
//! instead; this crate performs that translation. Translation is a pure
//! function of the input (fields are emitted in sorted-key order), so
//! re-translating the same definition is byte-identical — which makes
//! retrying a submission safe.

pub mod error;
pub mod translate;
pub mod types;

pub use error::DefinitionError;
pub use translate::{to_wire_objects, to_wire_parameters, to_wire_values};
pub use types::*;
