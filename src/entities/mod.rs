//! Measurement model types

pub mod correlation;
pub mod model;
pub mod variable;

pub use correlation::{CorrelationError, CorrelationMatrix};
pub use model::{InputSnapshot, MeasurementModel, ModelError};
pub use variable::{
    DegreesOfFreedom, Distribution, EvaluatedInput, InputError, UncertaintyType, ValuePoint,
    VariableRecord,
};
