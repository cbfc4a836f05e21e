mod error;
mod normalize;
mod subflow;

pub use error::{AnalysisError, Result};
pub use normalize::normalize;
pub use subflow::{step_for_fragment, subflow_spec, subflow_steps, FlowReturn, FlowValue, SubflowSpec};
