pub mod evaluation;
pub mod probe;
pub mod system;

pub use evaluation::{AlertEvaluator, AlertState, ConditionKey, Evaluation, FiredAlert};
pub use probe::HealthProbe;
pub use system::SystemSampler;
