mod audit;
mod metrics;
mod movement;
mod reference;
mod validation;

pub use audit::*;
pub use metrics::*;
pub use movement::*;
pub use reference::*;
pub use validation::*;
