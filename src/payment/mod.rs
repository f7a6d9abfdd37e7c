mod gateway;
mod reconciler;

pub use gateway::*;
pub use reconciler::*;
