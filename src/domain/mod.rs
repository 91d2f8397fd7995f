// Domain layer: conversation/tool models and the ports the agent depends on.

pub mod model;
pub mod ports;
