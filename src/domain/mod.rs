// Domain layer: certificate models and the ports the rendering core depends on.

pub mod model;
pub mod ports;
