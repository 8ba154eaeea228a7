// Domain layer: launch and placement models plus ports. No process or filesystem access here.

pub mod model;
pub mod placement;
pub mod ports;
