pub mod daemonset;
pub mod env;
pub mod gate;
pub mod hash;
pub mod labels;
pub mod ports;
pub mod registry;
pub mod synthesis;
pub mod traits;
pub mod volume;
