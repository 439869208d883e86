pub mod convert;

pub use convert::LivenessProbe;
