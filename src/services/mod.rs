// Service exports
pub mod host;

pub use host::HostProbe;
