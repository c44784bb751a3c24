pub mod ai;
pub mod email;
pub mod file_write;
pub mod registry;
pub mod sheet_read;
pub mod sheet_write;
pub mod trigger;

pub use registry::{
    Component, ComponentRegistry, ComponentSpec, ParameterKind, ParameterSpec, SocketSpec,
};
