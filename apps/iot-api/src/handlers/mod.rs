//! Handlers 模块

pub mod api;
pub mod devices;
pub mod discovery;
pub mod protocols;
pub mod system;

pub use api::*;
pub use devices::*;
pub use discovery::*;
pub use protocols::*;
pub use system::*;
