mod classify;
mod config;
mod memory;
mod model;
mod order;
mod selection;
mod session;
mod store;
mod validate;

pub use crate::classify::*;
pub use crate::config::*;
pub use crate::memory::*;
pub use crate::model::*;
pub use crate::order::*;
pub use crate::selection::*;
pub use crate::session::*;
pub use crate::store::*;
pub use crate::validate::*;
