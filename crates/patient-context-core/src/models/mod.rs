//! Domain models for the active patient context.

mod context;
mod event;
mod identifier;
mod route;
mod view;

pub use context::*;
pub use event::*;
pub use identifier::*;
pub use route::*;
pub use view::*;
