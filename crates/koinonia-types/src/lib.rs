//! Koinonia Types - Pure type definitions for the prayer-platform backend
//!
//! This crate contains only serde data types with no async runtime or database
//! dependencies, so it can be shared by every other crate (and a future API
//! crate) without pulling in the storage stack.

pub mod group;
pub mod meeting;
pub mod notification;
pub mod org;
pub mod preference;
pub mod request;
pub mod tag;
pub mod token;
pub mod user;

pub use group::*;
pub use meeting::*;
pub use notification::*;
pub use org::*;
pub use preference::*;
pub use request::*;
pub use tag::*;
pub use token::*;
pub use user::*;
