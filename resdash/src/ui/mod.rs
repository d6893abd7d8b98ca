//! Client-side dashboard logic, independent of any UI toolkit.
//!
//! - [`state`]: [`Session`](state::Session), events, and the pure [`transition`](state::transition) function
//! - [`filter`]: name-prefix filtering of loaded records
//! - [`render`]: [`View`](render::View) description of what to draw
//! - [`driver`]: runs commands against a [`Backend`](driver::Backend)

pub mod driver;
pub mod filter;
pub mod render;
pub mod state;

pub use driver::{Backend, Driver};
pub use filter::filter_records;
pub use render::{View, render};
pub use state::{Command, Event, Failure, RecordKey, Session, ViewState, transition};
