//! REST client of the trip planner.
//!
//! [`ApiClient`] maps the backend endpoints, [`Session`] carries the bearer
//! credential explicitly and [`TripView`] keeps a trip's participants and
//! expenses in sync while running every local check from `engine` before a
//! request goes out.

pub use api::ApiClient;
pub use error::{ClientError, Result};
pub use generation::{Generations, Slot, Ticket};
pub use session::{Session, SessionStore};
pub use view::TripView;

mod api;
pub mod convert;
mod error;
mod generation;
mod session;
mod view;
