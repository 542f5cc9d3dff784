//! Core types, session handling, and attribution for the BoltPromo tracker.

pub mod attribution;
pub mod error;
pub mod events;
pub mod limits;
pub mod session;
pub mod urgency;

pub use attribution::*;
pub use error::{DeliveryErrorCode, Error, Result};
pub use events::*;
pub use session::*;
pub use urgency::{Countdown, UrgencyLevel};
