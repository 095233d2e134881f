//! Data crossing the browser boundary and the UI event bus.
//!
//! - [`payload`]: inbound records decoded from bridge callbacks.
//! - [`events`]: notifications the controller broadcasts to UI subscribers.

pub mod events;
pub mod payload;
