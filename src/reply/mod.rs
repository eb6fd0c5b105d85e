//! Reply formatting and delivery.

pub mod delivery;
pub mod formatter;

pub use delivery::deliver;
pub use formatter::{format_result, OutboundPost};
