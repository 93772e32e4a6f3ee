//! Domain types and the ports through which the workflow reaches the outside world.

pub mod card;
pub mod money;
pub mod ports;
pub mod records;
