//! Domain layer: ledger entities, value objects and the ports the application layer
//! depends on.

pub mod batch;
pub mod check_in;
pub mod line_item;
pub mod money;
pub mod payment;
pub mod policy;
pub mod ports;
pub mod roster;
pub mod tax;
