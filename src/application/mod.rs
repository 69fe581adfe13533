//! Application layer: the ledger services and the engine facade that wires them together.
//!
//! Each service is a thin orchestration over the domain rules. Reads go straight to the
//! store; every mutation is assembled into one guarded `WriteBatch` and committed once.

pub mod carts;
pub mod check_in;
pub mod context;
pub mod engine;
pub mod line_items;
pub mod payment_methods;
pub mod payments;
pub mod settlement;
pub mod transfers;

#[cfg(test)]
pub(crate) mod test_support;
