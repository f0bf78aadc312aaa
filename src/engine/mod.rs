// Core arbitrage logic: spread evaluation, simulated ledger, loop control
pub mod types;
pub mod spread;
pub mod ledger;
pub mod arb_loop;

pub use types::*;
