//! Priority-ordered, conflict-aware scheduler for packing transactions into
//! conflict-free microblocks across a fixed number of parallel bank tiles.
//!
//! See [`Pack`](pack::Pack) for the entry point.

pub mod addr_use;
pub mod admission;
pub mod arena;
pub mod bitset;
pub mod bitset_slots;
pub mod config;
pub mod cost;
pub mod error;
pub mod expq;
pub mod metrics;
pub mod pack;
pub mod scheduler;
pub mod sigmap;
pub mod treap;
pub mod txn;
pub mod unwritable;
pub mod writer_costs;

pub use config::Limits;
pub use cost::{CostEstimator, DefaultCostEstimator};
pub use error::{AcceptKind, ConfigError, PackError, RejectReason, VerifyError};
pub use pack::{ExecutedTxn, Pack, ScheduledTxn};
pub use txn::{AccountAddr, AccountMeta, AccountRole, RawTxn, Signature, TxnView};
