//! Construction-time configuration: per-block limits and pack sizing.

/// Per-block resource ceilings. Mirrors the "Limits record" of the external
/// interface contract: everything the scheduler enforces that isn't derived
/// from a single transaction's own cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_cost_per_block: u64,
    pub max_vote_cost_per_block: u64,
    pub max_write_cost_per_acct: u64,
    pub max_txn_per_microblock: u64,
    pub max_microblocks_per_block: u64,
    pub max_data_bytes_per_block: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_cost_per_block: 48_000_000,
            max_vote_cost_per_block: 36_000_000,
            max_write_cost_per_acct: 12_000_000,
            max_txn_per_microblock: 128,
            max_microblocks_per_block: 16 * 1024,
            max_data_bytes_per_block: 32 * 1024 * 1024,
        }
    }
}

/// Bytes charged against `max_data_bytes_per_block` for every non-empty
/// microblock: a 32-byte hash, an 8-byte hash count, and an 8-byte
/// transaction count.
pub const MICROBLOCK_DATA_OVERHEAD: u64 = 48;

/// Default capacity of the `written_list` bulk-undo optimization in
/// `end_block`. Beyond this many distinct writers touched in one block, the
/// whole writer-costs table is cleared instead of walked in reverse.
pub const DEFAULT_WRITTEN_LIST_MAX: usize = 16384;

/// Heuristic compute cost of a typical vote transaction, used to size the
/// vote-reserved transaction count in `schedule_next_microblock`.
pub const TYPICAL_VOTE_COST: u64 = 2_100;

/// Floor compute cost below which a cost estimate is treated as implausible.
pub const MIN_TXN_COST: u64 = 150;

/// Minimum plausible serialized transaction size in bytes.
pub const MIN_SERIALIZED_SZ: u64 = 64;

/// Maximum distinct accounts (writable + non-unwritable readonly) a single
/// transaction may reference.
pub const MAX_ACCOUNTS_PER_TXN: usize = 64;

/// Number of scarce conflict-check bits available for the fast path. Account
/// references beyond this count map to `SLOWPATH` and always take the slow,
/// exact per-account check.
pub const BITSET_MAX: usize = 128;

/// Upper bound on concurrently active bank tiles. Bounded to 62 rather than
/// 64 because `acct_in_use`'s 64-bit word reserves its top two bits for the
/// `WRITABLE` and `BIT_CLEARED` flags (see `addr_use`).
pub const MAX_BANK_TILES: usize = 62;
