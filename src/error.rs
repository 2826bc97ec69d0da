//! Error and status types for the packing core.
//!
//! Rejections during admission and construction are ordinary, caller
//! observable `Result` values. A `PackError` on the other hand is never
//! expected in a correct caller/core pair; it indicates an invariant was
//! violated and the process should abort rather than limp on with
//! inconsistent internal state.

use thiserror::Error;

/// Why a candidate transaction was not admitted to a pool.
///
/// `Unaffordable` is kept for callers that layer a fee-payer balance check in
/// front of [`crate::pack::Pack::insert_fini`]; the core itself never
/// produces it, since affordability checking is explicitly out of scope (see
/// `fd_pack_can_fee_payer_afford` in the design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("cost estimator returned zero compute")]
    EstimationFail,
    #[error("fee payer cannot afford this transaction")]
    Unaffordable,
    #[error("compute estimate exceeds the per-block budget")]
    TooLarge,
    #[error("transaction references too many accounts")]
    AccountCnt,
    #[error("transaction references the same account twice")]
    DuplicateAcct,
    #[error("transaction writes to an unwritable account")]
    WritesSysvar,
    #[error("a transaction with this signature is already pending")]
    Duplicate,
    #[error("transaction has already expired")]
    Expired,
    #[error("transaction uses an address lookup table")]
    AddrLut,
    #[error("pool is at capacity and this transaction does not outrank the worst pending entry")]
    Priority,
}

/// How an admitted transaction was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptKind {
    VoteAdd,
    VoteReplace,
    NonvoteAdd,
    NonvoteReplace,
}

/// Failures that can occur constructing a [`crate::pack::Pack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("pack_depth must be at least 4, got {0}")]
    PackDepthTooSmall(usize),
    #[error("bank_tile_cnt must be in [1, {max}], got {got}")]
    BankTileCntOutOfRange { got: usize, max: usize },
}

/// Invariant violation discovered by [`crate::pack::Pack::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("pending_txn_cnt does not match signature-map size")]
    CountMismatch,
    #[error("a treap entry is missing from the expiration heap")]
    MissingFromExpq,
    #[error("an entry's root tag does not match the treap it was found in")]
    RootMismatch,
    #[error("an expiration heap entry does not point back to a treap entry")]
    DanglingExpqEntry,
    #[error("account bitset-slot reference counts do not match pending account usage")]
    RefCountMismatch,
    #[error("an entry's bitset summary is inconsistent with its accounts")]
    BitsetMismatch,
    #[error("a treap's descending priority order is violated")]
    OrderViolation,
    #[error("the available-bit stack and assigned bits are not a disjoint partition")]
    BitsetPartitionBroken,
    #[error("an in-use account is missing the bank bit for a bank that references it")]
    UseByBankMismatch,
    #[error("w_in_use is not a subset of rw_in_use")]
    WNotSubsetOfRw,
}

/// Bugs in the caller or the core: these never happen in correct use and are
/// not meant to be caught and handled, only logged and propagated as a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("rebate referenced a writer account with no writer-cost entry")]
    RebateUnknownWriter,
    #[error("executed_cus ({executed}) exceeds requested_cus ({requested})")]
    ExecutedExceedsRequested { executed: u64, requested: u64 },
    #[error("transaction reported EXECUTE_SUCCESS=false but executed_cus > 0")]
    FailedTxnWithNonzeroExecution,
    #[error("microblock_complete referenced an account with no acct_in_use entry")]
    CompletionUnknownAccount,
}
