//! The transaction wire contract: everything the packing core needs from a
//! parsed transaction, expressed as a trait so that a concrete transaction
//! format, address-lookup-table resolution, and signature verification all
//! stay external collaborators (see `SPEC_FULL.md` §1/§6).

/// A 32-byte account address. The core never interprets these bytes beyond
/// equality and hashing; they are opaque identifiers.
pub type AccountAddr = [u8; 32];

/// A 64-byte transaction signature. Only the first signature (signature 0)
/// is used by the core, as the transaction's dedup key.
pub type Signature = [u8; 64];

/// The access mode a transaction declares for one of its accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    Writable,
    Readonly,
}

/// One account reference inside a transaction's account list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub addr: AccountAddr,
    pub role: AccountRole,
}

impl AccountMeta {
    pub fn writable(addr: AccountAddr) -> Self {
        AccountMeta { addr, role: AccountRole::Writable }
    }

    pub fn readonly(addr: AccountAddr) -> Self {
        AccountMeta { addr, role: AccountRole::Readonly }
    }

    pub fn is_writable(&self) -> bool {
        self.role == AccountRole::Writable
    }
}

/// Everything the packing core needs to read from a parsed transaction.
///
/// Implementors are expected to resolve any address-lookup-table entries
/// before exposing a transaction through this trait; the core itself rejects
/// any transaction that still reports `uses_address_lookup_table() == true`
/// (reject reason `AddrLut`), matching "this core rejects ALT transactions".
pub trait TxnView {
    /// Serialized transaction bytes, opaque to the core.
    fn payload(&self) -> &[u8];

    /// Signature 0, used as the dedup key.
    fn signature0(&self) -> Signature;

    /// All accounts referenced by the transaction: writable and readonly,
    /// immediate (not looked up through an ALT).
    fn accounts(&self) -> &[AccountMeta];

    /// Number of transaction-level signatures (used by the default cost
    /// estimator; the core itself does not interpret this beyond passing it
    /// to the [`crate::cost::CostEstimator`]).
    fn signature_count(&self) -> u32;

    /// True if this is a simple vote transaction; vote transactions are
    /// tracked in a separate pool with their own quota.
    fn is_simple_vote(&self) -> bool;

    /// True if any account is resolved through an address lookup table.
    /// The core rejects such transactions with `AddrLut` rather than
    /// attempting to resolve them itself.
    fn uses_address_lookup_table(&self) -> bool;
}

/// A minimal reference implementation of [`TxnView`], used throughout the
/// test suite and as a worked example for callers wiring up their own
/// transaction format.
#[derive(Debug, Clone)]
pub struct RawTxn {
    pub payload: Vec<u8>,
    pub signature0: Signature,
    pub accounts: Vec<AccountMeta>,
    pub signature_count: u32,
    pub is_simple_vote: bool,
    pub uses_alt: bool,
}

impl RawTxn {
    pub fn new(signature0: Signature, accounts: Vec<AccountMeta>) -> Self {
        RawTxn {
            payload: Vec::new(),
            signature0,
            accounts,
            signature_count: 1,
            is_simple_vote: false,
            uses_alt: false,
        }
    }

    pub fn with_payload_len(mut self, len: usize) -> Self {
        self.payload = vec![0u8; len];
        self
    }

    pub fn as_vote(mut self) -> Self {
        self.is_simple_vote = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.uses_alt = true;
        self
    }
}

impl TxnView for RawTxn {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn signature0(&self) -> Signature {
        self.signature0
    }

    fn accounts(&self) -> &[AccountMeta] {
        &self.accounts
    }

    fn signature_count(&self) -> u32 {
        self.signature_count
    }

    fn is_simple_vote(&self) -> bool {
        self.is_simple_vote
    }

    fn uses_address_lookup_table(&self) -> bool {
        self.uses_alt
    }
}
