//! Member Ledger
//!
//! One record per (participant, group) pair carrying the participant's
//! current lifecycle status and the timestamp of its last transition. No
//! history is retained beyond that. The ledger also answers the windowed
//! daily count the admission algorithm is driven by.

pub mod ledger;
pub mod member;

pub use ledger::{LedgerError, MemberLedger};
pub use member::{MemberProfile, MemberRecord, MemberStatus};
