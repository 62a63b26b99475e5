//! The ledger-update protocol.
//!
//! Every balance mutation in the system is one of the transitions defined in
//! [`catalog`]: daily check-in, mining start/claim, code redemption, peer
//! transfer, FairX swap and the ad bonus. The catalog functions are pure:
//! they validate a transactional snapshot of an account against the config
//! snapshot and the server-observed clock, and return the amounts to apply.
//! The transactional repository owns fetching the snapshot, applying the
//! writes atomically and emitting the audit notification.

pub mod catalog;
pub mod error;
pub mod read;
