pub mod account;
pub mod amount;
pub mod codes;
pub mod notifications;
