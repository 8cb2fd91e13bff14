pub mod catalog;
pub mod inventory;
pub mod ledger;
pub mod reviews;
pub mod sweeper;
