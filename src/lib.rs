pub mod command;
pub mod console;
pub mod display;
pub mod ledger;
pub mod marketplace;
pub mod quote;
pub mod symbol;
