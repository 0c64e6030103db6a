pub mod clock;
pub mod config;
pub mod doctor;
pub mod ledger;
pub mod picking;
pub mod scouting;
pub mod store;
pub mod wizard;
