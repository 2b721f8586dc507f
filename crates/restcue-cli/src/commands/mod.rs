pub mod config;
pub mod profiles;
pub mod run;
pub mod simulate;
