pub mod config;
pub mod install;
pub mod lookup;
pub mod run;
