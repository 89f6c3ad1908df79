pub mod release;
pub mod run;
pub mod setup;
pub mod testing;
