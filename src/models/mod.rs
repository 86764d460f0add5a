pub mod instance;
pub mod trigger;
