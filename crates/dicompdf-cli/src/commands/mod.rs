pub mod config;
pub mod convert;
pub mod inspect;
pub mod preview;
