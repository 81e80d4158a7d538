pub mod journal;
pub mod picker_api;
