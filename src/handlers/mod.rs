pub mod google_oauth;
pub mod journal;
pub mod library;
pub mod picker;
