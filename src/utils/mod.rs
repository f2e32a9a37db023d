pub mod layout;
pub mod retry;
pub mod rewrite;
