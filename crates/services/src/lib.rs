pub mod chat;
pub mod chat_history;
pub mod disk;
pub mod downloads;
pub mod polling;
pub mod reconcile;
pub mod toast;
