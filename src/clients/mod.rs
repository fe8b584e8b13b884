pub mod diagnostics;
pub mod health;
pub mod redis;
pub mod storage;
pub mod toast;
pub mod transport;
