pub mod history;
pub mod os;
pub mod process;
pub mod snapshot;
pub mod source;
