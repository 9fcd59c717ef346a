pub mod bus;
pub mod journal;
pub mod publisher;
pub mod serial;
pub mod transport;
