pub mod audio;
pub mod io;
pub mod log;
