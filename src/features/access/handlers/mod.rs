mod access_handler;

pub use access_handler::*;
