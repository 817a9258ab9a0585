//! Configuration sources, lowest precedence first.

pub(crate) mod environment;
pub(crate) mod explicit_file;
pub(crate) mod global_file;
