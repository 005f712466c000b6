//! Command implementations that operate outside an opened repository.

pub mod init;
