//! Route groups mounted by the binary. Each group owns its handlers; the
//! bootstrap core only knows the prefix it is mounted at.

pub mod auth;
pub mod blogs;
