//! CLI subcommand implementations.

pub(crate) mod harvest;
pub(crate) mod repos;
pub(crate) mod watermarks;
