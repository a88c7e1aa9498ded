//! Small helpers that do not warrant their own top-level module.

pub mod dates;
