//! snowproc: manage Snowflake stored procedures from the command line.
//!
//! Layers:
//! - `domain`: procedure identities, plans and SQL rendering
//! - `application`: the plan dispatcher and the snowpark helper services
//! - `infrastructure`: filesystem and process seams, dependency wiring
//! - `cli`: argument parsing, command mapping and terminal output

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
