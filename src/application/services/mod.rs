//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, CommandRunner)
//! but are themselves concrete structs, not traits.

mod package;
mod snowpark;
mod template;

pub use package::PackageService;
pub use snowpark::{snowsql_args, OutputFormat, SnowparkService};
pub use template::{TemplateService, TemplateSource};
