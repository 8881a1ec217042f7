//! Standard exit codes (BSD sysexits.h compatible)

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (e.g. malformed parameter list)
pub const DATAERR: i32 = 65;

/// Cannot open input (template or source directory missing)
pub const NOINPUT: i32 = 66;

/// Service unavailable (snowsql failed)
pub const UNAVAILABLE: i32 = 69;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;
