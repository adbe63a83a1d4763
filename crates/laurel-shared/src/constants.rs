/// Application name
pub const APP_NAME: &str = "Laurel";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// SQLite file name inside the data directory
pub const DB_FILE_NAME: &str = "laurel.db";

/// Context key carrying the id of the course whose completion fired the trigger
pub const CONTEXT_COURSE_ID: &str = "courseId";

/// Context key carrying the id of the space that was just joined
pub const CONTEXT_SPACE_ID: &str = "spaceId";

/// Smallest meaningful `requirement_count` for an automatic badge
pub const MIN_REQUIREMENT_COUNT: u32 = 1;

/// Slug used when a category name has no usable characters
pub const FALLBACK_SLUG: &str = "category";

/// Upper bound on badge / category name length
pub const MAX_NAME_LEN: usize = 120;
