// -
// Cache name templates

/// Placeholder substituted with the tag extracted from the primary cache name
pub const NAME_TAG: &str = "%TAG%";

// -
// Predicate attributes

/// Attribute addressing the key's string form
pub const KEY_ATTRIBUTE: &str = "__key";

/// Prefix addressing a named key property, e.g. `__key.sessionId`
pub const KEY_PROPERTY_PREFIX: &str = "__key.";

/// Property served by [`crate::CacheKey::session_id`]
pub const SESSION_ID_PROPERTY: &str = "sessionId";

/// Property served by [`crate::CacheKey::partition_key`]
pub const PARTITION_KEY_PROPERTY: &str = "partitionKey";

// -
// Property map keys

/// Prefix shared by every flat configuration property
pub const PROPERTY_PREFIX: &str = "session.expiration.";

pub const PROPERTY_TAG: &str = "session.expiration.tag";
pub const PROPERTY_KEY_DELIMITER: &str = "session.expiration.key.delimiter";
pub const PROPERTY_STRING_KEY_POSTFIX_ENABLED: &str =
    "session.expiration.string-key.postfix.enabled";
pub const PROPERTY_QUEUE_DRAIN_SIZE: &str = "session.expiration.queue.drain-size";
pub const PROPERTY_THREAD_POOL_SIZE: &str = "session.expiration.thread-pool-size";
pub const PROPERTY_PROCESSING_MODE: &str = "session.expiration.processing-mode";
pub const PROPERTY_SHUTDOWN_GRACE_PERIOD_MS: &str =
    "session.expiration.shutdown.grace-period-ms";

/// `session.expiration.session.<pattern>` lists the relevant cache patterns
pub const PROPERTY_SESSION_PREFIX: &str = "session.expiration.session.";

pub const SESSION_KEY_TYPE_SUFFIX: &str = ".key.type";
pub const SESSION_KEY_PROPERTY_SUFFIX: &str = ".key.property";
pub const SESSION_KEY_PREDICATE_SUFFIX: &str = ".key.predicate";

// -
// Defaults

pub const DEFAULT_TAG: &str = "SessionExpirationService";
pub const DEFAULT_KEY_DELIMITER: &str = "@";
pub const DEFAULT_QUEUE_DRAIN_SIZE: usize = 100;
pub const DEFAULT_THREAD_POOL_SIZE: usize = 1;
pub const DEFAULT_SHUTDOWN_GRACE_PERIOD_MS: u64 = 5_000;
