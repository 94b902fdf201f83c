// ============================================================================
// spark-rx - Constants
// Flag constants for instance lifecycle and subscription state
// ============================================================================

// =============================================================================
// INSTANCE LIFECYCLE FLAGS
// =============================================================================

/// Instance exists but the `created` hooks have not run yet
pub const UNINITIALIZED: u32 = 1 << 0;

/// `created` hooks have run (bindings wired)
pub const CREATED: u32 = 1 << 1;

/// Instance has a render tree and a host updater (mounted)
pub const ACTIVE: u32 = 1 << 2;

/// `before_unmount` hooks have run; all bindings released
pub const TORN_DOWN: u32 = 1 << 3;

/// Mask to clear all lifecycle bits
pub const LIFECYCLE_MASK: u32 = !(UNINITIALIZED | CREATED | ACTIVE | TORN_DOWN);

// =============================================================================
// SUBSCRIPTION FLAGS
// =============================================================================

/// Subscription is open and will deliver notifications
pub const OPEN: u32 = 1 << 8;

/// Subscription has been closed (unsubscribed, errored or completed)
pub const CLOSED: u32 = 1 << 9;

/// Terminal notification was an error
pub const ERRORED: u32 = 1 << 10;

/// Terminal notification was a completion
pub const COMPLETED: u32 = 1 << 11;

// =============================================================================
// NAMING CONVENTIONS
// =============================================================================

/// Suffix appended to a method name to form its observable wrapper property
/// when `observable_methods` is given as a plain list.
pub const OBSERVABLE_METHOD_SUFFIX: &str = "$";

/// Option name the merge strategy is registered under
pub const SUBSCRIPTIONS_OPTION: &str = "subscriptions";

// =============================================================================
// TESTS
// =============================================================================
