// Elevated handlers: tag provisioning. Requires an admin token when auth
// is enabled.
pub mod tags;
