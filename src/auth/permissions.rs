/*!
 * # Permissions Module
 *
 * Capability names understood by the stock API. `org.*` capabilities apply to
 * every record of the organisation, `own.*` to records the caller authored.
 */

/// Capability string constants for compile-time safety
pub mod consts {
    // Devices
    pub const ORG_DEVICE_WRITE: &str = "org.device.write";
    pub const ORG_DEVICE_DESTROY: &str = "org.device.destroy";

    // Device logs
    pub const ORG_DEVICE_LOG_READ: &str = "org.device_log.read";
    pub const ORG_DEVICE_LOG_WRITE: &str = "org.device_log.write";
    pub const OWN_DEVICE_LOG_WRITE: &str = "own.device_log.write";
    pub const ORG_DEVICE_LOG_DESTROY: &str = "org.device_log.destroy";
}

/// Every capability, e.g. for minting an administrator token.
pub fn all() -> Vec<String> {
    [
        consts::ORG_DEVICE_WRITE,
        consts::ORG_DEVICE_DESTROY,
        consts::ORG_DEVICE_LOG_READ,
        consts::ORG_DEVICE_LOG_WRITE,
        consts::OWN_DEVICE_LOG_WRITE,
        consts::ORG_DEVICE_LOG_DESTROY,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}
