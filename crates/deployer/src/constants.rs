//! Default values.

use std::time::Duration;

/// Artifact name of the transparent upgradeable proxy.
pub const DEFAULT_PROXY_ARTIFACT: &str = "nTransparentUpgradeableProxy";

/// Initializer entrypoint called through the proxy constructor.
pub const DEFAULT_INITIALIZER: &str = "initialize";

/// Directory holding `<name>.json` artifacts.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// How long to wait for a transaction receipt.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);
