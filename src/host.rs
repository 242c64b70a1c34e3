use tracing::warn;

/// Environment variable that overrides the detected machine name.
pub const LOG_CENTER_MACHINE_NAME_ENV: &str = "LOG_CENTER_MACHINE_NAME";

/// Source of the `machineName` stamped on every record.
///
/// The client asks for it once per record, so implementations should be
/// cheap. Inject [`FixedHostIdentity`] in tests to get deterministic output.
pub trait HostIdentity: Send + Sync {
    fn machine_name(&self) -> String;
}

/// Resolves the machine name from the running system.
///
/// Lookup order:
/// 1. `LOG_CENTER_MACHINE_NAME`
/// 2. `HOSTNAME`
/// 3. the OS hostname
/// 4. `"unknown"`
///
/// The result is resolved once at construction and cached.
#[derive(Debug, Clone)]
pub struct SystemHostIdentity {
    name: String,
}

impl SystemHostIdentity {
    pub fn new() -> Self {
        Self { name: resolve_machine_name() }
    }
}

impl Default for SystemHostIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl HostIdentity for SystemHostIdentity {
    fn machine_name(&self) -> String {
        self.name.clone()
    }
}

/// Always reports the same machine name.
#[derive(Debug, Clone)]
pub struct FixedHostIdentity(pub String);

impl FixedHostIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl HostIdentity for FixedHostIdentity {
    fn machine_name(&self) -> String {
        self.0.clone()
    }
}

fn resolve_machine_name() -> String {
    for key in [LOG_CENTER_MACHINE_NAME_ENV, "HOSTNAME"] {
        if let Ok(name) = std::env::var(key) {
            if !name.trim().is_empty() {
                return name;
            }
        }
    }

    match hostname::get() {
        Ok(name) => {
            if let Some(name) = name.to_str() {
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }
        Err(e) => warn!("failed to read system hostname: {}", e),
    }

    "unknown".to_string()
}
