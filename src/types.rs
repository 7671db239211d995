use serde::{Deserialize, Serialize};

/// Username used when no credentials are supplied.
pub const ANONYMOUS_USER: &str = "anonymous";
/// Conventional email-like password for anonymous logins.
pub const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// One host to audit. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTarget {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ScanTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    /// Joins host and port, bracketing bare IPv6 addresses.
    pub fn addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Credentials to present: supplied ones, else the anonymous convention.
    pub fn credentials(&self) -> (&str, &str) {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => (user, pass),
            (Some(user), None) => (user, ""),
            _ => (ANONYMOUS_USER, ANONYMOUS_PASSWORD),
        }
    }
}

/// Outcome of TLS negotiation for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsStatus {
    #[default]
    NotAttempted,
    Established,
    Failed(String),
}

/// One listed file or directory with its probe results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    /// Path relative to the login directory.
    pub path: String,
    /// 0 for the login directory's own entries.
    pub depth: usize,
    pub is_directory: bool,
    /// Three-digit permission value (755 means rwxr-xr-x); absent when the
    /// listing carried no parseable Unix mode string.
    pub unix_mode: Option<u16>,
    pub size: Option<u64>,
    pub readable: bool,
    pub writable: bool,
}

/// Root-level write and delete checks, one flag per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAccess {
    pub create_dir: bool,
    pub delete_dir: bool,
    pub upload_file: bool,
    pub delete_file: bool,
}

/// Widest permissions seen across the root listing, per entry class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxRights {
    pub directories: Option<u16>,
    pub files: Option<u16>,
}

/// Everything one scan produced. Created fresh per scan, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    pub port_open: bool,
    pub login_succeeded: bool,
    pub banner: Option<String>,
    pub tls: TlsStatus,
    pub entries: Vec<DirectoryEntry>,
    pub write_access: Option<WriteAccess>,
    pub max_rights: MaxRights,
    pub errors: Vec<String>,
    pub elapsed_ms: u64,
}

/// A mode value is three decimal digits, each one an octal rwx triplet.
pub fn mode_is_valid(mode: u16) -> bool {
    mode <= 777 && mode % 10 <= 7 && (mode / 10) % 10 <= 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_convention_applies_when_no_credentials() {
        let target = ScanTarget::new("192.0.2.10", 21);
        assert_eq!(target.credentials(), (ANONYMOUS_USER, ANONYMOUS_PASSWORD));
    }

    #[test]
    fn supplied_credentials_win() {
        let mut target = ScanTarget::new("192.0.2.10", 21);
        target.username = Some("backup".to_string());
        target.password = Some("hunter2".to_string());
        assert_eq!(target.credentials(), ("backup", "hunter2"));
    }

    #[test]
    fn username_without_password_gets_an_empty_one() {
        let mut target = ScanTarget::new("192.0.2.10", 21);
        target.username = Some("backup".to_string());
        assert_eq!(target.credentials(), ("backup", ""));
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        assert_eq!(ScanTarget::new("::1", 21).addr(), "[::1]:21");
        assert_eq!(ScanTarget::new("198.51.100.7", 2121).addr(), "198.51.100.7:2121");
    }

    #[test]
    fn mode_validity_checks_each_digit() {
        assert!(mode_is_valid(0));
        assert!(mode_is_valid(7));
        assert!(mode_is_valid(644));
        assert!(mode_is_valid(777));
        assert!(!mode_is_valid(648));
        assert!(!mode_is_valid(690));
        assert!(!mode_is_valid(800));
    }
}
