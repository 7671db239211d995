use log::{debug, warn};
use rand::Rng;
use std::time::Instant;
use suppaftp::types::FtpError;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

use crate::listing::{self, EntryKind, ListedItem};
use crate::session::{FtpSession, SecurityMode, TlsUpgrade};
use crate::types::{DirectoryEntry, ScanResult, ScanTarget, TlsStatus, WriteAccess};

pub struct ScanOptions {
    /// Deadline applied to every network operation separately.
    pub timeout: Duration,
    pub security: SecurityMode,
    pub verify_tls: bool,
    /// How deep to descend into readable directories; 0 audits the login
    /// directory only.
    pub max_depth: usize,
    /// Stop the walk after this many entries; 0 means no cap.
    pub max_entries: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            security: SecurityMode::Auto,
            verify_tls: false,
            max_depth: 0,
            max_entries: 0,
        }
    }
}

pub struct Scanner {
    opts: ScanOptions,
}

impl Scanner {
    pub fn new(opts: ScanOptions) -> Self {
        Self { opts }
    }

    /// Audits one target. Every failure class is a reported outcome, so
    /// this never returns an error: closed ports, refused logins and TLS
    /// trouble all land in the result.
    pub async fn scan(&self, target: &ScanTarget) -> ScanResult {
        let started = Instant::now();
        let mut result = ScanResult::default();
        self.run_scan(target, &mut result).await;
        result.elapsed_ms = started.elapsed().as_millis() as u64;
        result
    }

    async fn run_scan(&self, target: &ScanTarget, result: &mut ScanResult) {
        let addr = target.addr();

        let stream = match timeout(self.opts.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                debug!("connect to {addr} failed: {e}");
                return;
            }
            Err(_) => {
                debug!("connect to {addr} timed out");
                return;
            }
        };
        result.port_open = true;

        let mut session = match self.establish(stream, &addr, &target.host, result).await {
            Some(session) => session,
            None => return,
        };
        if result.banner.is_none() {
            result.banner = session.welcome().map(str::to_string);
        }

        let (user, pass) = target.credentials();
        if let Err(e) = session.login(user, pass).await {
            match &e {
                // a reply with a refusal code is the normal rejection case
                FtpError::UnexpectedResponse(_) => debug!("login as '{user}' rejected: {e}"),
                other => result.errors.push(format!("login as '{user}' failed: {other}")),
            }
            let _ = session.quit().await;
            return;
        }
        result.login_succeeded = true;

        if let Err(e) = session.set_binary().await {
            debug!("TYPE I rejected: {e}");
        }

        self.walk_entries(&mut session, result).await;
        result.write_access = Some(self.check_write_access(&mut session).await);
        result.max_rights = listing::max_rights(&result.entries);

        let _ = session.quit().await;
    }

    async fn establish(
        &self,
        stream: TcpStream,
        addr: &str,
        host: &str,
        result: &mut ScanResult,
    ) -> Option<FtpSession> {
        let limit = self.opts.timeout;
        let verify = self.opts.verify_tls;
        match self.opts.security {
            SecurityMode::Plain => match FtpSession::connect_plain(stream, limit).await {
                Ok(session) => Some(session),
                Err(e) => {
                    result.errors.push(format!("ftp handshake with {addr} failed: {e}"));
                    None
                }
            },
            SecurityMode::Explicit | SecurityMode::Auto => {
                let upgrade = match TlsUpgrade::start(stream, limit).await {
                    Ok(upgrade) => upgrade,
                    Err(e) => {
                        result.errors.push(format!("ftp handshake with {addr} failed: {e}"));
                        return None;
                    }
                };
                result.banner = upgrade.banner().map(str::to_string);
                match upgrade.secure(host, verify).await {
                    Ok(session) => {
                        result.tls = TlsStatus::Established;
                        Some(session)
                    }
                    Err(e) => {
                        result.tls = TlsStatus::Failed(e.to_string());
                        if self.opts.security == SecurityMode::Explicit {
                            None
                        } else {
                            debug!("TLS upgrade refused by {addr}, continuing without TLS");
                            self.reconnect_plain(addr, result).await
                        }
                    }
                }
            }
            SecurityMode::Implicit => {
                // the implicit handshake needs a connection it owns from byte one
                drop(stream);
                match FtpSession::connect_implicit(addr, host, verify, limit).await {
                    Ok(session) => {
                        result.tls = TlsStatus::Established;
                        Some(session)
                    }
                    Err(e) => {
                        result.tls = TlsStatus::Failed(e.to_string());
                        None
                    }
                }
            }
        }
    }

    async fn reconnect_plain(&self, addr: &str, result: &mut ScanResult) -> Option<FtpSession> {
        let limit = self.opts.timeout;
        let stream = match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                result.errors.push(format!("plain reconnect to {addr} failed: {e}"));
                return None;
            }
            Err(_) => {
                result.errors.push(format!("plain reconnect to {addr} timed out"));
                return None;
            }
        };
        match FtpSession::connect_plain(stream, limit).await {
            Ok(session) => Some(session),
            Err(e) => {
                result.errors.push(format!("ftp handshake with {addr} failed: {e}"));
                None
            }
        }
    }

    /// Parent-first walk over the login directory. Each directory is listed
    /// once; the listing doubles as its read probe and as the source of its
    /// children when the depth allows descending.
    async fn walk_entries(&self, session: &mut FtpSession, result: &mut ScanResult) {
        let root = match self.fetch_listing(session, None).await {
            Some(items) => items,
            None => {
                result.errors.push("listing the login directory failed".to_string());
                return;
            }
        };

        let mut pending: Vec<(String, usize, Vec<ListedItem>)> = vec![(String::new(), 0, root)];
        'walk: while let Some((prefix, depth, items)) = pending.pop() {
            let mut discovered: Vec<(String, usize, Vec<ListedItem>)> = Vec::new();
            for item in items {
                if item.name == "." || item.name == ".." || item.name.is_empty() {
                    continue;
                }
                if self.opts.max_entries > 0 && result.entries.len() >= self.opts.max_entries {
                    result.errors.push(format!(
                        "listing truncated at {} entries",
                        self.opts.max_entries
                    ));
                    break 'walk;
                }

                let path = join_path(&prefix, &item.name);
                let mut entry = DirectoryEntry {
                    name: item.name,
                    path: path.clone(),
                    depth,
                    is_directory: item.kind == EntryKind::Directory,
                    unix_mode: item.mode,
                    size: item.size,
                    readable: false,
                    writable: false,
                };

                if entry.is_directory {
                    let children = self.fetch_listing(session, Some(&path)).await;
                    entry.readable = children.is_some();
                    entry.writable = self.probe_dir_write(session, &path).await;
                    match children {
                        Some(children) if depth < self.opts.max_depth && !children.is_empty() => {
                            discovered.push((path, depth + 1, children));
                        }
                        None if depth < self.opts.max_depth => {
                            result.errors.push(format!("skipping unlistable directory '{path}'"));
                        }
                        _ => {}
                    }
                } else {
                    entry.readable = session.open_retr(&path).await.is_ok();
                    entry.writable = self.probe_file_write(session, &path).await;
                }
                result.entries.push(entry);
            }
            // depth-first, in listing order
            discovered.reverse();
            pending.append(&mut discovered);
        }
    }

    /// LIST the given directory, falling back to bare NLST names with the
    /// dot heuristic when the server's listing format is not Unix-style.
    /// None means the directory could not be listed at all.
    async fn fetch_listing(
        &self,
        session: &mut FtpSession,
        path: Option<&str>,
    ) -> Option<Vec<ListedItem>> {
        match session.list(path).await {
            Ok(lines) => {
                let items: Vec<ListedItem> = lines
                    .iter()
                    .filter_map(|line| listing::parse_unix_line(line))
                    .collect();
                if items.is_empty() && !lines.is_empty() {
                    debug!("unparseable LIST output for {path:?}, trying NLST");
                    self.nlst_fallback(session, path).await
                } else {
                    Some(items)
                }
            }
            Err(e) => {
                debug!("LIST {path:?} failed: {e}");
                self.nlst_fallback(session, path).await
            }
        }
    }

    async fn nlst_fallback(
        &self,
        session: &mut FtpSession,
        path: Option<&str>,
    ) -> Option<Vec<ListedItem>> {
        match session.nlst(path).await {
            Ok(names) => Some(
                names
                    .iter()
                    .map(|name| listing::item_from_name(name))
                    .filter(|item| !item.name.is_empty())
                    .collect(),
            ),
            Err(e) => {
                debug!("NLST {path:?} failed: {e}");
                None
            }
        }
    }

    /// Create and remove a marker directory inside the target. Stays on the
    /// control channel so a refusal cannot wedge the data connection.
    async fn probe_dir_write(&self, session: &mut FtpSession, path: &str) -> bool {
        let target = join_path(path, &marker_name());
        match session.mkdir(&target).await {
            Ok(()) => {
                if let Err(e) = session.rmdir(&target).await {
                    warn!("probe directory {target} was created but not removed: {e}");
                }
                true
            }
            Err(e) => {
                debug!("MKD probe in {path} refused: {e}");
                false
            }
        }
    }

    /// RNFR probe: a 350 means the server would rename the file for us.
    /// The rename is never completed; a NOOP clears the pending state.
    async fn probe_file_write(&self, session: &mut FtpSession, path: &str) -> bool {
        match session.rename_from(path).await {
            Ok(()) => {
                let _ = session.noop().await;
                true
            }
            Err(e) => {
                debug!("RNFR probe for {path} refused: {e}");
                false
            }
        }
    }

    /// Four-way check in the login directory: create/remove a marker
    /// directory, upload/delete a marker file. Runs after the walk so a
    /// refused STOR cannot disturb the listing phase.
    async fn check_write_access(&self, session: &mut FtpSession) -> WriteAccess {
        let mut access = WriteAccess::default();

        let dir_marker = marker_name();
        match session.mkdir(&dir_marker).await {
            Ok(()) => {
                access.create_dir = true;
                match session.rmdir(&dir_marker).await {
                    Ok(()) => access.delete_dir = true,
                    Err(e) => warn!("marker directory {dir_marker} left behind: {e}"),
                }
            }
            Err(e) => debug!("MKD {dir_marker} refused: {e}"),
        }

        let file_marker = marker_name();
        match session.upload_empty(&file_marker).await {
            Ok(()) => {
                access.upload_file = true;
                match session.remove_file(&file_marker).await {
                    Ok(()) => access.delete_file = true,
                    Err(e) => warn!("marker file {file_marker} left behind: {e}"),
                }
            }
            Err(e) => debug!("STOR {file_marker} refused: {e}"),
        }

        access
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Marker names carry a random nine-digit suffix so an interrupted scan
/// leaves nothing that could collide with real content.
fn marker_name() -> String {
    let n: u32 = rand::rng().random_range(100_000_000..900_000_000);
    format!("ftpaudit_{n}")
}
