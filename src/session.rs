use std::future::Future;
use std::io::{Cursor, Error, ErrorKind};

use clap::ValueEnum;
use log::debug;
use suppaftp::async_native_tls::TlsConnector;
use suppaftp::tokio::{AsyncFtpStream, AsyncNativeTlsConnector, AsyncNativeTlsFtpStream};
use suppaftp::types::{FileType, FtpError, FtpResult};
use suppaftp::Status;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

/// How TLS is handled when talking to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecurityMode {
    /// Try an explicit AUTH TLS upgrade, fall back to plain FTP.
    Auto,
    /// Plain FTP only.
    Plain,
    /// Require the explicit AUTH TLS upgrade.
    Explicit,
    /// TLS from the first byte (port 990 convention).
    Implicit,
}

enum Transport {
    Plain(AsyncFtpStream),
    Secure(AsyncNativeTlsFtpStream),
}

/// One FTP control/data session, plain or TLS. Every operation is awaited
/// under the configured timeout; dropping the session closes the socket.
pub struct FtpSession {
    transport: Transport,
    timeout: Duration,
}

/// A connected, not yet upgraded session for the explicit TLS flow.
pub struct TlsUpgrade {
    ftp: AsyncNativeTlsFtpStream,
    timeout: Duration,
}

impl TlsUpgrade {
    /// Reads the banner over the given TCP stream without negotiating yet.
    pub async fn start(stream: TcpStream, limit: Duration) -> FtpResult<Self> {
        let ftp = op(limit, AsyncNativeTlsFtpStream::connect_with_stream(stream)).await?;
        Ok(Self { ftp, timeout: limit })
    }

    /// Banner received with the 220 greeting, before any upgrade.
    pub fn banner(&self) -> Option<&str> {
        self.ftp.get_welcome_msg()
    }

    /// Sends AUTH TLS and wraps the control channel.
    pub async fn secure(self, host: &str, verify_tls: bool) -> FtpResult<FtpSession> {
        let secured = op(self.timeout, self.ftp.into_secure(tls_connector(verify_tls), host)).await?;
        Ok(FtpSession {
            transport: Transport::Secure(secured),
            timeout: self.timeout,
        })
    }
}

impl FtpSession {
    pub async fn connect_plain(stream: TcpStream, limit: Duration) -> FtpResult<Self> {
        let ftp = op(limit, AsyncFtpStream::connect_with_stream(stream)).await?;
        Ok(Self {
            transport: Transport::Plain(ftp),
            timeout: limit,
        })
    }

    pub async fn connect_implicit(
        addr: &str,
        host: &str,
        verify_tls: bool,
        limit: Duration,
    ) -> FtpResult<Self> {
        let ftp = op(
            limit,
            AsyncNativeTlsFtpStream::connect_secure_implicit(addr, tls_connector(verify_tls), host),
        )
        .await?;
        Ok(Self {
            transport: Transport::Secure(ftp),
            timeout: limit,
        })
    }

    pub fn welcome(&self) -> Option<&str> {
        match &self.transport {
            Transport::Plain(ftp) => ftp.get_welcome_msg(),
            Transport::Secure(ftp) => ftp.get_welcome_msg(),
        }
    }

    pub async fn login(&mut self, user: &str, pass: &str) -> FtpResult<()> {
        let limit = self.timeout;
        match &mut self.transport {
            Transport::Plain(ftp) => op(limit, ftp.login(user, pass)).await,
            Transport::Secure(ftp) => op(limit, ftp.login(user, pass)).await,
        }
    }

    pub async fn set_binary(&mut self) -> FtpResult<()> {
        let limit = self.timeout;
        match &mut self.transport {
            Transport::Plain(ftp) => op(limit, ftp.transfer_type(FileType::Binary)).await,
            Transport::Secure(ftp) => op(limit, ftp.transfer_type(FileType::Binary)).await,
        }
    }

    pub async fn list(&mut self, path: Option<&str>) -> FtpResult<Vec<String>> {
        let limit = self.timeout;
        let res = match &mut self.transport {
            Transport::Plain(ftp) => op(limit, ftp.list(path)).await,
            Transport::Secure(ftp) => op(limit, ftp.list(path)).await,
        };
        if res.is_err() {
            self.recover_data_channel().await;
        }
        res
    }

    pub async fn nlst(&mut self, path: Option<&str>) -> FtpResult<Vec<String>> {
        let limit = self.timeout;
        let res = match &mut self.transport {
            Transport::Plain(ftp) => op(limit, ftp.nlst(path)).await,
            Transport::Secure(ftp) => op(limit, ftp.nlst(path)).await,
        };
        if res.is_err() {
            self.recover_data_channel().await;
        }
        res
    }

    /// Opens a RETR stream and finalizes it straight away. Success means
    /// the server was willing to hand the file over; nothing is drained, so
    /// probing a large file costs one round trip.
    pub async fn open_retr(&mut self, path: &str) -> FtpResult<()> {
        let limit = self.timeout;
        let res = match &mut self.transport {
            Transport::Plain(ftp) => match op(limit, ftp.retr_as_stream(path)).await {
                Ok(stream) => {
                    let _ = op(limit, ftp.finalize_retr_stream(stream)).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Transport::Secure(ftp) => match op(limit, ftp.retr_as_stream(path)).await {
                Ok(stream) => {
                    let _ = op(limit, ftp.finalize_retr_stream(stream)).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
        };
        if res.is_err() {
            self.recover_data_channel().await;
        }
        res
    }

    /// STOR of a zero-byte payload under the given name.
    pub async fn upload_empty(&mut self, path: &str) -> FtpResult<()> {
        let limit = self.timeout;
        let res = match &mut self.transport {
            Transport::Plain(ftp) => {
                let mut payload = Cursor::new(&b""[..]);
                op(limit, ftp.put_file(path, &mut payload)).await.map(|_| ())
            }
            Transport::Secure(ftp) => {
                let mut payload = Cursor::new(&b""[..]);
                op(limit, ftp.put_file(path, &mut payload)).await.map(|_| ())
            }
        };
        if res.is_err() {
            self.recover_data_channel().await;
        }
        res
    }

    pub async fn mkdir(&mut self, path: &str) -> FtpResult<()> {
        let limit = self.timeout;
        match &mut self.transport {
            Transport::Plain(ftp) => op(limit, ftp.mkdir(path)).await,
            Transport::Secure(ftp) => op(limit, ftp.mkdir(path)).await,
        }
    }

    pub async fn rmdir(&mut self, path: &str) -> FtpResult<()> {
        let limit = self.timeout;
        match &mut self.transport {
            Transport::Plain(ftp) => op(limit, ftp.rmdir(path)).await,
            Transport::Secure(ftp) => op(limit, ftp.rmdir(path)).await,
        }
    }

    pub async fn remove_file(&mut self, path: &str) -> FtpResult<()> {
        let limit = self.timeout;
        match &mut self.transport {
            Transport::Plain(ftp) => op(limit, ftp.rm(path)).await,
            Transport::Secure(ftp) => op(limit, ftp.rm(path)).await,
        }
    }

    /// RNFR without the RNTO half: 350 means the server would let us rename
    /// the path, which is as close to a write check as it gets without
    /// touching the file. Callers send a NOOP afterwards to drop the
    /// pending rename.
    pub async fn rename_from(&mut self, path: &str) -> FtpResult<()> {
        let limit = self.timeout;
        let cmd = format!("RNFR {path}");
        let res = match &mut self.transport {
            Transport::Plain(ftp) => {
                op(limit, ftp.custom_command(&cmd, &[Status::RequestFilePending])).await
            }
            Transport::Secure(ftp) => {
                op(limit, ftp.custom_command(&cmd, &[Status::RequestFilePending])).await
            }
        };
        res.map(|_| ())
    }

    pub async fn noop(&mut self) -> FtpResult<()> {
        let limit = self.timeout;
        let res = match &mut self.transport {
            Transport::Plain(ftp) => op(limit, ftp.custom_command("NOOP", &[Status::CommandOk])).await,
            Transport::Secure(ftp) => op(limit, ftp.custom_command("NOOP", &[Status::CommandOk])).await,
        };
        res.map(|_| ())
    }

    pub async fn quit(&mut self) -> FtpResult<()> {
        let limit = self.timeout;
        match &mut self.transport {
            Transport::Plain(ftp) => op(limit, ftp.quit()).await,
            Transport::Secure(ftp) => op(limit, ftp.quit()).await,
        }
    }

    /// The client refuses a second data command once one has failed (its
    /// single-transfer guard stays set). An ABOR with an empty stream
    /// clears the guard and consumes exactly one reply, keeping the control
    /// channel aligned.
    async fn recover_data_channel(&mut self) {
        debug!("resetting data channel after a failed transfer command");
        let limit = self.timeout;
        let res = match &mut self.transport {
            Transport::Plain(ftp) => op(limit, ftp.abort(tokio::io::empty())).await,
            Transport::Secure(ftp) => op(limit, ftp.abort(tokio::io::empty())).await,
        };
        if let Err(e) = res {
            debug!("data channel reset failed: {e}");
        }
    }
}

fn tls_connector(verify_tls: bool) -> AsyncNativeTlsConnector {
    let mut connector = TlsConnector::new();
    if !verify_tls {
        connector = connector
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }
    AsyncNativeTlsConnector::from(connector)
}

/// Awaits an FTP operation under a deadline; elapsing maps to the same
/// error class as a dead connection.
async fn op<T>(limit: Duration, fut: impl Future<Output = FtpResult<T>>) -> FtpResult<T> {
    match timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(FtpError::ConnectionError(Error::new(
            ErrorKind::TimedOut,
            "ftp operation timed out",
        ))),
    }
}
