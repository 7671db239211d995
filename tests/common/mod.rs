#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Duration};

/// Scripted behaviour for one dummy server instance.
#[derive(Default, Clone)]
pub struct ServerRules {
    /// Reply 530 to every PASS.
    pub reject_login: bool,
    /// Accept the connection but never send the greeting.
    pub silent: bool,
    /// LIST output per directory; "" is the login directory. Missing keys
    /// are refused with 550.
    pub listings: HashMap<String, Vec<String>>,
    /// NLST output per directory, same keying as `listings`.
    pub nlst: HashMap<String, Vec<String>>,
    /// Refuse LIST outright so clients have to fall back to NLST.
    pub nlst_only: bool,
    /// Paths RETR will serve.
    pub files: HashMap<String, Vec<u8>>,
    /// Paths RNFR answers 350 for.
    pub rename_ok: Vec<String>,
    pub allow_mkd: bool,
    pub allow_stor: bool,
}

/// Minimal passive-mode FTP server for driving the scanner in tests.
/// Accepts any number of control connections until the runtime shuts down.
pub struct DummyFtpServer {
    pub addr: SocketAddr,
}

impl DummyFtpServer {
    pub async fn start(rules: ServerRules) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let rules = Arc::new(rules);
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let rules = Arc::clone(&rules);
                tokio::spawn(serve_session(socket, rules));
            }
        });
        Self { addr }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn serve_session(socket: TcpStream, rules: Arc<ServerRules>) {
    if rules.silent {
        sleep(Duration::from_secs(30)).await;
        return;
    }

    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    reply(&mut writer, "220 dummy FTP ready").await;

    // the listener parked by the last PASV, waiting for a transfer command
    let mut data: Option<TcpListener> = None;

    while let Ok(Some(line)) = lines.next_line().await {
        let (cmd, arg) = split_command(&line);
        match cmd.as_str() {
            "USER" => reply(&mut writer, "331 Password required.").await,
            "PASS" => {
                if rules.reject_login {
                    reply(&mut writer, "530 Login incorrect.").await;
                } else {
                    reply(&mut writer, "230 Login successful.").await;
                }
            }
            "TYPE" => reply(&mut writer, "200 Type set.").await,
            "AUTH" => reply(&mut writer, "500 Unknown command.").await,
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = listener.local_addr().unwrap().port();
                reply(
                    &mut writer,
                    &format!(
                        "227 Entering Passive Mode (127,0,0,1,{},{}).",
                        port / 256,
                        port % 256
                    ),
                )
                .await;
                data = Some(listener);
            }
            "LIST" => {
                if rules.nlst_only {
                    refuse_transfer(&mut writer, data.take()).await;
                } else {
                    match rules.listings.get(&arg) {
                        Some(entry_lines) => {
                            send_data(&mut writer, data.take(), &join_lines(entry_lines)).await
                        }
                        None => refuse_transfer(&mut writer, data.take()).await,
                    }
                }
            }
            "NLST" => match rules.nlst.get(&arg) {
                Some(names) => send_data(&mut writer, data.take(), &join_lines(names)).await,
                None => refuse_transfer(&mut writer, data.take()).await,
            },
            "RETR" => match rules.files.get(&arg) {
                Some(content) => send_data(&mut writer, data.take(), content).await,
                None => refuse_transfer(&mut writer, data.take()).await,
            },
            "STOR" => {
                if rules.allow_stor {
                    recv_data(&mut writer, data.take()).await;
                } else {
                    refuse_transfer(&mut writer, data.take()).await;
                }
            }
            "MKD" => {
                if rules.allow_mkd {
                    reply(&mut writer, &format!("257 \"{arg}\" created.")).await;
                } else {
                    reply(&mut writer, "550 Permission denied.").await;
                }
            }
            "RMD" => {
                if rules.allow_mkd {
                    reply(&mut writer, "250 Directory removed.").await;
                } else {
                    reply(&mut writer, "550 Permission denied.").await;
                }
            }
            "DELE" => {
                if rules.allow_stor {
                    reply(&mut writer, "250 File removed.").await;
                } else {
                    reply(&mut writer, "550 Permission denied.").await;
                }
            }
            "RNFR" => {
                if rules.rename_ok.iter().any(|p| p == &arg) {
                    reply(&mut writer, "350 Ready for RNTO.").await;
                } else {
                    reply(&mut writer, "550 No such file.").await;
                }
            }
            "NOOP" => reply(&mut writer, "200 OK.").await,
            "ABOR" => reply(&mut writer, "226 No transfer to abort.").await,
            "QUIT" => {
                reply(&mut writer, "221 Goodbye.").await;
                break;
            }
            _ => reply(&mut writer, "502 Not implemented.").await,
        }
    }
}

async fn reply(writer: &mut OwnedWriteHalf, line: &str) {
    let _ = writer.write_all(format!("{line}\r\n").as_bytes()).await;
}

/// 150, push the payload over the accepted data connection, 226.
async fn send_data(writer: &mut OwnedWriteHalf, listener: Option<TcpListener>, payload: &[u8]) {
    let Some(listener) = listener else {
        reply(writer, "425 Use PASV first.").await;
        return;
    };
    reply(writer, "150 Opening data connection.").await;
    if let Ok(Ok((mut conn, _))) = timeout(Duration::from_secs(5), listener.accept()).await {
        let _ = conn.write_all(payload).await;
        let _ = conn.shutdown().await;
    }
    reply(writer, "226 Transfer complete.").await;
}

/// 150, drain whatever the client uploads, 226.
async fn recv_data(writer: &mut OwnedWriteHalf, listener: Option<TcpListener>) {
    let Some(listener) = listener else {
        reply(writer, "425 Use PASV first.").await;
        return;
    };
    reply(writer, "150 Ok to send data.").await;
    if let Ok(Ok((mut conn, _))) = timeout(Duration::from_secs(5), listener.accept()).await {
        let mut sink = Vec::new();
        let _ = conn.read_to_end(&mut sink).await;
    }
    reply(writer, "226 Transfer complete.").await;
}

/// 550 while keeping the passive port alive: the client sends the command
/// and then connects, so the port must accept that connection or the 550
/// and the ABOR reply after it would get out of step.
async fn refuse_transfer(writer: &mut OwnedWriteHalf, listener: Option<TcpListener>) {
    reply(writer, "550 Permission denied.").await;
    if let Some(listener) = listener {
        let _ = timeout(Duration::from_millis(500), listener.accept()).await;
    }
}

fn join_lines(lines: &[String]) -> Vec<u8> {
    let mut payload = String::new();
    for line in lines {
        payload.push_str(line);
        payload.push_str("\r\n");
    }
    payload.into_bytes()
}

fn split_command(line: &str) -> (String, String) {
    let line = line.trim_end();
    match line.split_once(' ') {
        Some((cmd, arg)) => (cmd.to_ascii_uppercase(), arg.trim().to_string()),
        None => (line.to_ascii_uppercase(), String::new()),
    }
}
