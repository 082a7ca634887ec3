//! The `RemoteMount` variant: a view onto a peer `vfshd` over the
//! line-oriented `EXEC` protocol.
//!
//! The connection is deliberately synchronous (`std::net::TcpStream`
//! behind a `std::sync::Mutex`), not `tokio`: every `Node` contract
//! method is synchronous, and a blocking client is the simplest correct
//! design for this shape of traffic. `tokio` stays reserved for the
//! autosave loop and the standalone async server.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Mutex;

use super::{Node, NodeRef};
use crate::error::{Result, VfsError};

struct Connection {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

pub struct RemoteMountData {
    pub host: String,
    pub port: u16,
    pub remote_path: String,
    conn: Mutex<Option<Connection>>,
}

impl RemoteMountData {
    pub fn new(host: impl Into<String>, port: u16, remote_path: impl Into<String>) -> Self {
        Self { host: host.into(), port, remote_path: remote_path.into(), conn: Mutex::new(None) }
    }

    pub fn is_dir(&self) -> bool {
        // A remote path's kind is only known once queried; mounts are
        // assumed directory-like until an `EXEC` proves otherwise.
        true
    }

    fn ensure_connected(&self, guard: &mut Option<Connection>) -> Result<()> {
        if guard.is_some() {
            return Ok(());
        }
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .map_err(|e| VfsError::RemoteError(format!("connect {}:{}: {e}", self.host, self.port)))?;
        let reader = BufReader::new(stream.try_clone().map_err(|e| VfsError::RemoteError(e.to_string()))?);
        *guard = Some(Connection { stream, reader });
        Ok(())
    }

    pub fn disconnect(&self) {
        *self.conn.lock().unwrap() = None;
    }

    /// Sends `EXEC <command>\n`, reads one response line, and strips the
    /// `OK `/`ERR ` prefix. Any I/O failure drops the connection so the
    /// next call reconnects from scratch.
    fn exec_remote(&self, command: &str) -> Result<String> {
        let mut guard = self.conn.lock().unwrap();
        self.ensure_connected(&mut guard)?;

        let result = (|| -> Result<String> {
            let conn = guard.as_mut().expect("just connected");
            writeln!(conn.stream, "EXEC {command}").map_err(|e| VfsError::RemoteError(e.to_string()))?;
            conn.stream.flush().map_err(|e| VfsError::RemoteError(e.to_string()))?;

            let mut line = String::new();
            let n = conn.reader.read_line(&mut line).map_err(|e| VfsError::RemoteError(e.to_string()))?;
            if n == 0 {
                return Err(VfsError::RemoteError("connection closed by peer".into()));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(body) = line.strip_prefix("OK ") {
                Ok(body.to_string())
            } else if let Some(body) = line.strip_prefix("ERR ") {
                Err(VfsError::RemoteError(body.to_string()))
            } else {
                Err(VfsError::RemoteError(format!("malformed response: {line}")))
            }
        })();

        if result.is_err() {
            *guard = None;
        }
        result
    }

    pub fn read(&self) -> Result<String> {
        self.exec_remote(&format!("cat {}", self.remote_path))
    }

    pub fn write(&mut self, s: &str) -> Result<()> {
        self.exec_remote(&format!("write {} {}", self.remote_path, s)).map(|_| ())
    }

    /// Parses a `ls`-style listing (`name\tkind` per line) into child
    /// nodes; directories come back as further `RemoteMount`s so recursive
    /// listing keeps using the same connection.
    pub fn children(&self) -> Result<Vec<(String, NodeRef)>> {
        let listing = self.exec_remote(&format!("ls {}", self.remote_path))?;
        let mut entries = Vec::new();
        for line in listing.lines() {
            let Some((name, kind)) = line.split_once('\t') else { continue };
            let child_path = format!("{}/{name}", self.remote_path.trim_end_matches('/'));
            let node = if kind == "dir" {
                Node::new_remote_mount(name.to_string(), RemoteMountData::new(self.host.clone(), self.port, child_path))
            } else {
                let content = self.exec_remote(&format!("cat {child_path}"))?;
                Node::new_file(name.to_string(), content.into_bytes())
            };
            entries.push((name.to_string(), node));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn exec_round_trips_and_reconnects_after_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 {
                    continue;
                }
                if line.trim() == "EXEC cat /remote/a.txt" {
                    writeln!(stream, "OK hello").unwrap();
                } else {
                    writeln!(stream, "ERR unknown command").unwrap();
                }
                let mut buf = [0u8; 1];
                let _ = stream.read(&mut buf);
            }
        });

        let remote = RemoteMountData::new("127.0.0.1", addr.port(), "/remote/a.txt");
        assert_eq!(remote.read().unwrap(), "hello");
    }
}
