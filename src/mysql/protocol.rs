//! MySQL client protocol for the replication session.
//!
//! Implements the slice of the protocol a replica needs:
//! - handshake and authentication (`mysql_native_password`, the
//!   `caching_sha2_password` fast path)
//! - packet framing with I/O timeouts
//! - `COM_QUERY` for session variables (OK-only and single-scalar reads)
//! - `COM_REGISTER_SLAVE`, `COM_BINLOG_DUMP`, `COM_QUIT`
//! - binlog stream packet classification (event / end-of-data / error)
//!
//! Schema introspection does not go through this client: result-set heavy
//! queries run on a separate `mysql_async` connection (see
//! [`super::metadata`]). This client only parses the one-scalar result it
//! needs for the checksum handshake, which is session state of the dump
//! connection and cannot be read elsewhere.

use anyhow::{bail, Context, Result};
use bytes::{BufMut, Bytes, BytesMut};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::io::Read;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, trace, warn};

use crate::common::{CONNECTION_TIMEOUT_SECS, IO_TIMEOUT_SECS};

/// MySQL packet header size (3 bytes length + 1 byte sequence)
const PACKET_HEADER_SIZE: usize = 4;
/// Maximum packet payload
const MAX_PACKET_SIZE: usize = 16_777_215;

/// Client capability bits sent in the handshake response.
const CLIENT_LONG_PASSWORD: u32 = 0x0000_0001;
const CLIENT_LONG_FLAG: u32 = 0x0000_0004;
const CLIENT_PROTOCOL_41: u32 = 0x0000_0200;
const CLIENT_TRANSACTIONS: u32 = 0x0000_2000;
const CLIENT_SECURE_CONNECTION: u32 = 0x0000_8000;
const CLIENT_PLUGIN_AUTH: u32 = 0x0008_0000;

/// Command bytes used by the replication session.
const COM_QUIT: u8 = 0x01;
const COM_QUERY: u8 = 0x03;
const COM_BINLOG_DUMP: u8 = 0x12;
const COM_REGISTER_SLAVE: u8 = 0x15;

/// Client-side error code for a lost connection, used when a read fails
/// before an ERR packet could arrive.
pub const CR_SERVER_LOST: u16 = 2013;

/// An ERR packet from the server, carrying the MySQL error code.
#[derive(Debug, Clone, thiserror::Error)]
#[error("mysql server error {code}: {message}")]
pub struct ServerError {
    pub code: u16,
    pub message: String,
}

impl ServerError {
    fn parse(packet: &[u8]) -> Self {
        if packet.len() < 3 {
            return Self {
                code: 0,
                message: "truncated ERR packet".to_string(),
            };
        }
        let code = u16::from_le_bytes([packet[1], packet[2]]);
        // Protocol 4.1 inserts '#' + 5-byte sqlstate before the message.
        let message_start = if packet.len() > 9 && packet[3] == b'#' {
            9
        } else {
            3
        };
        let message = String::from_utf8_lossy(&packet[message_start.min(packet.len())..]).to_string();
        Self { code, message }
    }
}

/// Return the MySQL error code behind a protocol error, or `CR_SERVER_LOST`
/// for transport failures that never produced an ERR packet.
pub fn error_code(err: &anyhow::Error) -> u16 {
    err.downcast_ref::<ServerError>()
        .map(|e| e.code)
        .unwrap_or(CR_SERVER_LOST)
}

/// One packet from the binlog stream, already classified.
#[derive(Debug)]
pub enum BinlogPacket {
    /// An event: the bytes after the leading OK byte, starting with the
    /// common event header.
    Event(Bytes),
    /// End-of-data marker (short packet with a leading `0xFE`).
    EndOfData,
}

/// Initial greeting from the server.
#[derive(Debug)]
pub struct HandshakePacket {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub capability_flags: u32,
    pub auth_plugin_data: Vec<u8>,
    pub auth_plugin_name: String,
}

impl HandshakePacket {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = std::io::Cursor::new(data);
        let mut buf = [0u8; 1];

        Read::read_exact(&mut cursor, &mut buf)?;
        let protocol_version = buf[0];

        // Server version (null-terminated)
        let mut server_version = Vec::new();
        loop {
            Read::read_exact(&mut cursor, &mut buf)?;
            if buf[0] == 0 {
                break;
            }
            server_version.push(buf[0]);
        }
        let server_version = String::from_utf8_lossy(&server_version).to_string();

        let mut buf4 = [0u8; 4];
        Read::read_exact(&mut cursor, &mut buf4)?;
        let connection_id = u32::from_le_bytes(buf4);

        // Auth-plugin-data part 1 (8 bytes) + filler
        let mut auth_data = vec![0u8; 8];
        Read::read_exact(&mut cursor, &mut auth_data)?;
        Read::read_exact(&mut cursor, &mut buf)?;

        let mut buf2 = [0u8; 2];
        Read::read_exact(&mut cursor, &mut buf2)?;
        let cap_lower = u16::from_le_bytes(buf2);

        // Character set + status flags
        Read::read_exact(&mut cursor, &mut buf)?;
        Read::read_exact(&mut cursor, &mut buf2)?;

        Read::read_exact(&mut cursor, &mut buf2)?;
        let cap_upper = u16::from_le_bytes(buf2);
        let capability_flags = ((cap_upper as u32) << 16) | (cap_lower as u32);

        Read::read_exact(&mut cursor, &mut buf)?;
        let auth_data_len = buf[0] as usize;

        let mut reserved = [0u8; 10];
        Read::read_exact(&mut cursor, &mut reserved)?;

        // Auth-plugin-data part 2 (max 13 bytes, null-terminated)
        let part2_len = if auth_data_len > 8 {
            auth_data_len - 8
        } else {
            13
        };
        let mut part2 = vec![0u8; part2_len];
        Read::read_exact(&mut cursor, &mut part2)?;
        if let Some(pos) = part2.iter().position(|&b| b == 0) {
            part2.truncate(pos);
        }
        auth_data.extend_from_slice(&part2);

        // Auth plugin name (null-terminated)
        let mut auth_plugin_name = Vec::new();
        if capability_flags & CLIENT_PLUGIN_AUTH != 0 {
            loop {
                let n = Read::read(&mut cursor, &mut buf)?;
                if n == 0 || buf[0] == 0 {
                    break;
                }
                auth_plugin_name.push(buf[0]);
            }
        }
        let auth_plugin_name = String::from_utf8_lossy(&auth_plugin_name).to_string();

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            capability_flags,
            auth_plugin_data: auth_data,
            auth_plugin_name,
        })
    }
}

/// The replication connection: owns the TCP stream the dump runs on.
pub struct ReplicationConnection {
    stream: BufReader<TcpStream>,
    sequence_id: u8,
    server_version: String,
    connection_id: u32,
}

impl std::fmt::Debug for ReplicationConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationConnection")
            .field("sequence_id", &self.sequence_id)
            .field("server_version", &self.server_version)
            .field("connection_id", &self.connection_id)
            .finish_non_exhaustive()
    }
}

impl ReplicationConnection {
    /// Connect to the primary and authenticate.
    pub async fn connect(
        host: &str,
        port: u16,
        user: &str,
        password: Option<&str>,
    ) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        debug!("connecting to mysql primary at {}", addr);

        let tcp_stream = match timeout(
            Duration::from_secs(CONNECTION_TIMEOUT_SECS),
            TcpStream::connect(&addr),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(e).context("failed to connect to mysql primary"),
            Err(_) => bail!(
                "connection timeout after {}s connecting to {}",
                CONNECTION_TIMEOUT_SECS,
                addr
            ),
        };
        let mut stream = BufReader::new(tcp_stream);

        let (handshake_data, seq) = Self::read_raw_packet(&mut stream).await?;
        let handshake =
            HandshakePacket::parse(&handshake_data).context("failed to parse handshake packet")?;

        info!(
            "connected to mysql {} (connection_id={})",
            handshake.server_version, handshake.connection_id
        );
        debug!("auth plugin: {}", handshake.auth_plugin_name);

        let mut conn = Self {
            stream,
            sequence_id: seq,
            server_version: handshake.server_version.clone(),
            connection_id: handshake.connection_id,
        };

        conn.authenticate(user, password, &handshake).await?;

        Ok(conn)
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    async fn read_raw_packet(stream: &mut BufReader<TcpStream>) -> Result<(Vec<u8>, u8)> {
        let mut header = [0u8; PACKET_HEADER_SIZE];
        stream.read_exact(&mut header).await?;

        let payload_len =
            (header[0] as usize) | ((header[1] as usize) << 8) | ((header[2] as usize) << 16);
        let sequence_id = header[3];

        let mut payload = vec![0u8; payload_len];
        stream.read_exact(&mut payload).await?;

        Ok((payload, sequence_id.wrapping_add(1)))
    }

    /// Read one packet, with an I/O timeout so a stalled primary cannot hang
    /// the loop forever.
    async fn read_packet(&mut self) -> Result<Vec<u8>> {
        let mut header = [0u8; PACKET_HEADER_SIZE];
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            self.stream.read_exact(&mut header),
        )
        .await
        .map_err(|_| anyhow::anyhow!("mysql read timed out after {}s", IO_TIMEOUT_SECS))??;

        let payload_len =
            (header[0] as usize) | ((header[1] as usize) << 8) | ((header[2] as usize) << 16);
        self.sequence_id = header[3].wrapping_add(1);

        let mut payload = vec![0u8; payload_len];
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            self.stream.read_exact(&mut payload),
        )
        .await
        .map_err(|_| anyhow::anyhow!("mysql read timed out after {}s", IO_TIMEOUT_SECS))??;

        Ok(payload)
    }

    async fn write_packet(&mut self, data: &[u8]) -> Result<()> {
        let len = data.len();
        if len > MAX_PACKET_SIZE {
            bail!("packet too large: {} bytes", len);
        }

        let mut packet = Vec::with_capacity(PACKET_HEADER_SIZE + len);
        packet.push((len & 0xFF) as u8);
        packet.push(((len >> 8) & 0xFF) as u8);
        packet.push(((len >> 16) & 0xFF) as u8);
        packet.push(self.sequence_id);
        packet.extend_from_slice(data);

        timeout(Duration::from_secs(IO_TIMEOUT_SECS), async {
            self.stream.get_mut().write_all(&packet).await?;
            self.stream.get_mut().flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        .map_err(|_| anyhow::anyhow!("mysql write timed out after {}s", IO_TIMEOUT_SECS))??;

        self.sequence_id = self.sequence_id.wrapping_add(1);

        Ok(())
    }

    async fn authenticate(
        &mut self,
        user: &str,
        password: Option<&str>,
        handshake: &HandshakePacket,
    ) -> Result<()> {
        let client_flags = CLIENT_LONG_PASSWORD
            | CLIENT_LONG_FLAG
            | CLIENT_PROTOCOL_41
            | CLIENT_TRANSACTIONS
            | CLIENT_SECURE_CONNECTION
            | CLIENT_PLUGIN_AUTH;

        let auth_response = Self::scramble(
            &handshake.auth_plugin_name,
            password,
            &handshake.auth_plugin_data,
        )?;

        let mut response = BytesMut::with_capacity(256);
        response.put_u32_le(client_flags);
        response.put_u32_le(MAX_PACKET_SIZE as u32);
        response.put_u8(45); // utf8mb4
        response.put_slice(&[0u8; 23]);
        response.put_slice(user.as_bytes());
        response.put_u8(0);
        response.put_u8(auth_response.len() as u8);
        response.put_slice(&auth_response);
        response.put_slice(handshake.auth_plugin_name.as_bytes());
        response.put_u8(0);

        self.write_packet(&response).await?;

        let resp = self.read_packet().await?;
        match resp.first() {
            Some(0x00) => {
                debug!("authentication successful");
                Ok(())
            }
            Some(0x01) => self.finish_caching_sha2(&resp).await,
            Some(0xFE) => {
                // Auth switch request
                let name_end = resp[1..].iter().position(|&b| b == 0).unwrap_or(resp.len() - 1);
                let plugin = String::from_utf8_lossy(&resp[1..1 + name_end]).to_string();
                let mut auth_data = resp.get(2 + name_end..).unwrap_or(&[]).to_vec();
                if auth_data.last() == Some(&0) {
                    auth_data.pop();
                }
                debug!("auth switch to plugin: {}", plugin);
                self.handle_auth_switch(&plugin, &auth_data, password).await
            }
            Some(0xFF) => Err(ServerError::parse(&resp))
                .context("authentication failed"),
            other => bail!("unexpected auth response: {:?}", other),
        }
    }

    async fn handle_auth_switch(
        &mut self,
        plugin: &str,
        auth_data: &[u8],
        password: Option<&str>,
    ) -> Result<()> {
        let auth_response = Self::scramble(plugin, password, auth_data)?;
        self.write_packet(&auth_response).await?;

        let resp = self.read_packet().await?;
        match resp.first() {
            Some(0x00) => Ok(()),
            Some(0x01) => self.finish_caching_sha2(&resp).await,
            Some(0xFF) => Err(ServerError::parse(&resp)).context("auth switch failed"),
            _ => bail!("unexpected auth switch response"),
        }
    }

    /// Handle the `caching_sha2_password` continuation packet. Only the fast
    /// path is supported: full authentication needs TLS or RSA, neither of
    /// which a replication user should require (seed the server's auth cache
    /// with one ordinary login, or use `mysql_native_password`).
    async fn finish_caching_sha2(&mut self, resp: &[u8]) -> Result<()> {
        match resp.get(1) {
            Some(0x03) => {
                debug!("caching_sha2_password: fast auth succeeded");
                // The OK packet follows the fast-auth marker.
                let ok = self.read_packet().await?;
                match ok.first() {
                    Some(0x00) => Ok(()),
                    Some(0xFF) => Err(ServerError::parse(&ok)).context("authentication failed"),
                    other => bail!("unexpected packet after fast auth: {:?}", other),
                }
            }
            Some(0x04) => bail!(
                "caching_sha2_password requires full authentication; use \
                 mysql_native_password for the replication user or log in once \
                 over an ordinary client to seed the auth cache"
            ),
            other => bail!("unknown caching_sha2_password response: {:?}", other),
        }
    }

    fn scramble(plugin: &str, password: Option<&str>, salt: &[u8]) -> Result<Vec<u8>> {
        match plugin {
            "mysql_native_password" | "" => Ok(mysql_native_password(password, salt)),
            "caching_sha2_password" | "sha256_password" => {
                Ok(caching_sha2_password(password, salt))
            }
            other => {
                warn!("unknown auth plugin {}, trying mysql_native_password", other);
                Ok(mysql_native_password(password, salt))
            }
        }
    }

    /// Execute a statement that returns OK or ERR (no result set expected).
    ///
    /// Server errors come back as a downcastable [`ServerError`], so the
    /// caller can branch on the MySQL error code.
    pub async fn query_ok(&mut self, sql: &str) -> Result<()> {
        self.sequence_id = 0;

        let mut packet = BytesMut::with_capacity(sql.len() + 1);
        packet.put_u8(COM_QUERY);
        packet.put_slice(sql.as_bytes());
        self.write_packet(&packet).await?;

        let resp = self.read_packet().await?;
        match resp.first() {
            Some(0x00) => Ok(()),
            Some(0xFF) => Err(ServerError::parse(&resp).into()),
            // A result set: drain it so the connection stays in sync.
            Some(_) => {
                self.drain_result_set(&resp).await?;
                Ok(())
            }
            None => bail!("empty response to query"),
        }
    }

    /// Execute a statement and return the first column of the first row, or
    /// `None` for an empty result or a NULL value.
    pub async fn query_scalar(&mut self, sql: &str) -> Result<Option<String>> {
        self.sequence_id = 0;

        let mut packet = BytesMut::with_capacity(sql.len() + 1);
        packet.put_u8(COM_QUERY);
        packet.put_slice(sql.as_bytes());
        self.write_packet(&packet).await?;

        let resp = self.read_packet().await?;
        match resp.first() {
            Some(0x00) => Ok(None),
            Some(0xFF) => Err(ServerError::parse(&resp).into()),
            Some(_) => self.read_scalar_rows(&resp).await,
            None => bail!("empty response to query"),
        }
    }

    /// Read column definitions and rows, returning the first value.
    async fn read_scalar_rows(&mut self, first: &[u8]) -> Result<Option<String>> {
        let mut cursor = std::io::Cursor::new(first);
        let column_count = read_lenenc_int(&mut cursor)? as usize;

        for _ in 0..column_count {
            self.read_packet().await?;
        }
        // EOF after column definitions
        let eof = self.read_packet().await?;
        if eof.first() != Some(&0xFE) {
            bail!("expected EOF after column definitions");
        }

        let mut scalar: Option<String> = None;
        loop {
            let row = self.read_packet().await?;
            match row.first() {
                Some(0xFE) if row.len() < 9 => break,
                Some(0xFF) => return Err(ServerError::parse(&row).into()),
                Some(0xFB) => continue, // NULL in the first column
                Some(_) => {
                    if scalar.is_none() {
                        let mut cursor = std::io::Cursor::new(row.as_slice());
                        let len = read_lenenc_int(&mut cursor)? as usize;
                        let start = cursor.position() as usize;
                        if row.len() < start + len {
                            bail!("truncated row packet");
                        }
                        scalar =
                            Some(String::from_utf8_lossy(&row[start..start + len]).to_string());
                    }
                }
                None => bail!("empty row packet"),
            }
        }

        Ok(scalar)
    }

    /// Drain a result set without interpreting it.
    async fn drain_result_set(&mut self, first: &[u8]) -> Result<()> {
        let mut cursor = std::io::Cursor::new(first);
        let column_count = read_lenenc_int(&mut cursor)? as usize;

        for _ in 0..column_count {
            self.read_packet().await?;
        }
        let eof = self.read_packet().await?;
        if eof.first() != Some(&0xFE) {
            bail!("expected EOF after column definitions");
        }
        loop {
            let row = self.read_packet().await?;
            match row.first() {
                Some(0xFE) if row.len() < 9 => return Ok(()),
                Some(0xFF) => return Err(ServerError::parse(&row).into()),
                _ => continue,
            }
        }
    }

    /// Register this client as a replica.
    ///
    /// Body layout: `server_id(4), hostname(lenenc), user(lenenc),
    /// password(lenenc), port(2), recovery_rank(4), master_id(4)`.
    pub async fn register_slave(
        &mut self,
        server_id: u32,
        hostname: &str,
        user: &str,
        password: &str,
        port: u16,
    ) -> Result<()> {
        self.sequence_id = 0;

        let mut packet = BytesMut::with_capacity(32 + hostname.len() + user.len() + password.len());
        packet.put_u8(COM_REGISTER_SLAVE);
        packet.put_u32_le(server_id);
        put_lenenc_str(&mut packet, hostname.as_bytes());
        put_lenenc_str(&mut packet, user.as_bytes());
        put_lenenc_str(&mut packet, password.as_bytes());
        packet.put_u16_le(port);
        packet.put_u32_le(0); // recovery rank, unused
        packet.put_u32_le(0); // master id, filled in by the primary

        self.write_packet(&packet).await?;

        let resp = self.read_packet().await?;
        match resp.first() {
            Some(0x00) => {
                info!("registered as replica with server_id={}", server_id);
                Ok(())
            }
            Some(0xFF) => Err(ServerError::parse(&resp)).context("failed to register replica"),
            _ => bail!("unexpected response to COM_REGISTER_SLAVE"),
        }
    }

    /// Request the binlog dump from `(log_name, position)`.
    ///
    /// Body layout: `pos(4), flags(2)=0, server_id(4), log_name(raw)`.
    /// The server replies with the event stream; nothing is read here.
    pub async fn request_dump(
        &mut self,
        server_id: u32,
        log_name: &str,
        position: u32,
    ) -> Result<()> {
        self.sequence_id = 0;

        let mut packet = BytesMut::with_capacity(11 + log_name.len());
        packet.put_u8(COM_BINLOG_DUMP);
        packet.put_u32_le(position);
        packet.put_u16_le(0); // flags
        packet.put_u32_le(server_id);
        packet.put_slice(log_name.as_bytes());

        self.write_packet(&packet).await?;

        info!("requested binlog dump from {}:{}", log_name, position);
        Ok(())
    }

    /// Read and classify one packet from the binlog stream.
    pub async fn read_binlog_packet(&mut self) -> Result<BinlogPacket> {
        let packet = self.read_packet().await?;

        match packet.first() {
            Some(0xFE) if packet.len() < 8 => {
                trace!("end-of-data marker in binlog stream");
                Ok(BinlogPacket::EndOfData)
            }
            Some(0x00) => Ok(BinlogPacket::Event(Bytes::from(packet[1..].to_vec()))),
            Some(0xFF) => Err(ServerError::parse(&packet).into()),
            other => bail!("unexpected leading byte in binlog packet: {:?}", other),
        }
    }

    /// Deregister by sending COM_QUIT. No response check: the server may
    /// close the connection without replying.
    pub async fn quit(mut self) {
        self.sequence_id = 0;
        let _ = self.write_packet(&[COM_QUIT]).await;
    }
}

/// `SHA1(password) XOR SHA1(salt + SHA1(SHA1(password)))`
fn mysql_native_password(password: Option<&str>, salt: &[u8]) -> Vec<u8> {
    match password {
        None | Some("") => vec![],
        Some(pwd) => {
            let mut hasher = Sha1::new();
            hasher.update(pwd.as_bytes());
            let stage1 = hasher.finalize();

            let mut hasher = Sha1::new();
            hasher.update(stage1);
            let stage2 = hasher.finalize();

            let mut hasher = Sha1::new();
            hasher.update(salt);
            hasher.update(stage2);
            let stage3 = hasher.finalize();

            stage1
                .iter()
                .zip(stage3.iter())
                .map(|(a, b)| a ^ b)
                .collect()
        }
    }
}

/// `XOR(SHA256(password), SHA256(SHA256(SHA256(password)) + salt))`
fn caching_sha2_password(password: Option<&str>, salt: &[u8]) -> Vec<u8> {
    match password {
        None | Some("") => vec![],
        Some(pwd) => {
            let mut hasher = Sha256::new();
            hasher.update(pwd.as_bytes());
            let hash1 = hasher.finalize();

            let mut hasher = Sha256::new();
            hasher.update(hash1);
            let hash2 = hasher.finalize();

            let mut hasher = Sha256::new();
            hasher.update(hash2);
            hasher.update(salt);
            let hash3 = hasher.finalize();

            hash1.iter().zip(hash3.iter()).map(|(a, b)| a ^ b).collect()
        }
    }
}

/// Append a length-encoded string: 1-byte length below 251, otherwise
/// `0xFC` plus a 2-byte length. Registration fields never exceed 64 KiB.
fn put_lenenc_str(buf: &mut BytesMut, data: &[u8]) {
    if data.len() < 251 {
        buf.put_u8(data.len() as u8);
    } else {
        buf.put_u8(0xFC);
        buf.put_u16_le(data.len() as u16);
    }
    buf.put_slice(data);
}

/// Read a length-encoded integer.
pub(crate) fn read_lenenc_int(cursor: &mut std::io::Cursor<&[u8]>) -> Result<u64> {
    let mut first = [0u8; 1];
    Read::read_exact(cursor, &mut first)?;
    match first[0] {
        v @ 0..=250 => Ok(v as u64),
        0xFC => {
            let mut buf = [0u8; 2];
            Read::read_exact(cursor, &mut buf)?;
            Ok(u16::from_le_bytes(buf) as u64)
        }
        0xFD => {
            let mut buf = [0u8; 3];
            Read::read_exact(cursor, &mut buf)?;
            Ok((buf[0] as u64) | ((buf[1] as u64) << 8) | ((buf[2] as u64) << 16))
        }
        0xFE => {
            let mut buf = [0u8; 8];
            Read::read_exact(cursor, &mut buf)?;
            Ok(u64::from_le_bytes(buf))
        }
        other => bail!("invalid length-encoded integer prefix: 0x{:02X}", other),
    }
}
