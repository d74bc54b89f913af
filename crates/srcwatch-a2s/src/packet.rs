//! A2S_INFO packet codec.
//!
//! ```text
//! request:    FF FF FF FF  54  "Source Engine Query\0"  [challenge: 4 bytes]
//! challenge:  FF FF FF FF  41  <challenge: 4 bytes>
//! info:       FF FF FF FF  49  <payload>
//! ```
//!
//! All integers are little-endian. Strings are NUL-terminated.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::A2sError;
use crate::info::{Environment, ServerInfo, ServerType, SourceTv};

/// Header of a reply that fits in one datagram (`FF FF FF FF`).
const SINGLE_PACKET: i32 = -1;
/// Header of a multi-datagram reply (`FF FF FF FE`).
const SPLIT_PACKET: i32 = -2;

const A2S_INFO: u8 = 0x54;
const S2C_CHALLENGE: u8 = 0x41;
const S2A_INFO: u8 = 0x49;

const INFO_QUERY: &[u8] = b"Source Engine Query\0";

/// The Ship appends three extra bytes after the VAC flag.
const THE_SHIP_APP_ID: u16 = 2400;

// Extra data flag bits, in the order the fields appear on the wire.
const EDF_PORT: u8 = 0x80;
const EDF_STEAM_ID: u8 = 0x10;
const EDF_SOURCE_TV: u8 = 0x40;
const EDF_KEYWORDS: u8 = 0x20;
const EDF_GAME_ID: u8 = 0x01;

/// A decoded server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Info(ServerInfo),
    /// The server wants the request repeated with this challenge appended.
    Challenge([u8; 4]),
}

/// Encode an A2S_INFO request, optionally carrying a challenge.
pub fn encode_info_request(challenge: Option<[u8; 4]>) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 + 1 + INFO_QUERY.len() + 4);
    buf.put_i32_le(SINGLE_PACKET);
    buf.put_u8(A2S_INFO);
    buf.put_slice(INFO_QUERY);
    if let Some(challenge) = challenge {
        buf.put_slice(&challenge);
    }
    buf.freeze()
}

/// Decode one reply datagram.
pub fn decode_response(datagram: &[u8]) -> Result<Response, A2sError> {
    let mut buf = datagram;

    match read_i32(&mut buf, "packet header")? {
        SINGLE_PACKET => {}
        SPLIT_PACKET => return Err(A2sError::SplitResponse),
        other => {
            return Err(A2sError::Malformed(format!(
                "unknown packet header {other:#010x}"
            )));
        }
    }

    match read_u8(&mut buf, "reply type")? {
        S2C_CHALLENGE => {
            ensure(buf, 4, "challenge")?;
            let mut challenge = [0u8; 4];
            buf.copy_to_slice(&mut challenge);
            Ok(Response::Challenge(challenge))
        }
        S2A_INFO => decode_info(&mut buf).map(Response::Info),
        other => Err(A2sError::UnexpectedResponse(other)),
    }
}

fn decode_info(buf: &mut &[u8]) -> Result<ServerInfo, A2sError> {
    let protocol = read_u8(buf, "protocol")?;
    let name = read_cstr(buf, "name")?;
    let map = read_cstr(buf, "map")?;
    let folder = read_cstr(buf, "folder")?;
    let game = read_cstr(buf, "game")?;
    let app_id = read_u16(buf, "app id")?;
    let players = read_u8(buf, "players")?;
    let max_players = read_u8(buf, "max players")?;
    let bots = read_u8(buf, "bots")?;
    let server_type = ServerType::from(read_u8(buf, "server type")?);
    let environment = Environment::from(read_u8(buf, "environment")?);
    let private = read_u8(buf, "visibility")? != 0;
    let vac = read_u8(buf, "vac")? != 0;

    if app_id == THE_SHIP_APP_ID {
        ensure(buf, 3, "ship fields")?;
        buf.advance(3);
    }

    let version = read_cstr(buf, "version")?;

    let mut info = ServerInfo {
        protocol,
        name,
        map,
        folder,
        game,
        app_id,
        players,
        max_players,
        bots,
        server_type,
        environment,
        private,
        vac,
        version,
        port: None,
        steam_id: None,
        source_tv: None,
        keywords: None,
        game_id: None,
    };

    // The extra data block is optional; older servers end after the version.
    if buf.is_empty() {
        return Ok(info);
    }

    let edf = read_u8(buf, "extra data flag")?;
    if edf & EDF_PORT != 0 {
        info.port = Some(read_u16(buf, "port")?);
    }
    if edf & EDF_STEAM_ID != 0 {
        info.steam_id = Some(read_u64(buf, "steam id")?);
    }
    if edf & EDF_SOURCE_TV != 0 {
        let port = read_u16(buf, "sourcetv port")?;
        let name = read_cstr(buf, "sourcetv name")?;
        info.source_tv = Some(SourceTv { port, name });
    }
    if edf & EDF_KEYWORDS != 0 {
        info.keywords = Some(read_cstr(buf, "keywords")?);
    }
    if edf & EDF_GAME_ID != 0 {
        info.game_id = Some(read_u64(buf, "game id")?);
    }

    Ok(info)
}

fn ensure(buf: &[u8], len: usize, field: &str) -> Result<(), A2sError> {
    if buf.len() < len {
        return Err(A2sError::Malformed(format!("truncated {field}")));
    }
    Ok(())
}

fn read_u8(buf: &mut &[u8], field: &str) -> Result<u8, A2sError> {
    ensure(buf, 1, field)?;
    Ok(buf.get_u8())
}

fn read_u16(buf: &mut &[u8], field: &str) -> Result<u16, A2sError> {
    ensure(buf, 2, field)?;
    Ok(buf.get_u16_le())
}

fn read_i32(buf: &mut &[u8], field: &str) -> Result<i32, A2sError> {
    ensure(buf, 4, field)?;
    Ok(buf.get_i32_le())
}

fn read_u64(buf: &mut &[u8], field: &str) -> Result<u64, A2sError> {
    ensure(buf, 8, field)?;
    Ok(buf.get_u64_le())
}

fn read_cstr(buf: &mut &[u8], field: &str) -> Result<String, A2sError> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| A2sError::Malformed(format!("unterminated {field}")))?;
    let value = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.advance(end + 1);
    Ok(value)
}

/// A complete info reply as a CS:GO dedicated server would send it.
#[cfg(test)]
pub(crate) fn sample_info_reply() -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_i32_le(SINGLE_PACKET);
    buf.put_u8(S2A_INFO);
    buf.put_u8(17);
    buf.put_slice(b"srcwatch test\0");
    buf.put_slice(b"de_dust2\0");
    buf.put_slice(b"csgo\0");
    buf.put_slice(b"Counter-Strike: Global Offensive\0");
    buf.put_u16_le(730);
    buf.put_u8(12);
    buf.put_u8(24);
    buf.put_u8(2);
    buf.put_u8(b'd');
    buf.put_u8(b'l');
    buf.put_u8(0);
    buf.put_u8(1);
    buf.put_slice(b"1.38.7.9\0");
    buf.put_u8(EDF_PORT | EDF_KEYWORDS | EDF_GAME_ID);
    buf.put_u16_le(27015);
    buf.put_slice(b"secure\0");
    buf.put_u64_le(730);
    buf.to_vec()
}
