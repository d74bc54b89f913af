//! Decoded A2S_INFO reply.

/// Server description returned by an A2S_INFO query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Protocol version used by the server.
    pub protocol: u8,
    pub name: String,
    pub map: String,
    /// Game directory (e.g. "cstrike").
    pub folder: String,
    /// Full game name.
    pub game: String,
    /// Steam application id (truncated to 16 bits by the protocol).
    pub app_id: u16,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
    pub server_type: ServerType,
    pub environment: Environment,
    /// Whether the server requires a password.
    pub private: bool,
    /// Whether the server is VAC secured.
    pub vac: bool,
    pub version: String,
    /// Game port, when the server advertises it.
    pub port: Option<u16>,
    pub steam_id: Option<u64>,
    pub source_tv: Option<SourceTv>,
    pub keywords: Option<String>,
    /// Full 64-bit game id.
    pub game_id: Option<u64>,
}

/// SourceTV relay advertised in the extra data block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTv {
    pub port: u16,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    Dedicated,
    NonDedicated,
    SourceTv,
    Unknown(u8),
}

impl From<u8> for ServerType {
    fn from(byte: u8) -> Self {
        match byte {
            b'd' => ServerType::Dedicated,
            b'l' => ServerType::NonDedicated,
            b'p' => ServerType::SourceTv,
            other => ServerType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Linux,
    Windows,
    Mac,
    Unknown(u8),
}

impl From<u8> for Environment {
    fn from(byte: u8) -> Self {
        match byte {
            b'l' => Environment::Linux,
            b'w' => Environment::Windows,
            // Older servers report 'o' for macOS.
            b'm' | b'o' => Environment::Mac,
            other => Environment::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_type_from_byte() {
        assert_eq!(ServerType::from(b'd'), ServerType::Dedicated);
        assert_eq!(ServerType::from(b'l'), ServerType::NonDedicated);
        assert_eq!(ServerType::from(b'p'), ServerType::SourceTv);
        assert_eq!(ServerType::from(b'x'), ServerType::Unknown(b'x'));
    }

    #[test]
    fn environment_accepts_both_mac_markers() {
        assert_eq!(Environment::from(b'm'), Environment::Mac);
        assert_eq!(Environment::from(b'o'), Environment::Mac);
        assert_eq!(Environment::from(b'w'), Environment::Windows);
        assert_eq!(Environment::from(0), Environment::Unknown(0));
    }
}
