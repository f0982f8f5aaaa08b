/// Message types sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClientMessageType {
    CapabilitiesGet = 1,
    CapabilitiesSet = 2,
    ConnectionClose = 3,
    AuthenticateStart = 4,
    AuthenticateContinue = 5,
    SessionReset = 6,
    SessionClose = 7,
    SqlStmtExecute = 12,
    CrudFind = 17,
    CrudInsert = 18,
    CrudUpdate = 19,
    CrudDelete = 20,
    ExpectOpen = 24,
    ExpectClose = 25,
    CrudCreateView = 30,
    CrudModifyView = 31,
    CrudDropView = 32,
}

impl TryFrom<u8> for ClientMessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ClientMessageType::CapabilitiesGet),
            2 => Ok(ClientMessageType::CapabilitiesSet),
            3 => Ok(ClientMessageType::ConnectionClose),
            4 => Ok(ClientMessageType::AuthenticateStart),
            5 => Ok(ClientMessageType::AuthenticateContinue),
            6 => Ok(ClientMessageType::SessionReset),
            7 => Ok(ClientMessageType::SessionClose),
            12 => Ok(ClientMessageType::SqlStmtExecute),
            17 => Ok(ClientMessageType::CrudFind),
            18 => Ok(ClientMessageType::CrudInsert),
            19 => Ok(ClientMessageType::CrudUpdate),
            20 => Ok(ClientMessageType::CrudDelete),
            24 => Ok(ClientMessageType::ExpectOpen),
            25 => Ok(ClientMessageType::ExpectClose),
            30 => Ok(ClientMessageType::CrudCreateView),
            31 => Ok(ClientMessageType::CrudModifyView),
            32 => Ok(ClientMessageType::CrudDropView),
            _ => Err(value),
        }
    }
}

impl ClientMessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Message types sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServerMessageType {
    Ok = 0,
    Error = 1,
    ConnectionCapabilities = 2,
    AuthenticateContinue = 3,
    AuthenticateOk = 4,
    Notice = 11,
    SqlStmtExecuteOk = 17,
}

impl TryFrom<u8> for ServerMessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(ServerMessageType::Ok),
            1 => Ok(ServerMessageType::Error),
            2 => Ok(ServerMessageType::ConnectionCapabilities),
            3 => Ok(ServerMessageType::AuthenticateContinue),
            4 => Ok(ServerMessageType::AuthenticateOk),
            11 => Ok(ServerMessageType::Notice),
            17 => Ok(ServerMessageType::SqlStmtExecuteOk),
            _ => Err(value),
        }
    }
}

impl ServerMessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Server error codes carried in `Mysqlx.Error.code`.
pub mod error_code {
    pub const CON_COUNT_ERROR: u16 = 1040;
    pub const ACCESS_DENIED: u16 = 1045;
    pub const UNKNOWN_ERROR: u16 = 1105;
    pub const NET_PACKET_TOO_LARGE: u16 = 1153;
    pub const NET_PACKETS_OUT_OF_ORDER: u16 = 1156;
    pub const NOT_SUPPORTED_AUTH_MODE: u16 = 1251;
    pub const X_BAD_MESSAGE: u16 = 5000;
    pub const X_CAPABILITIES_PREPARE_FAILED: u16 = 5001;
    pub const X_CAPABILITY_NOT_FOUND: u16 = 5002;
    pub const X_INVALID_NAMESPACE: u16 = 5162;
}

/// SQLSTATE values paired with the error codes above.
pub mod sql_state {
    pub const GENERAL_ERROR: &str = "HY000";
    pub const INVALID_AUTHORIZATION: &str = "28000";
    pub const CLIENT_UNABLE_TO_CONNECT: &str = "08004";
    pub const COMMUNICATION_LINK_FAILURE: &str = "08S01";

    /// Returns the SQLSTATE conventionally paired with an error code.
    pub fn for_code(code: u16) -> &'static str {
        use super::error_code;
        match code {
            error_code::ACCESS_DENIED => INVALID_AUTHORIZATION,
            error_code::NOT_SUPPORTED_AUTH_MODE | error_code::CON_COUNT_ERROR => {
                CLIENT_UNABLE_TO_CONNECT
            }
            error_code::NET_PACKETS_OUT_OF_ORDER | error_code::NET_PACKET_TOO_LARGE => {
                COMMUNICATION_LINK_FAILURE
            }
            _ => GENERAL_ERROR,
        }
    }
}

/// Notice frame types (`Mysqlx.Notice.Frame.type`).
pub mod notice_type {
    pub const SESSION_STATE_CHANGED: u32 = 3;
}
