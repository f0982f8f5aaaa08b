//! Protobuf message definitions exchanged by the connection and session core.
//!
//! Only the subset of the Mysqlx schema that this server reads or writes is
//! declared here. Field tags follow the upstream `.proto` files so the
//! messages interoperate with standard X Protocol clients.

// Mysqlx.Datatypes

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ScalarType {
    VSint = 1,
    VUint = 2,
    VNull = 3,
    VOctets = 4,
    VDouble = 5,
    VFloat = 6,
    VBool = 7,
    VString = 8,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ScalarString {
    #[prost(bytes = "vec", required, tag = "1")]
    pub value: Vec<u8>,
    #[prost(uint64, optional, tag = "2")]
    pub collation: Option<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ScalarOctets {
    #[prost(bytes = "vec", required, tag = "1")]
    pub value: Vec<u8>,
    #[prost(uint32, optional, tag = "2")]
    pub content_type: Option<u32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Scalar {
    #[prost(enumeration = "ScalarType", required, tag = "1")]
    pub r#type: i32,
    #[prost(sint64, optional, tag = "2")]
    pub v_signed_int: Option<i64>,
    #[prost(uint64, optional, tag = "3")]
    pub v_unsigned_int: Option<u64>,
    #[prost(message, optional, tag = "5")]
    pub v_octets: Option<ScalarOctets>,
    #[prost(bool, optional, tag = "8")]
    pub v_bool: Option<bool>,
    #[prost(message, optional, tag = "9")]
    pub v_string: Option<ScalarString>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum AnyType {
    Scalar = 1,
    Object = 2,
    Array = 3,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Any {
    #[prost(enumeration = "AnyType", required, tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub scalar: Option<Scalar>,
    #[prost(message, optional, tag = "4")]
    pub array: Option<Array>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Array {
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<Any>,
}

// Mysqlx.Connection

#[derive(Clone, PartialEq, prost::Message)]
pub struct Capability {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Any>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Capabilities {
    #[prost(message, repeated, tag = "1")]
    pub capabilities: Vec<Capability>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CapabilitiesGet {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CapabilitiesSet {
    #[prost(message, optional, tag = "1")]
    pub capabilities: Option<Capabilities>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ConnectionClose {}

// Mysqlx.Session

#[derive(Clone, PartialEq, prost::Message)]
pub struct AuthenticateStart {
    #[prost(string, required, tag = "1")]
    pub mech_name: String,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub auth_data: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub initial_response: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AuthenticateContinue {
    #[prost(bytes = "vec", required, tag = "1")]
    pub auth_data: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AuthenticateOk {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub auth_data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SessionReset {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SessionClose {}

// Mysqlx.Sql

#[derive(Clone, PartialEq, prost::Message)]
pub struct StmtExecute {
    #[prost(bytes = "vec", required, tag = "1")]
    pub stmt: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub args: Vec<Any>,
    #[prost(string, optional, tag = "3")]
    pub namespace: Option<String>,
    #[prost(bool, optional, tag = "4")]
    pub compact_metadata: Option<bool>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StmtExecuteOk {}

// Mysqlx (Ok / Error)

#[derive(Clone, PartialEq, prost::Message)]
pub struct OkResponse {
    #[prost(string, optional, tag = "1")]
    pub msg: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ErrorSeverity {
    Error = 0,
    Fatal = 1,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ErrorResponse {
    #[prost(enumeration = "ErrorSeverity", optional, tag = "1")]
    pub severity: Option<i32>,
    #[prost(uint32, required, tag = "2")]
    pub code: u32,
    #[prost(string, required, tag = "3")]
    pub msg: String,
    #[prost(string, required, tag = "4")]
    pub sql_state: String,
}

// Mysqlx.Notice

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum NoticeScope {
    Global = 1,
    Local = 2,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NoticeFrame {
    #[prost(uint32, required, tag = "1")]
    pub r#type: u32,
    #[prost(enumeration = "NoticeScope", optional, tag = "2")]
    pub scope: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub payload: Option<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum StateParameter {
    CurrentSchema = 1,
    AccountExpired = 2,
    GeneratedInsertId = 3,
    RowsAffected = 4,
    RowsFound = 5,
    RowsMatched = 6,
    TrxCommitted = 7,
    TrxRolledback = 9,
    ProducedMessage = 10,
    ClientIdAssigned = 11,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SessionStateChanged {
    #[prost(enumeration = "StateParameter", required, tag = "1")]
    pub param: i32,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Scalar>,
}
