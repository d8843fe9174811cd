//! Method identifiers for the binary RPC framing.
//!
//! Each frame is a length-delimited payload of one method-id byte followed
//! by the prost-encoded message body.

/// RPC verbs exposed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Method {
    CreateCollection = 1,
    DropCollection = 2,
    DescribeCollection = 3,
    ListCollections = 4,
    StatsCollection = 5,
    Write = 6,
    Query = 7,
    GetDocumentByKey = 8,
    GetVersion = 9,
}

impl Method {
    pub fn from_u8(value: u8) -> Option<Method> {
        match value {
            1 => Some(Method::CreateCollection),
            2 => Some(Method::DropCollection),
            3 => Some(Method::DescribeCollection),
            4 => Some(Method::ListCollections),
            5 => Some(Method::StatsCollection),
            6 => Some(Method::Write),
            7 => Some(Method::Query),
            8 => Some(Method::GetDocumentByKey),
            9 => Some(Method::GetVersion),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}
