use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ProxyError;

/// Record types a rule can match on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum RecordType {
    A = 1,      // IPv4 address
    NS = 2,     // Name server
    CNAME = 5,  // Canonical name
    SOA = 6,    // Start of authority
    WKS = 11,   // Well known service
    PTR = 12,   // Pointer record
    HINFO = 13, // Host information
    MINFO = 14, // Mailbox information
    MX = 15,    // Mail exchange
    TXT = 16,   // Text record
    AAAA = 28,  // IPv6 address
    LOC = 29,   // Location
    SRV = 33,   // Service locator
    ANY = 255,  // Any type
}

impl RecordType {
    pub const ALL: [RecordType; 14] = [
        RecordType::A,
        RecordType::AAAA,
        RecordType::ANY,
        RecordType::CNAME,
        RecordType::HINFO,
        RecordType::LOC,
        RecordType::MINFO,
        RecordType::MX,
        RecordType::NS,
        RecordType::PTR,
        RecordType::SOA,
        RecordType::SRV,
        RecordType::TXT,
        RecordType::WKS,
    ];

    /// Look up a wire type code. Codes outside the table yield `None`.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(RecordType::A),
            2 => Some(RecordType::NS),
            5 => Some(RecordType::CNAME),
            6 => Some(RecordType::SOA),
            11 => Some(RecordType::WKS),
            12 => Some(RecordType::PTR),
            13 => Some(RecordType::HINFO),
            14 => Some(RecordType::MINFO),
            15 => Some(RecordType::MX),
            16 => Some(RecordType::TXT),
            28 => Some(RecordType::AAAA),
            29 => Some(RecordType::LOC),
            33 => Some(RecordType::SRV),
            255 => Some(RecordType::ANY),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::NS => "NS",
            RecordType::CNAME => "CNAME",
            RecordType::SOA => "SOA",
            RecordType::WKS => "WKS",
            RecordType::PTR => "PTR",
            RecordType::HINFO => "HINFO",
            RecordType::MINFO => "MINFO",
            RecordType::MX => "MX",
            RecordType::TXT => "TXT",
            RecordType::AAAA => "AAAA",
            RecordType::LOC => "LOC",
            RecordType::SRV => "SRV",
            RecordType::ANY => "ANY",
        }
    }
}

impl TryFrom<u16> for RecordType {
    type Error = ProxyError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        RecordType::from_u16(value).ok_or_else(|| ProxyError::UnknownRecordType(value.to_string()))
    }
}

impl FromStr for RecordType {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|rtype| rtype.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProxyError::UnknownRecordType(s.to_string()))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response codes a rule can fail a query with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ErrorCode {
    NoError = 0,  // No error condition
    FormErr = 1,  // Format error
    ServFail = 2, // Server failure
    NXDomain = 3, // Name does not exist
    NotImp = 4,   // Not implemented
    Refused = 5,  // Refused by policy
    NotAuth = 9,  // Not authoritative
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 7] = [
        ErrorCode::NoError,
        ErrorCode::FormErr,
        ErrorCode::ServFail,
        ErrorCode::NXDomain,
        ErrorCode::NotImp,
        ErrorCode::Refused,
        ErrorCode::NotAuth,
    ];

    pub fn to_u16(self) -> u16 {
        self as u16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoError => "NoError",
            ErrorCode::FormErr => "FormErr",
            ErrorCode::ServFail => "ServFail",
            ErrorCode::NXDomain => "NXDomain",
            ErrorCode::NotImp => "NotImp",
            ErrorCode::Refused => "Refused",
            ErrorCode::NotAuth => "NotAuth",
        }
    }
}

impl FromStr for ErrorCode {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProxyError::UnknownErrorCode(s.to_string()))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
