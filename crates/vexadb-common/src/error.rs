//! Error types for VexaDB
//!
//! Every public operation resolves to a `(code, reason)` pair on the wire.
//! Code 0 is success; every failure kind below owns a stable negative code
//! grouped by subsystem: common 1000s, schema/format 2000s, meta 3000s,
//! index/runtime 4000s, query 5000s.

use thiserror::Error;

/// Result type alias using VexaDB's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for VexaDB
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Common Errors
    #[error("Runtime error")]
    RuntimeError,
    #[error("Load config error")]
    LoadConfig,
    #[error("Config error")]
    ConfigError,
    #[error("Invalid arguments")]
    InvalidArgument,
    #[error("Not initialized")]
    NotInitialized,
    #[error("Open file error")]
    OpenFile,
    #[error("Read data error")]
    ReadData,
    #[error("Write data error")]
    WriteData,
    #[error("Serialize error")]
    SerializeError,
    #[error("Deserialize error")]
    DeserializeError,
    #[error("Start server error")]
    StartServer,
    #[error("Service stopped")]
    StoppedService,

    // Schema/Format Errors
    #[error("Empty collection name")]
    EmptyCollectionName,
    #[error("Empty column name")]
    EmptyColumnName,
    #[error("Empty columns")]
    EmptyColumns,
    #[error("Empty repository table")]
    EmptyRepositoryTable,
    #[error("Empty repository name")]
    EmptyRepositoryName,
    #[error("Invalid URI")]
    InvalidUri,
    #[error("Invalid collection status")]
    InvalidCollectionStatus,
    #[error("Invalid record")]
    InvalidRecord,
    #[error("Invalid query")]
    InvalidQuery,
    #[error("Invalid write request")]
    InvalidWriteRequest,
    #[error("Invalid vector format")]
    InvalidVectorFormat,
    #[error("Invalid repository type")]
    InvalidRepositoryType,
    #[error("Invalid data type")]
    InvalidDataType,
    #[error("Invalid index type")]
    InvalidIndexType,
    #[error("Invalid revision")]
    InvalidRevision,
    #[error("Invalid feature")]
    InvalidFeature,
    #[error("Mismatched schema")]
    MismatchedSchema,
    #[error("Mismatched magic number")]
    MismatchedMagicNumber,
    #[error("Mismatched index column")]
    MismatchedIndexColumn,
    #[error("Mismatched forward column")]
    MismatchedForward,
    #[error("Mismatched dimension")]
    MismatchedDimension,
    #[error("Mismatched data type")]
    MismatchedDataType,

    // Meta Errors
    #[error("Update status field")]
    UpdateStatusField,
    #[error("Update revision field")]
    UpdateRevisionField,
    #[error("Update collection uid field")]
    UpdateCollectionUidField,
    #[error("Update index type field")]
    UpdateIndexTypeField,
    #[error("Update data type field")]
    UpdateDataTypeField,
    #[error("Update dimension field")]
    UpdateDimensionField,
    #[error("Update repository type field")]
    UpdateRepositoryTypeField,
    #[error("Update column name field")]
    UpdateColumnNameField,
    #[error("Zero docs per segment")]
    ZeroDocsPerSegment,
    #[error("Unsupported connection")]
    UnsupportedConnection,

    // Index/Runtime Errors
    #[error("Duplicate collection")]
    DuplicateCollection,
    #[error("Duplicate key")]
    DuplicateKey,
    #[error("Inexistent collection")]
    InexistentCollection,
    #[error("Inexistent column")]
    InexistentColumn,
    #[error("Inexistent key")]
    InexistentKey,
    #[error("Suspended collection")]
    SuspendedCollection,
    #[error("Lost segment")]
    LostSegment,
    #[error("Empty lsn context")]
    EmptyLsnContext,
    #[error("Exceed rate limit")]
    ExceedRateLimit,

    // Query Errors
    #[error("Unavailable segment")]
    UnavailableSegment,
    #[error("Out of bounds result")]
    OutOfBoundsResult,
    #[error("Unready queue")]
    UnreadyQueue,
    #[error("Schedule error")]
    ScheduleError,
    #[error("Unreadable collection")]
    UnreadableCollection,
    #[error("Task is running")]
    TaskIsRunning,
}

macro_rules! error_codes {
    ($($variant:ident => $code:expr),+ $(,)?) => {
        impl Error {
            /// Stable negative wire code of this error kind.
            pub fn code(&self) -> i32 {
                match self {
                    $(Error::$variant => -$code,)+
                }
            }

            /// Resolve a wire code back to its error kind.
            pub fn from_code(code: i32) -> Option<Error> {
                match -code {
                    $($code => Some(Error::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

error_codes! {
    RuntimeError => 1000,
    LoadConfig => 1001,
    ConfigError => 1002,
    InvalidArgument => 1003,
    NotInitialized => 1004,
    OpenFile => 1005,
    ReadData => 1006,
    WriteData => 1007,
    SerializeError => 1008,
    DeserializeError => 1009,
    StartServer => 1010,
    StoppedService => 1011,

    EmptyCollectionName => 2000,
    EmptyColumnName => 2001,
    EmptyColumns => 2002,
    EmptyRepositoryTable => 2003,
    EmptyRepositoryName => 2004,
    InvalidUri => 2005,
    InvalidCollectionStatus => 2006,
    InvalidRecord => 2007,
    InvalidQuery => 2008,
    InvalidWriteRequest => 2009,
    InvalidVectorFormat => 2010,
    InvalidRepositoryType => 2011,
    InvalidDataType => 2012,
    InvalidIndexType => 2013,
    InvalidRevision => 2014,
    InvalidFeature => 2015,
    MismatchedSchema => 2016,
    MismatchedMagicNumber => 2017,
    MismatchedIndexColumn => 2018,
    MismatchedForward => 2019,
    MismatchedDimension => 2020,
    MismatchedDataType => 2021,

    UpdateStatusField => 3000,
    UpdateRevisionField => 3001,
    UpdateCollectionUidField => 3002,
    UpdateIndexTypeField => 3003,
    UpdateDataTypeField => 3004,
    UpdateDimensionField => 3005,
    UpdateRepositoryTypeField => 3006,
    UpdateColumnNameField => 3007,
    ZeroDocsPerSegment => 3008,
    UnsupportedConnection => 3009,

    DuplicateCollection => 4000,
    DuplicateKey => 4001,
    InexistentCollection => 4002,
    InexistentColumn => 4003,
    InexistentKey => 4004,
    SuspendedCollection => 4005,
    LostSegment => 4006,
    EmptyLsnContext => 4007,
    ExceedRateLimit => 4008,

    UnavailableSegment => 5000,
    OutOfBoundsResult => 5001,
    UnreadyQueue => 5002,
    ScheduleError => 5003,
    UnreadableCollection => 5004,
    TaskIsRunning => 5005,
}

impl Error {
    /// Stable description string shipped in the wire status pair.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Description for an arbitrary wire code, empty when unknown.
    pub fn what(code: i32) -> String {
        if code == 0 {
            return String::new();
        }
        Error::from_code(code)
            .map(|e| e.reason())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_negative_and_stable() {
        assert_eq!(Error::RuntimeError.code(), -1000);
        assert_eq!(Error::MismatchedDataType.code(), -2021);
        assert_eq!(Error::UpdateDataTypeField.code(), -3004);
        assert_eq!(Error::ExceedRateLimit.code(), -4008);
        assert_eq!(Error::UnreadableCollection.code(), -5004);
    }

    #[test]
    fn code_round_trip() {
        for err in [
            Error::InvalidWriteRequest,
            Error::MismatchedMagicNumber,
            Error::SuspendedCollection,
            Error::InexistentCollection,
            Error::ScheduleError,
        ] {
            assert_eq!(Error::from_code(err.code()), Some(err));
        }
        assert_eq!(Error::from_code(-1), None);
    }

    #[test]
    fn what_maps_codes_to_reasons() {
        assert_eq!(Error::what(0), "");
        assert_eq!(Error::what(-4005), "Suspended collection");
        assert_eq!(Error::what(-424242), "");
    }
}
