//! error taxonomy of the crate.
//!
//! Every failure a caller can observe is a variant of [HomError] and carries a
//! stable numeric code via [ErrorCode]. Errors propagate to the service
//! boundary as is, there is no retry at this level.
//! Note that a filter *rejection* is not an error : a well formed record the
//! caller is not permitted to see is silently dropped by the filter chain.

use thiserror::Error;

/// stable application error codes. The numeric value is part of the public
/// contract and must not be renumbered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    AuthenticationFailed = 10000,
    NoToken = 10010,
    MissingParameter = 30000,
    IllegalParameter = 30001,
    RequestCanceled = 30010,
    ComputationTimeout = 30020,
    NoSuchNamespace = 40010,
    NoSuchSequence = 40020,
    InvalidSketch = 50000,
    IncompatibleSketches = 50010,
    IncompatibleNamespaces = 50020,
    IncompatibleAuthentication = 50030,
    FilterError = 60000,
    LoadParse = 70000,
    Storage = 80000,
    Configuration = 90000,
} // end of ErrorCode

impl ErrorCode {
    /// numeric form of the code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// short stable description of the error class
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationFailed => "Authentication failed",
            ErrorCode::NoToken => "No authentication token",
            ErrorCode::MissingParameter => "Missing input parameter",
            ErrorCode::IllegalParameter => "Illegal input parameter",
            ErrorCode::RequestCanceled => "Request canceled",
            ErrorCode::ComputationTimeout => "Distance computation timed out",
            ErrorCode::NoSuchNamespace => "No such namespace",
            ErrorCode::NoSuchSequence => "No such sequence",
            ErrorCode::InvalidSketch => "Invalid sketch",
            ErrorCode::IncompatibleSketches => "Incompatible sketches",
            ErrorCode::IncompatibleNamespaces => "Incompatible namespaces",
            ErrorCode::IncompatibleAuthentication => "Incompatible authentication",
            ErrorCode::FilterError => "Distance filter error",
            ErrorCode::LoadParse => "Load data parse error",
            ErrorCode::Storage => "Storage communication error",
            ErrorCode::Configuration => "Configuration error",
        }
    } // end of description
} // end of impl ErrorCode

//==================================================================================

/// the crate wide error type
#[derive(Error, Debug)]
pub enum HomError {
    #[error("missing parameter : {0}")]
    MissingParameter(String),

    #[error("illegal parameter : {0}")]
    IllegalParameter(String),

    #[error("request canceled")]
    Canceled,

    #[error("distance computation exceeded timeout of {0} ms")]
    Timeout(u128),

    #[error("no such namespace : {0}")]
    NoSuchNamespace(String),

    #[error("no such sequence in namespace {namespace} load {load} : {id}")]
    NoSuchSequence {
        namespace: String,
        load: String,
        id: String,
    },

    #[error("invalid sketch : {0}")]
    InvalidSketch(String),

    #[error("incompatible sketches : {0}")]
    IncompatibleSketches(String),

    #[error("incompatible namespaces : {0}")]
    IncompatibleNamespaces(String),

    #[error("incompatible authentication : {0}")]
    IncompatibleAuthentication(String),

    #[error("authentication failed : {0}")]
    AuthenticationFailed(String),

    #[error("no authentication token provided")]
    NoToken,

    #[error("filter error : {0}")]
    Filter(String),

    #[error("load parse error : {0}")]
    LoadParse(String),

    #[error("storage error : {0}")]
    Storage(String),

    #[error("configuration error : {0}")]
    Configuration(String),
} // end of HomError

impl HomError {
    /// the stable numeric code of this error
    pub fn code(&self) -> ErrorCode {
        match self {
            HomError::MissingParameter(_) => ErrorCode::MissingParameter,
            HomError::IllegalParameter(_) => ErrorCode::IllegalParameter,
            HomError::Canceled => ErrorCode::RequestCanceled,
            HomError::Timeout(_) => ErrorCode::ComputationTimeout,
            HomError::NoSuchNamespace(_) => ErrorCode::NoSuchNamespace,
            HomError::NoSuchSequence { .. } => ErrorCode::NoSuchSequence,
            HomError::InvalidSketch(_) => ErrorCode::InvalidSketch,
            HomError::IncompatibleSketches(_) => ErrorCode::IncompatibleSketches,
            HomError::IncompatibleNamespaces(_) => ErrorCode::IncompatibleNamespaces,
            HomError::IncompatibleAuthentication(_) => ErrorCode::IncompatibleAuthentication,
            HomError::AuthenticationFailed(_) => ErrorCode::AuthenticationFailed,
            HomError::NoToken => ErrorCode::NoToken,
            HomError::Filter(_) => ErrorCode::FilterError,
            HomError::LoadParse(_) => ErrorCode::LoadParse,
            HomError::Storage(_) => ErrorCode::Storage,
            HomError::Configuration(_) => ErrorCode::Configuration,
        }
    } // end of code
} // end of impl HomError

//==================================================================================

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_codes_stable() {
        assert_eq!(ErrorCode::MissingParameter.code(), 30000);
        assert_eq!(ErrorCode::NoSuchNamespace.code(), 40010);
        assert_eq!(ErrorCode::FilterError.code(), 60000);
        assert_eq!(ErrorCode::Configuration.code(), 90000);
    }

    #[test]
    fn test_error_maps_to_code() {
        let err = HomError::NoSuchNamespace(String::from("refseq"));
        assert_eq!(err.code(), ErrorCode::NoSuchNamespace);
        assert_eq!(err.code().description(), "No such namespace");
        let err = HomError::Filter(String::from("bad upa"));
        assert_eq!(err.code().code(), 60000);
    }
} // end of mod tests
