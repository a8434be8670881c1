//! Oracle error classification.

/// ORA-31603: object not found in schema (raised by `DBMS_METADATA`).
pub(super) const ORA_OBJECT_NOT_FOUND: i32 = 31603;

/// ORA-01031: insufficient privileges.
pub(super) const ORA_INSUFFICIENT_PRIVILEGES: i32 = 1031;

/// ORA-00942: table or view does not exist (also raised when not granted).
pub(super) const ORA_TABLE_OR_VIEW_MISSING: i32 = 942;

/// How an Oracle error code is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ErrorClass {
    /// The object was dropped between listing and extraction
    ObjectNotFound,
    /// The session user lacks access to a catalog view or package
    InsufficientPrivileges,
    /// Anything else; fatal
    Other,
}

/// Classifies an Oracle error code.
pub(super) fn classify_code(code: i32) -> ErrorClass {
    match code {
        ORA_OBJECT_NOT_FOUND => ErrorClass::ObjectNotFound,
        ORA_INSUFFICIENT_PRIVILEGES | ORA_TABLE_OR_VIEW_MISSING => {
            ErrorClass::InsufficientPrivileges
        }
        _ => ErrorClass::Other,
    }
}

/// Server error code carried by a driver error, if any.
pub(super) fn db_error_code(error: &oracle::Error) -> Option<i32> {
    match error {
        oracle::Error::OciError(db) | oracle::Error::DpiError(db) => Some(db.code()),
        _ => None,
    }
}

/// Classifies a driver error.
pub(super) fn classify(error: &oracle::Error) -> ErrorClass {
    db_error_code(error).map_or(ErrorClass::Other, classify_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_codes() {
        assert_eq!(classify_code(31603), ErrorClass::ObjectNotFound);
        assert_eq!(classify_code(1031), ErrorClass::InsufficientPrivileges);
        assert_eq!(classify_code(942), ErrorClass::InsufficientPrivileges);
        assert_eq!(classify_code(3113), ErrorClass::Other);
        assert_eq!(classify_code(0), ErrorClass::Other);
    }

    #[test]
    fn test_classify_non_server_error() {
        assert_eq!(classify(&oracle::Error::NullValue), ErrorClass::Other);
        assert_eq!(db_error_code(&oracle::Error::NullValue), None);
    }
}
