use tiberius::error::Error as TiberiusError;

use crate::error::DalError;

/// Server error numbers that mean the session could not be established or
/// the database is temporarily unreachable.
const CONNECTION_SERVER_CODES: &[u32] = &[
    18456, // login failed
    4060,  // cannot open database
    40613, // database not currently available
    40197, // service error processing request
    40501, // service busy
    233,   // no process on the other end of the pipe
    10053, // connection aborted by host
    10054, // connection reset by peer
];

/// Map a tiberius error to a [`DalError`].
///
/// Transport, TLS, routing and protocol failures and the server codes above
/// are connection errors. Every other failure is a query error.
#[must_use]
pub fn classify(err: &TiberiusError) -> DalError {
    if is_connection_error(err) {
        DalError::ConnectionError(err.to_string())
    } else {
        DalError::QueryError(err.to_string())
    }
}

fn is_connection_error(err: &TiberiusError) -> bool {
    match err {
        TiberiusError::Io { .. }
        | TiberiusError::Tls(_)
        | TiberiusError::Routing { .. }
        | TiberiusError::Protocol(_) => true,
        TiberiusError::Server(token) => CONNECTION_SERVER_CODES.contains(&token.code()),
        _ => false,
    }
}

impl From<TiberiusError> for DalError {
    fn from(err: TiberiusError) -> Self {
        classify(&err)
    }
}

impl From<bb8::RunError<TiberiusError>> for DalError {
    fn from(err: bb8::RunError<TiberiusError>) -> Self {
        match err {
            bb8::RunError::User(err) => match classify(&err) {
                // A failed checkout is always a connection problem.
                DalError::QueryError(msg) => DalError::ConnectionError(msg),
                other => other,
            },
            bb8::RunError::TimedOut => {
                DalError::ConnectionError("timed out waiting for a pooled connection".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn refused_connections_are_transient() {
        let err = TiberiusError::from(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        let classified = classify(&err);
        assert!(classified.is_transient(), "{classified:?}");
    }

    #[test]
    fn conversion_failures_are_query_errors() {
        let err = TiberiusError::Conversion("cannot convert nvarchar to int".into());
        assert!(matches!(classify(&err), DalError::QueryError(_)));
    }

    #[test]
    fn checkout_timeouts_are_connection_errors() {
        let err: DalError = bb8::RunError::<TiberiusError>::TimedOut.into();
        assert!(matches!(err, DalError::ConnectionError(_)));
    }

    #[test]
    fn checkout_failures_are_connection_errors() {
        let err: DalError =
            bb8::RunError::User(TiberiusError::Conversion("handshake".into())).into();
        assert!(matches!(err, DalError::ConnectionError(_)));
    }
}
