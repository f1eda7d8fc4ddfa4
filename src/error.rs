use crate::resp::RespValue;

/// The error payloads the splitter can hand back to a client.
///
/// The `Display` strings are wire-compatible: they travel verbatim as the
/// body of a RESP `Error` reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SplitError {
    #[error("wrong number of arguments for '{0}' command")]
    WrongNumberOfArguments(String),

    #[error("no upstream host")]
    NoUpstreamHost,

    #[error("upstream failure")]
    UpstreamFailure,

    #[error("upstream protocol error")]
    UpstreamProtocolError,

    #[error("invalid request")]
    InvalidRequest,

    #[error("unsupported command '{0}'")]
    UnsupportedCommand(String),
}

impl SplitError {
    /// Build the RESP error reply carrying this payload.
    pub fn to_resp(&self) -> RespValue {
        RespValue::error(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_strings() {
        assert_eq!(
            SplitError::WrongNumberOfArguments("EVAL".to_string()).to_string(),
            "wrong number of arguments for 'EVAL' command"
        );
        assert_eq!(SplitError::NoUpstreamHost.to_string(), "no upstream host");
        assert_eq!(SplitError::UpstreamFailure.to_string(), "upstream failure");
        assert_eq!(
            SplitError::UpstreamProtocolError.to_string(),
            "upstream protocol error"
        );
        assert_eq!(SplitError::InvalidRequest.to_string(), "invalid request");
        assert_eq!(
            SplitError::UnsupportedCommand("WATCH".to_string()).to_string(),
            "unsupported command 'WATCH'"
        );
    }

    #[test]
    fn test_to_resp() {
        assert_eq!(
            SplitError::UpstreamFailure.to_resp(),
            RespValue::error("upstream failure")
        );
    }
}
