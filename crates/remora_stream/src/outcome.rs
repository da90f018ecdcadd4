//! Terminal stream outcomes and their HTTP classification.

use reqwest::StatusCode;

/// How a range-stream attempt ended.
///
/// A client disconnect mid-stream is `Ok`: the client got what it asked
/// for before leaving. Only `DeadLink` tells the caller the resolved URL
/// itself is no longer usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum StreamOutcome {
    /// The requested range was delivered, or the client disconnected
    Ok,
    /// The resolved URL no longer answers; re-resolution is needed
    DeadLink,
    /// The host failed server-side or shed load
    ProviderFault,
    /// Transfer-level I/O failure
    IoFault,
    /// The host rejected the request as malformed
    ClientFault,
    /// Anything that fits no other bucket
    UnknownFault,
}

impl StreamOutcome {
    /// Whether the stream ended without a fault.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Classify a response status; `None` means proceed with the body.
    ///
    /// Expired direct-download links surface as 404, 410, or 403 depending
    /// on the host, so all three mean the link is dead rather than the
    /// request malformed. A plain 200 passes here but only satisfies a
    /// range starting at offset zero; the pipeline refuses it for mid-file
    /// segments.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => None,
            StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::FORBIDDEN => {
                Some(Self::DeadLink)
            }
            StatusCode::TOO_MANY_REQUESTS => Some(Self::ProviderFault),
            s if s.is_server_error() => Some(Self::ProviderFault),
            s if s.is_client_error() => Some(Self::ClientFault),
            _ => Some(Self::UnknownFault),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(StreamOutcome::from_status(StatusCode::PARTIAL_CONTENT), None);
        assert_eq!(StreamOutcome::from_status(StatusCode::OK), None);
        assert_eq!(
            StreamOutcome::from_status(StatusCode::NOT_FOUND),
            Some(StreamOutcome::DeadLink)
        );
        assert_eq!(
            StreamOutcome::from_status(StatusCode::GONE),
            Some(StreamOutcome::DeadLink)
        );
        assert_eq!(
            StreamOutcome::from_status(StatusCode::FORBIDDEN),
            Some(StreamOutcome::DeadLink)
        );
        assert_eq!(
            StreamOutcome::from_status(StatusCode::TOO_MANY_REQUESTS),
            Some(StreamOutcome::ProviderFault)
        );
        assert_eq!(
            StreamOutcome::from_status(StatusCode::BAD_GATEWAY),
            Some(StreamOutcome::ProviderFault)
        );
        assert_eq!(
            StreamOutcome::from_status(StatusCode::RANGE_NOT_SATISFIABLE),
            Some(StreamOutcome::ClientFault)
        );
    }
}
