//! Mapping provider-call errors onto the fault taxonomy.

use remora_core::FaultKind;
use remora_error::{ProviderErrorKind, RemoraError, RemoraErrorKind};

/// Classify a failed provider call into the fault kind driving staleness.
///
/// Transport failures map to [`FaultKind::Network`], which is never
/// persisted. Anything the provider client could not categorize, including
/// undecodable responses, lands in [`FaultKind::Unknown`].
pub fn classify_fault(error: &RemoraError) -> FaultKind {
    match error.kind() {
        RemoraErrorKind::Provider(provider) => match &provider.kind {
            ProviderErrorKind::NotFound(_) => FaultKind::Missing,
            ProviderErrorKind::RateLimited(_) | ProviderErrorKind::Server { .. } => {
                FaultKind::Provider
            }
            ProviderErrorKind::Client { .. } => FaultKind::Client,
            ProviderErrorKind::Network(_) => FaultKind::Network,
            ProviderErrorKind::Parse(_) | ProviderErrorKind::Other(_) => FaultKind::Unknown,
        },
        RemoraErrorKind::Http(_) => FaultKind::Network,
        _ => FaultKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_error::{HttpError, ProviderError};

    fn provider_error(kind: ProviderErrorKind) -> RemoraError {
        ProviderError::new(kind).into()
    }

    #[test]
    fn provider_kinds_map_to_fault_kinds() {
        let cases = [
            (
                ProviderErrorKind::NotFound("key".into()),
                FaultKind::Missing,
            ),
            (
                ProviderErrorKind::RateLimited("slow down".into()),
                FaultKind::Provider,
            ),
            (
                ProviderErrorKind::Server {
                    status: 503,
                    message: "overloaded".into(),
                },
                FaultKind::Provider,
            ),
            (
                ProviderErrorKind::Client {
                    status: 401,
                    message: "bad token".into(),
                },
                FaultKind::Client,
            ),
            (
                ProviderErrorKind::Network("connect refused".into()),
                FaultKind::Network,
            ),
            (
                ProviderErrorKind::Parse("truncated json".into()),
                FaultKind::Unknown,
            ),
        ];
        for (kind, expected) in cases {
            assert_eq!(classify_fault(&provider_error(kind)), expected);
        }
    }

    #[test]
    fn transport_errors_are_network() {
        let error: RemoraError = HttpError::new("connection reset").into();
        assert_eq!(classify_fault(&error), FaultKind::Network);
    }
}
