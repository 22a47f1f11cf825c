/// Faults a rate lookup can end in.
///
/// None of these escape the fetch boundary: [`super::RateFetcher`] turns
/// them into a `Failure` result carrying the error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    /// Caller-supplied date is not `YYYY-MM-DD`. Terminal, never retried.
    #[error("Неверный формат даты. Используйте ГГГГ-ММ-ДД")]
    InvalidDateFormat { input: String },

    /// The SOAP service answered with a protocol-level fault.
    #[error("SOAP ошибка: {0}")]
    TransportFault(String),

    /// Timeout, connection failure or non-2xx status on the document fetch.
    #[error("Ошибка сети: {0}")]
    NetworkFault(String),

    /// The response body is not the expected document.
    #[error("Ошибка разбора ответа: {0}")]
    ParseFault(String),

    #[error("Ошибка: {0}")]
    UnknownFault(String),
}

impl RateError {
    /// Short stable name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidDateFormat { .. } => "invalid_date_format",
            Self::TransportFault(_) => "transport_fault",
            Self::NetworkFault(_) => "network_fault",
            Self::ParseFault(_) => "parse_fault",
            Self::UnknownFault(_) => "unknown_fault",
        }
    }
}
