use http::StatusCode;

use crate::error::Rejection;

/// Outcome of the per-request decision function.
///
/// Adapters translate this into their own response API: `Pass` forwards the
/// request untouched, `Reject` answers with [`Rejection::status`] and
/// [`Rejection::body`], `Proceed` forwards after adding `headers`.
#[derive(Debug)]
pub enum Decision {
    Pass,
    Reject(Rejection),
    Proceed { headers: Vec<(&'static str, String)> },
}

impl Decision {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Decision::Reject(_))
    }

    /// Status of a rejection, `None` otherwise.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Decision::Reject(rejection) => Some(rejection.status()),
            _ => None,
        }
    }

    /// Value of a header to add on `Proceed`.
    pub fn forwarded_header(&self, name: &str) -> Option<&str> {
        match self {
            Decision::Proceed { headers } => headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}
