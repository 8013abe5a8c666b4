//! Error taxonomy for the Kyrazo client.
//!
//! Every failure that leaves the crate is a [`KyrazoError`]:
//! - [`ErrorKind`] - the closed set of error kinds, with default messages and codes
//! - [`KyrazoError`] - one variant per kind, carrying kind-specific context
//! - [`error_from_response`] - maps a failed HTTP response onto a kind
//! - [`ErrorResponse`] / [`ErrorDetail`] - the error envelope the API sends

mod kind;
mod kyrazo_error;
mod mapper;

pub use kind::ErrorKind;
pub use kyrazo_error::{KyrazoError, NetworkCause};
pub use mapper::{error_from_response, ErrorDetail, ErrorResponse, REQUEST_ID_HEADER};
