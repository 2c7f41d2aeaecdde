//! Line-delimited JSON protocol: one request object per line, one response
//! object per line.

mod request;
mod response;

pub use request::{Action, Request, RequestError};
pub use response::{Outcome, Response};
