//! Upstream messages API envelope
//!
//! Request and response schema for the single-flight text-generation endpoint.

mod request;
mod response;

pub use request::{CacheControl, Message, MessagesRequest, Role, SystemBlock};
pub use response::{
    ContentBlock, ErrorDetail, ErrorEnvelope, MessagesResponse, Usage, strip_code_fences,
};
