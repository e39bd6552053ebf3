pub mod page_token;
pub mod url;

pub use page_token::{PageToken, collect_tokens};
