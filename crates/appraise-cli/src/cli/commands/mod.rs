//! Command implementations.

pub mod comments;
pub mod helpers;
pub mod reviews;
pub mod submit;
pub mod sync;

pub use comments::{run_accept, run_comment, run_reject, CommentArgs};
pub use reviews::{run_list, run_request, run_show};
pub use submit::run_submit;
pub use sync::{run_pull, run_push};
