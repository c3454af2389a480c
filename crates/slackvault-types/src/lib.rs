pub mod api;
pub mod models;
pub mod sync;
pub mod ts;

pub use ts::SlackTs;
