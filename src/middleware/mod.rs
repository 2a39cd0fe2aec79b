pub mod response;

pub use response::{ApiResponse, ApiResult, TOTAL_COUNT_HEADER};
