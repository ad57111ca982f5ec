pub mod device_logs;
pub mod devices;

use axum::Json;

use crate::errors::ServiceError;
use crate::ApiResponse;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ServiceError>;
