//! API Models
//!
//! Data structures exposed over HTTP and described in the OpenAPI document.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorResponse {
    #[schema(example = "cannot handle call atm")]
    pub message: String,
}
