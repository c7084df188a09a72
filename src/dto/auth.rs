use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by the bearer tokens the authentication layer issues.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}
