use axum::Json;
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use tracing::info;

use keystone_application::{AuthenticatedCaller, hash_token};
use keystone_core::{AppError, AppResult};
use keystone_domain::{MemberProfile, UserClass, UserId};

use crate::dto::{
    IssueSessionRequest, RefreshSessionRequest, RevokedSessionsResponse, SessionClaimsResponse,
    SessionInfoResponse, TokenPairResponse,
};
use crate::error::ApiResult;
use crate::middleware::OptionalCaller;
use crate::state::AppState;

mod logout;
mod sessions;

pub use logout::{logout_all_handler, logout_handler};
pub use sessions::{issue_session_handler, me_handler, refresh_session_handler};

const BOOTSTRAP_TOKEN_HEADER: &str = "x-bootstrap-token";
