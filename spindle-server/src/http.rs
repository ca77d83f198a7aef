// Copyright 2025 OPPO.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use spindle_common::proto::ExceptionResponse;
use spindle_common::DfsError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Adapter that puts a [`DfsError`] on the wire: status code by kind plus
/// the `{exception_type, exception_info}` body.
pub struct ApiError(pub DfsError);

impl From<DfsError> for ApiError {
    fn from(err: DfsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DfsError::IllegalArgument(_) => StatusCode::BAD_REQUEST,
            DfsError::FileNotFound(_) => StatusCode::NOT_FOUND,
            DfsError::IllegalState(_) => StatusCode::CONFLICT,
            DfsError::IndexOutOfBounds(_) => StatusCode::BAD_REQUEST,
            DfsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ExceptionResponse {
            exception_type: self.0.kind().to_string(),
            exception_info: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
