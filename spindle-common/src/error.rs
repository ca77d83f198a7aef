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

use thiserror::Error;

pub type DfsResult<T> = Result<T, DfsError>;

/// Typed errors shared by the naming and storage servers. The wire form is
/// the kind name plus the message; see [`DfsError::kind`].
#[derive(Debug, Clone, Error)]
pub enum DfsError {
    #[error("{0}")]
    IllegalArgument(String),

    #[error("{0}")]
    FileNotFound(String),

    #[error("{0}")]
    IllegalState(String),

    #[error("{0}")]
    IndexOutOfBounds(String),

    #[error("{0}")]
    Io(String),
}

impl DfsError {
    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        Self::IllegalArgument(msg.into())
    }

    pub fn file_not_found(msg: impl Into<String>) -> Self {
        Self::FileNotFound(msg.into())
    }

    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    pub fn index_out_of_bounds(msg: impl Into<String>) -> Self {
        Self::IndexOutOfBounds(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Exception name carried in the `exception_type` response field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IllegalArgument(_) => "IllegalArgumentException",
            Self::FileNotFound(_) => "FileNotFoundException",
            Self::IllegalState(_) => "IllegalStateException",
            Self::IndexOutOfBounds(_) => "IndexOutOfBoundsException",
            Self::Io(_) => "IOException",
        }
    }
}

impl From<std::io::Error> for DfsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
