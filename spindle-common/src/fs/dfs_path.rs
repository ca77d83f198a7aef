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

//! Canonical handling of absolute DFS paths.
//!
//! A path is `/` or `/`-separated non-empty segments. Canonicalization
//! collapses repeated separators and `.` segments. `..` is never
//! interpreted; a path carrying it is rejected outright so nothing can
//! name an entry above the root.

use crate::error::{DfsError, DfsResult};

pub const PATH_SEPARATOR: char = '/';

/// Split a path into its canonical segment list. The root directory is the
/// empty-named head segment: `/` becomes `[""]` and `/a/b` becomes
/// `["", "a", "b"]`.
pub fn path_components(path: &str) -> DfsResult<Vec<String>> {
    if path.is_empty() || !path.starts_with(PATH_SEPARATOR) {
        return Err(DfsError::illegal_argument(format!(
            "path {:?} is not an absolute path",
            path
        )));
    }

    let mut components = vec![String::new()];
    for segment in path.split(PATH_SEPARATOR) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(DfsError::illegal_argument(format!(
                    "path {:?} must not contain \"..\"",
                    path
                )))
            }
            name => components.push(name.to_string()),
        }
    }
    Ok(components)
}

/// Rebuild the canonical path string from a component list.
pub fn from_components(components: &[String]) -> String {
    if components.len() <= 1 {
        return PATH_SEPARATOR.to_string();
    }
    components.join(&PATH_SEPARATOR.to_string())
}

/// Canonical form of `path`: separators collapsed, `.` segments dropped.
pub fn clean(path: &str) -> DfsResult<String> {
    Ok(from_components(&path_components(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_a_single_empty_component() {
        assert_eq!(path_components("/").unwrap(), vec![String::new()]);
        assert_eq!(path_components("///").unwrap(), vec![String::new()]);
    }

    #[test]
    fn segments_are_split_in_order() {
        assert_eq!(path_components("/a/b.txt").unwrap(), vec!["", "a", "b.txt"]);
    }

    #[test]
    fn redundant_separators_and_dots_collapse() {
        assert_eq!(clean("//a//./b/").unwrap(), "/a/b");
        assert_eq!(clean("/./").unwrap(), "/");
    }

    #[test]
    fn relative_and_empty_paths_are_rejected() {
        assert!(path_components("").is_err());
        assert!(path_components("a/b").is_err());
    }

    #[test]
    fn parent_traversal_is_rejected() {
        assert!(path_components("/..").is_err());
        assert!(path_components("/a/../b").is_err());
    }

    #[test]
    fn round_trip_through_components() {
        let names = path_components("/d/e/f").unwrap();
        assert_eq!(from_components(&names), "/d/e/f");
        assert_eq!(from_components(&names[..1]), "/");
    }
}
