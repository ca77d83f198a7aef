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

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use spindle_common::DfsError;
use spindle_server::storage::FileStore;
use tempfile::TempDir;

fn new_store() -> (FileStore, TempDir) {
    let dir = TempDir::new().unwrap();
    (FileStore::new(dir.path()), dir)
}

#[tokio::test]
async fn create_write_read_round_trip_with_high_bit_bytes() {
    let (store, _dir) = new_store();
    let payload: &[u8] = &[0x00, 0xff, 0x80, b'a'];

    assert!(store.create("/d/f.bin").await.unwrap());
    store.write("/d/f.bin", 0, &BASE64.encode(payload)).await.unwrap();

    let data = store.read("/d/f.bin", 0, -1).await.unwrap();
    assert_eq!(BASE64.decode(data).unwrap(), payload);

    let middle = store.read("/d/f.bin", 1, 2).await.unwrap();
    assert_eq!(BASE64.decode(middle).unwrap(), &[0xff, 0x80]);

    assert_eq!(store.size("/d/f.bin").await.unwrap(), 4);
}

#[tokio::test]
async fn read_bounds_are_checked() {
    let (store, _dir) = new_store();
    store.create("/f").await.unwrap();
    store.write("/f", 0, &BASE64.encode(b"abc")).await.unwrap();

    assert!(matches!(
        store.read("/f", 0, 4).await.unwrap_err(),
        DfsError::IndexOutOfBounds(_)
    ));
    assert!(matches!(
        store.read("/f", -1, 1).await.unwrap_err(),
        DfsError::IndexOutOfBounds(_)
    ));
    assert!(matches!(
        store.read("/f", 4, -1).await.unwrap_err(),
        DfsError::IndexOutOfBounds(_)
    ));

    // reading nothing at the end of the file is fine
    let empty = store.read("/f", 3, -1).await.unwrap();
    assert_eq!(BASE64.decode(empty).unwrap(), b"");
}

#[tokio::test]
async fn read_and_write_require_an_existing_file() {
    let (store, _dir) = new_store();
    assert!(matches!(
        store.read("/missing", 0, -1).await.unwrap_err(),
        DfsError::FileNotFound(_)
    ));
    assert!(matches!(
        store.write("/missing", 0, "").await.unwrap_err(),
        DfsError::FileNotFound(_)
    ));
    assert!(matches!(
        store.size("/missing").await.unwrap_err(),
        DfsError::FileNotFound(_)
    ));
}

#[tokio::test]
async fn write_grows_the_file_past_its_end() {
    let (store, _dir) = new_store();
    store.create("/f").await.unwrap();
    store.write("/f", 0, &BASE64.encode(b"x")).await.unwrap();
    store.write("/f", 2, &BASE64.encode(b"yz")).await.unwrap();
    assert_eq!(store.size("/f").await.unwrap(), 4);
}

#[tokio::test]
async fn create_truncates_an_existing_file() {
    let (store, _dir) = new_store();
    store.create("/f").await.unwrap();
    store.write("/f", 0, &BASE64.encode(b"data")).await.unwrap();

    assert!(store.create("/f").await.unwrap());
    assert_eq!(store.size("/f").await.unwrap(), 0);
}

#[tokio::test]
async fn create_of_root_is_refused() {
    let (store, _dir) = new_store();
    assert!(!store.create("/").await.unwrap());
    assert!(!store.delete("/").await.unwrap());
}

#[tokio::test]
async fn delete_prunes_empty_ancestors() {
    let (store, dir) = new_store();
    store.create("/a/b/c.txt").await.unwrap();
    store.create("/a/keep.txt").await.unwrap();

    assert!(store.delete("/a/b/c.txt").await.unwrap());
    assert!(!dir.path().join("a/b").exists());
    // "/a" still holds a file, so it survives
    assert!(dir.path().join("a/keep.txt").exists());

    assert!(store.delete("/a/keep.txt").await.unwrap());
    assert!(!dir.path().join("a").exists());
    assert!(dir.path().exists());
}

#[tokio::test]
async fn delete_removes_a_directory_tree() {
    let (store, dir) = new_store();
    store.create("/d/one").await.unwrap();
    store.create("/d/sub/two").await.unwrap();

    assert!(store.delete("/d").await.unwrap());
    assert!(!dir.path().join("d").exists());
    assert!(matches!(
        store.delete("/d").await.unwrap_err(),
        DfsError::FileNotFound(_)
    ));
}

#[tokio::test]
async fn scan_files_lists_absolute_paths() {
    let (store, _dir) = new_store();
    store.create("/a.txt").await.unwrap();
    store.create("/d/b.txt").await.unwrap();

    let mut files = store.scan_files().unwrap();
    files.sort();
    assert_eq!(files, vec!["/a.txt", "/d/b.txt"]);
}

#[tokio::test]
async fn traversal_and_relative_paths_are_rejected() {
    let (store, _dir) = new_store();
    assert!(matches!(
        store.read("/../escape", 0, -1).await.unwrap_err(),
        DfsError::IllegalArgument(_)
    ));
    assert!(matches!(
        store.create("relative").await.unwrap_err(),
        DfsError::IllegalArgument(_)
    ));
}
