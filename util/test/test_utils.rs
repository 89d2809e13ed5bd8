/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    cell::Cell,
    error::Error,
    fmt,
    path::{Path, PathBuf},
    rc::Rc,
};

use logger::initialise_test_logging;

/// Routes every test thread's events through one global test-writer subscriber.
pub fn init_logging() {
    initialise_test_logging();
}

/// A uniquely named directory under the system temp dir, removed on drop.
#[derive(Debug)]
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        delete_dir(&self.path);
    }
}

pub fn create_tmp_dir() -> TempDir {
    let id = rand::random::<u64>();
    let mut fs_tmp_dir = std::env::temp_dir();
    fs_tmp_dir.push(format!("test_sequence_{}", id));
    std::fs::create_dir_all(&fs_tmp_dir).ok();
    TempDir { path: fs_tmp_dir }
}

pub fn delete_dir(path: &Path) {
    std::fs::remove_dir_all(path).ok();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSourceError {
    pub position: usize,
}

impl fmt::Display for TestSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test source failed at position {}", self.position)
    }
}

impl Error for TestSourceError {}

/// `values` as successful items, with a failure in place of the item at `fail_at`.
pub fn failing_at<T>(values: Vec<T>, fail_at: usize) -> Vec<Result<T, TestSourceError>> {
    values
        .into_iter()
        .enumerate()
        .map(|(position, value)| if position == fail_at { Err(TestSourceError { position }) } else { Ok(value) })
        .collect()
}

/// A shared call counter for factories and side effects under test.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    count: Rc<Cell<usize>>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.count.set(self.count.get() + 1);
    }

    pub fn get(&self) -> usize {
        self.count.get()
    }
}
