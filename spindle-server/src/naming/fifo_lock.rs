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

//! Readers-writers lock with strict FIFO admission.
//!
//! Plain RW locks prefer one class and starve the other under the mixed
//! long/short critical sections the namespace produces. Here a waiter is
//! never overtaken by a later arrival of either kind: a dedicated scheduler
//! task owns the admission state, acquisitions send a grant channel through
//! it and await the grant, releases are fire-and-forget.

use std::collections::VecDeque;
use tokio::sync::{mpsc, oneshot};

/// Returned when an acquisition races with [`FifoRwLock::destroy`], which
/// happens when the locked node is removed from the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockDestroyed;

enum LockOp {
    Shared(oneshot::Sender<()>),
    Exclusive(oneshot::Sender<()>),
    ReleaseShared,
    ReleaseExclusive,
    Destroy,
}

enum Waiter {
    Reader(oneshot::Sender<()>),
    Writer(oneshot::Sender<()>),
}

#[derive(Debug)]
pub struct FifoRwLock {
    ops: mpsc::UnboundedSender<LockOp>,
}

impl FifoRwLock {
    /// Spawns the scheduler task; must be called inside a tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(scheduler(rx));
        Self { ops: tx }
    }

    /// Block until admitted as one of possibly many concurrent readers.
    pub async fn lock_shared(&self) -> Result<(), LockDestroyed> {
        let (grant, granted) = oneshot::channel();
        self.ops
            .send(LockOp::Shared(grant))
            .map_err(|_| LockDestroyed)?;
        granted.await.map_err(|_| LockDestroyed)
    }

    /// Block until admitted as the sole writer.
    pub async fn lock_exclusive(&self) -> Result<(), LockDestroyed> {
        let (grant, granted) = oneshot::channel();
        self.ops
            .send(LockOp::Exclusive(grant))
            .map_err(|_| LockDestroyed)?;
        granted.await.map_err(|_| LockDestroyed)
    }

    /// Must be called exactly once per granted shared acquisition.
    pub fn unlock_shared(&self) {
        let _ = self.ops.send(LockOp::ReleaseShared);
    }

    /// Must be called exactly once per granted exclusive acquisition.
    pub fn unlock_exclusive(&self) {
        let _ = self.ops.send(LockOp::ReleaseExclusive);
    }

    /// Stop admission. Queued waiters observe the destruction, later
    /// acquisitions fail immediately. Idempotent.
    pub fn destroy(&self) {
        let _ = self.ops.send(LockOp::Destroy);
    }
}

impl Default for FifoRwLock {
    fn default() -> Self {
        Self::new()
    }
}

async fn scheduler(mut ops: mpsc::UnboundedReceiver<LockOp>) {
    let mut queue: VecDeque<Waiter> = VecDeque::new();
    let mut readers = 0usize;
    let mut writing = false;

    while let Some(op) = ops.recv().await {
        match op {
            LockOp::Shared(grant) => {
                if queue.is_empty() && !writing {
                    if grant.send(()).is_ok() {
                        readers += 1;
                    }
                } else {
                    queue.push_back(Waiter::Reader(grant));
                }
            }
            LockOp::Exclusive(grant) => {
                if queue.is_empty() && readers == 0 && !writing {
                    if grant.send(()).is_ok() {
                        writing = true;
                    }
                } else {
                    queue.push_back(Waiter::Writer(grant));
                }
            }
            LockOp::ReleaseShared => {
                readers = readers.saturating_sub(1);
                if readers == 0 {
                    admit_next(&mut queue, &mut readers, &mut writing);
                }
            }
            LockOp::ReleaseExclusive => {
                writing = false;
                admit_next(&mut queue, &mut readers, &mut writing);
            }
            LockOp::Destroy => break,
        }
    }
    // Dropping the queue and the receiver closes every pending grant
    // channel, so queued and in-flight requests all observe destruction.
}

/// Admit the head of the queue; a reader head pulls in every consecutive
/// reader behind it. A grant whose waiter has gone away is skipped and the
/// next entry tried, so an abandoned request cannot strand the lock.
fn admit_next(queue: &mut VecDeque<Waiter>, readers: &mut usize, writing: &mut bool) {
    while let Some(head) = queue.pop_front() {
        match head {
            Waiter::Writer(grant) => {
                if grant.send(()).is_ok() {
                    *writing = true;
                    return;
                }
            }
            Waiter::Reader(grant) => {
                if grant.send(()).is_ok() {
                    *readers += 1;
                }
                while matches!(queue.front(), Some(Waiter::Reader(_))) {
                    if let Some(Waiter::Reader(next)) = queue.pop_front() {
                        if next.send(()).is_ok() {
                            *readers += 1;
                        }
                    }
                }
                if *readers > 0 {
                    return;
                }
            }
        }
    }
}
