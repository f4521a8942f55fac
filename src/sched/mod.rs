//! Dataflow scheduling of tile tasks.
//!
//! Tasks are submitted to a [`Region`] together with the byte ranges they read and write. A
//! task starts only once every earlier task whose ranges overlap its own has finished, unless
//! both only read. Tasks with disjoint ranges may run concurrently, in any order.
//!
//! Submission order is the only ordering information the scheduler has: an algorithm is correct
//! exactly when submitting its tasks in order, with their declared ranges, encodes its data
//! dependencies.
//!
//! A region is opened with [`Context::region`], which blocks until every submitted task has
//! completed.

mod tracker;
mod workspace;

use crate::{assert, Context, Result};
use dyn_stack::{PodStack, StackReq};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use tracker::Tracker;
use workspace::Workspace;

/// Half-open range of absolute byte addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemRange {
    pub start: usize,
    pub end: usize,
}

impl MemRange {
    #[inline]
    #[track_caller]
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end);
        Self { start, end }
    }

    /// Range covering the elements of `slice`.
    #[inline]
    pub fn of_slice<T>(slice: &[T]) -> Self {
        let start = slice.as_ptr() as usize;
        Self::new(start, start + core::mem::size_of_val(slice))
    }

    /// Range covering `value`.
    #[inline]
    pub fn of<T>(value: &T) -> Self {
        let start = value as *const T as usize;
        Self::new(start, start + core::mem::size_of::<T>())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn overlaps(&self, other: &MemRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    /// Write access, which also covers reading the range.
    Write,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Access {
    pub range: MemRange,
    pub mode: AccessMode,
}

/// Declaration of a unit of work: a label for diagnostics and the ranges it touches.
#[derive(Clone, Debug)]
pub struct Task {
    label: &'static str,
    accesses: Vec<Access>,
}

impl Task {
    #[inline]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            accesses: Vec::new(),
        }
    }

    fn with(mut self, mode: AccessMode, ranges: impl IntoIterator<Item = MemRange>) -> Self {
        self.accesses
            .extend(ranges.into_iter().map(|range| Access { range, mode }));
        self
    }

    /// Declares ranges read by the task.
    #[inline]
    pub fn reads(self, ranges: impl IntoIterator<Item = MemRange>) -> Self {
        self.with(AccessMode::Read, ranges)
    }

    /// Declares ranges overwritten by the task.
    #[inline]
    pub fn writes(self, ranges: impl IntoIterator<Item = MemRange>) -> Self {
        self.with(AccessMode::Write, ranges)
    }

    /// Declares ranges both read and written by the task.
    #[inline]
    pub fn reads_writes(self, ranges: impl IntoIterator<Item = MemRange>) -> Self {
        self.with(AccessMode::Write, ranges)
    }

    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[inline]
    pub fn accesses(&self) -> &[Access] {
        &self.accesses
    }
}

/// Handle to a submitted task.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

type Body<'scope> = Box<dyn FnOnce(PodStack<'_>) + Send + 'scope>;

struct Node<'scope> {
    label: &'static str,
    body: Option<Body<'scope>>,
    unmet: usize,
    successors: Vec<usize>,
    done: bool,
}

struct Graph<'scope> {
    nodes: Vec<Node<'scope>>,
    tracker: Tracker,
    ready: VecDeque<usize>,
    pending: usize,
    edges: usize,
    closed: bool,
    poisoned: bool,
}

impl Graph<'_> {
    /// Marks `id` as finished and returns how many tasks became ready.
    fn complete(&mut self, id: usize) -> usize {
        let successors = core::mem::take(&mut self.nodes[id].successors);
        self.nodes[id].done = true;
        self.pending -= 1;

        let mut released = 0;
        for succ in successors {
            let node = &mut self.nodes[succ];
            node.unmet -= 1;
            if node.unmet == 0 {
                self.ready.push_back(succ);
                released += 1;
            }
        }
        released
    }
}

struct Shared<'scope> {
    graph: Mutex<Graph<'scope>>,
    wakeup: Condvar,
    workspace: Workspace,
    panic: Mutex<Option<Box<dyn Any + Send>>>,
}

impl<'scope> Shared<'scope> {
    fn worker_loop(&self) {
        let worker = rayon::current_thread_index().unwrap_or(0);
        let mut graph = self.graph.lock();

        loop {
            if let Some(id) = graph.ready.pop_front() {
                let label = graph.nodes[id].label;
                let body = graph.nodes[id].body.take();
                let poisoned = graph.poisoned;

                let panicked = MutexGuard::unlocked(&mut graph, || {
                    log::trace!(target: "tilework", "worker {worker}: task {id} ({label})");
                    match body {
                        Some(body) if !poisoned => self.run(worker, body),
                        _ => false,
                    }
                });

                graph.poisoned |= panicked;
                let released = graph.complete(id);
                if released > 0 || graph.pending == 0 {
                    self.wakeup.notify_all();
                }
                continue;
            }

            if graph.closed && graph.pending == 0 {
                break;
            }
            self.wakeup.wait(&mut graph);
        }
    }

    /// Runs a task body on the worker's scratch buffer. Returns whether it panicked.
    fn run(&self, worker: usize, body: Body<'scope>) -> bool {
        let result = self.workspace.with_stack(worker, |stack| {
            panic::catch_unwind(AssertUnwindSafe(move || body(stack)))
        });
        match result {
            Ok(()) => false,
            Err(payload) => {
                let mut slot = self.panic.lock();
                if slot.is_none() {
                    *slot = Some(payload);
                }
                true
            }
        }
    }

    fn close(&self) {
        self.graph.lock().closed = true;
        self.wakeup.notify_all();
    }
}

struct CloseOnDrop<'a, 'scope>(&'a Shared<'scope>);

impl Drop for CloseOnDrop<'_, '_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Open scheduling region.
///
/// `'scope` is the lifetime of the data borrowed by submitted tasks, which must outlive the
/// region.
pub struct Region<'r, 'scope> {
    shared: &'r Shared<'scope>,
    workers: usize,
}

impl<'r, 'scope> Region<'r, 'scope> {
    /// Submits a task. `body` runs once every earlier task with an overlapping footprint has
    /// finished, and receives the scratch buffer of the worker running it.
    ///
    /// Bodies must not wait on the context's worker pool.
    pub fn submit(
        &self,
        task: Task,
        body: impl FnOnce(PodStack<'_>) + Send + 'scope,
    ) -> TaskId {
        let mut guard = self.shared.graph.lock();
        let graph = &mut *guard;
        assert!(!graph.closed);

        let id = graph.nodes.len();
        let nodes = &mut graph.nodes;
        let deps = graph
            .tracker
            .record(id, &task.accesses, |dep| nodes[dep].done);

        for &dep in &deps {
            nodes[dep].successors.push(id);
        }
        nodes.push(Node {
            label: task.label,
            body: Some(Box::new(body)),
            unmet: deps.len(),
            successors: Vec::new(),
            done: false,
        });
        graph.edges += deps.len();
        graph.pending += 1;

        if deps.is_empty() {
            graph.ready.push_back(id);
            drop(guard);
            self.shared.wakeup.notify_one();
        }
        TaskId(id)
    }

    /// Number of workers executing tasks.
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Scratch space available to every task body.
    #[inline]
    pub fn workspace_req(&self) -> StackReq {
        self.shared.workspace.req()
    }

    /// Whether task bodies can allocate `need` from their scratch buffer.
    #[inline]
    pub fn workspace_covers(&self, need: StackReq) -> bool {
        workspace::covers(self.workspace_req(), need)
    }
}

impl Context {
    /// Opens a scheduling region on the context's worker pool.
    ///
    /// `op` submits tasks through the region. Each worker gets a scratch buffer sized by
    /// `workspace`. Returns once `op` has returned and every submitted task has completed. If a
    /// task body panics, the remaining bodies are skipped and the panic is resumed here.
    pub fn region<'scope, R: Send>(
        &self,
        workspace: StackReq,
        op: impl for<'r> FnOnce(&Region<'r, 'scope>) -> R + Send,
    ) -> Result<R> {
        let workers = self.num_workers();
        let shared = Shared {
            graph: Mutex::new(Graph {
                nodes: Vec::new(),
                tracker: Tracker::default(),
                ready: VecDeque::new(),
                pending: 0,
                edges: 0,
                closed: false,
                poisoned: false,
            }),
            wakeup: Condvar::new(),
            workspace: Workspace::new(workers, workspace)?,
            panic: Mutex::new(None),
        };

        log::debug!(
            target: "tilework",
            "opening region: {workers} workers, {} bytes of scratch each",
            workspace.size_bytes(),
        );

        let shared_ref = &shared;
        let out = self.pool.scope(move |scope| {
            for _ in 0..workers {
                scope.spawn(move |_| shared_ref.worker_loop());
            }
            let _close = CloseOnDrop(shared_ref);
            op(&Region {
                shared: shared_ref,
                workers,
            })
        });

        let Shared { graph, panic, .. } = shared;
        if let Some(payload) = panic.into_inner() {
            panic::resume_unwind(payload);
        }

        let graph = graph.into_inner();
        log::debug!(
            target: "tilework",
            "region closed: {} tasks, {} dependency edges",
            graph.nodes.len(),
            graph.edges,
        );
        Ok(out)
    }
}
