//! # Task Data
//!
//! Waypoints of the current task as seen by the declaration code.
//!
//! The task itself is edited elsewhere; this crate only needs a consistent
//! snapshot, taken under the task lock and released before any I/O happens.

use std::sync::RwLock;

/// Maximum number of task points a declaration can carry
pub const MAX_TASK_POINTS: usize = 20;

/// One task waypoint
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Index in the waypoint database
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

impl Waypoint {
    pub fn new(index: usize, latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            index,
            latitude,
            longitude,
            name: name.into(),
        }
    }
}

/// Consistent copy of the task at one instant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSnapshot {
    /// Ordered task points
    pub waypoints: Vec<Waypoint>,

    /// Home waypoint used as takeoff / landing position
    pub home: Option<Waypoint>,
}

/// Source of task snapshots
pub trait TaskData: Send + Sync {
    /// Copy the current task while holding the task lock
    fn snapshot(&self) -> TaskSnapshot;
}

/// In-memory task store guarded by a read/write lock
#[derive(Debug, Default)]
pub struct TaskStore {
    inner: RwLock<TaskSnapshot>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the task, keeping at most [`MAX_TASK_POINTS`] waypoints
    pub fn set_task(&self, mut waypoints: Vec<Waypoint>, home: Option<Waypoint>) {
        waypoints.truncate(MAX_TASK_POINTS);
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.waypoints = waypoints;
        guard.home = home;
    }
}

impl TaskData for TaskStore {
    fn snapshot(&self) -> TaskSnapshot {
        // Lock is held only for the clone
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
