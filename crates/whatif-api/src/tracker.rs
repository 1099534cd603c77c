use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use whatif_generation::GenerationKind;

/// Counts in-flight generations per kind
#[derive(Debug, Default)]
pub struct GenerationTracker {
    timeline: AtomicUsize,
    branch: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationStatus {
    pub timeline: bool,
    pub branch: bool,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a generation as running until the returned guard is dropped
    pub fn begin(self: &Arc<Self>, kind: GenerationKind) -> GenerationGuard {
        self.counter(kind).fetch_add(1, Ordering::SeqCst);
        GenerationGuard {
            tracker: Arc::clone(self),
            kind,
        }
    }

    pub fn is_generating(&self, kind: GenerationKind) -> bool {
        self.counter(kind).load(Ordering::SeqCst) > 0
    }

    pub fn status(&self) -> GenerationStatus {
        GenerationStatus {
            timeline: self.is_generating(GenerationKind::Timeline),
            branch: self.is_generating(GenerationKind::Branch),
        }
    }

    fn counter(&self, kind: GenerationKind) -> &AtomicUsize {
        match kind {
            GenerationKind::Timeline => &self.timeline,
            GenerationKind::Branch => &self.branch,
        }
    }
}

pub struct GenerationGuard {
    tracker: Arc<GenerationTracker>,
    kind: GenerationKind,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.tracker.counter(self.kind).fetch_sub(1, Ordering::SeqCst);
    }
}
