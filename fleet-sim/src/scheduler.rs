use tokio::task::JoinHandle;

/// Deferred effects owned by a store. Aborted on reset, on shutdown and on drop.
#[derive(Debug, Default)]
pub struct DeferredTasks {
    handles: Vec<JoinHandle<()>>,
}

impl DeferredTasks {
    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
    }

    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Aborts everything still pending and returns how many were aborted.
    pub fn cancel_all(&mut self) -> usize {
        let pending = self.pending();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        pending
    }
}

impl Drop for DeferredTasks {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
