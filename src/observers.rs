use anyhow::Result;

/// Handle for removing a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback<E> = Box<dyn FnMut(&E) -> Result<()>>;

/// Callbacks notified of changes to one value.
///
/// Observers run synchronously in registration order. A failing observer is
/// logged and does not keep the others from running.
pub struct Observers<E> {
    name: &'static str,
    next_id: u64,
    callbacks: Vec<(ObserverId, Callback<E>)>,
}

impl<E> Observers<E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: 0,
            callbacks: Vec::new(),
        }
    }

    pub fn add(&mut self, callback: impl FnMut(&E) -> Result<()> + 'static) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Returns whether the observer was registered.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(registered, _)| *registered != id);
        self.callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn fire(&mut self, event: &E) {
        for (id, callback) in &mut self.callbacks {
            if let Err(err) = callback(event) {
                log::error!("{} observer {:?} failed: {err:#}", self.name, id);
            }
        }
    }
}
