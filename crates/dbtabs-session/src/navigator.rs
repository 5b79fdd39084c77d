//! Navigation port

/// Where the session driver sends new locations.
///
/// A router implementation updates whatever the user sees (address bar,
/// window state) and records history. The driver feeds the same location
/// back to the reconciler itself, so implementations must not call back
/// into the session.
pub trait Navigator {
    fn navigate(&mut self, location: &str);
}

/// In-process navigation history with back and forward
#[derive(Clone, Debug, Default)]
pub struct HistoryNavigator {
    entries: Vec<String>,
    cursor: usize,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with one entry already on the stack
    pub fn starting_at(location: impl Into<String>) -> Self {
        Self {
            entries: vec![location.into()],
            cursor: 0,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Step back one entry, returning the location now current
    pub fn back(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    pub fn forward(&mut self) -> Option<&str> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&mut self, location: &str) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(location.to_string());
        self.cursor = self.entries.len() - 1;
    }
}
