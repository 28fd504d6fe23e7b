use crate::x10::UnitId;

/// The unit most recently addressed in the monitored house. Dim and Bright packets carry no unit
/// and act on whatever this holds.
#[derive(Debug, Default)]
pub struct SessionTracker {
    current: Option<UnitId>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_address_event(&mut self, unit: UnitId) {
        self.current = Some(unit);
    }

    pub fn current(&self) -> Option<UnitId> {
        self.current
    }
}
