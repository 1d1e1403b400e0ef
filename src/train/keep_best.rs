/// Tracks the best validation accuracy seen during one training session.
///
/// Starts below any reachable accuracy, so the first observation always
/// counts as an improvement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeepBest {
    best: f64,
}

impl Default for KeepBest {
    fn default() -> Self {
        KeepBest { best: -1.0 }
    }
}

impl KeepBest {
    pub fn new() -> KeepBest {
        KeepBest::default()
    }

    /// Records `accuracy`; true only if it strictly beats every earlier one.
    pub fn observe(&mut self, accuracy: f64) -> bool {
        if accuracy > self.best {
            self.best = accuracy;
            true
        } else {
            false
        }
    }

    pub fn best(&self) -> Option<f64> {
        (self.best >= 0.0).then_some(self.best)
    }
}
