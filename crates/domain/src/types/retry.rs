//! Retry budget for one `send` run

/// Remaining re-dispatch rounds and the current round number.
///
/// Round 1 is the initial dispatch and costs nothing; every later round
/// spends one unit of the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    remaining: u32,
    round: u32,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self { remaining: max_retries, round: 1 }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Spend one retry and advance to the next round. Returns `false`, and
    /// leaves the state untouched, when the budget is already spent.
    pub fn consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.round += 1;
        true
    }
}
