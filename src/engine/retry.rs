//! # engine::retry
//!
//! นับ fetch ที่ล้มเหลวติดกัน. Once the budget is spent the pipeline gives up
//! on the backlog and jumps the watermark to just behind "now".

/// How far behind "now" a forced reset puts the watermark.
pub const RESET_LAG_MS: i64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureVerdict {
    /// Still within budget — back off and try the same window again.
    Retry { attempt: u32, max: u32 },
    /// Budget spent. The counter is already back at zero.
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct FailureBudget {
    max_fails:   u32,
    consecutive: u32,
}

impl FailureBudget {
    pub fn new(max_fails: u32) -> Self {
        Self { max_fails: max_fails.max(1), consecutive: 0 }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn record_failure(&mut self) -> FailureVerdict {
        self.consecutive += 1;
        if self.consecutive >= self.max_fails {
            let attempts = self.consecutive;
            self.consecutive = 0;
            FailureVerdict::Exhausted { attempts }
        } else {
            FailureVerdict::Retry { attempt: self.consecutive, max: self.max_fails }
        }
    }
}
