//! Step counter for multi-phase commands.

use std::io::Write;
use std::time::Instant;

use console::style;

/// Prints `[n/total] label` to stderr as a command moves through its phases.
/// Disabled progress tracks the count silently.
#[derive(Debug)]
pub struct StepProgress {
    total: usize,
    current: usize,
    enabled: bool,
    start_time: Instant,
}

impl StepProgress {
    pub fn new(total: usize, enabled: bool) -> Self {
        Self {
            total,
            current: 0,
            enabled,
            start_time: Instant::now(),
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn advance(&mut self, label: &str) {
        if self.current < self.total {
            self.current += 1;
        }
        if self.enabled {
            let _ = writeln!(std::io::stderr(), "{}", self.render(label));
        }
    }

    fn render(&self, label: &str) -> String {
        format!(
            "{} {}",
            style(format!("[{}/{}]", self.current, self.total)).dim(),
            label
        )
    }

    /// Final line with the elapsed time.
    pub fn finish(&self, label: &str) {
        if self.enabled {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let _ = writeln!(
                std::io::stderr(),
                "{} {}",
                style(label).green(),
                style(format!("({:.1}s)", elapsed)).dim()
            );
        }
    }
}
