use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 30;

/// Receives the lines scripts print.
pub trait OutputSink {
    fn add_line(&mut self, line: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

impl OutputSink for NullOutput {
    fn add_line(&mut self, _line: &str) {}
}

impl OutputSink for Vec<String> {
    fn add_line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Keeps only the most recent `capacity` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn take(&mut self) -> Vec<String> {
        self.lines.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl OutputSink for OutputBuffer {
    fn add_line(&mut self, line: &str) {
        if self.capacity == 0 {
            return;
        }

        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }

        self.lines.push_back(line.to_string());
    }
}

/// What a run prints through: optionally echoes to stdout and forwards to
/// the host's sink.
pub struct Printer<'a> {
    echo: bool,
    sink: Option<&'a mut dyn OutputSink>,
}

impl<'a> Printer<'a> {
    pub fn new(echo: bool, sink: Option<&'a mut dyn OutputSink>) -> Self {
        Self { echo, sink }
    }
}

impl OutputSink for Printer<'_> {
    fn add_line(&mut self, line: &str) {
        if self.echo {
            println!("{line}");
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.add_line(line);
        }
    }
}
