//! Line assembly over arbitrarily chunked input

use heapless::Vec;

/// Reassembles LF-terminated lines from a chunked byte stream
///
/// A CR immediately before LF is stripped; any other CR is content. Empty
/// lines are not emitted. A line longer than `N` bytes is dropped and the
/// assembler resumes at the next LF. All state survives between `feed`
/// calls, so the emitted lines do not depend on how the stream is split.
#[derive(Debug)]
pub struct LineAssembler<const N: usize> {
    buf: Vec<u8, N>,
    pending_cr: bool,
    discarding: bool,
    overflowed: usize,
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            pending_cr: false,
            discarding: false,
            overflowed: 0,
        }
    }

    /// Forget any partial line and reset the overflow count
    pub fn reset(&mut self) {
        self.buf.clear();
        self.pending_cr = false;
        self.discarding = false;
        self.overflowed = 0;
    }

    /// Consume `chunk`, calling `emit` for each completed line
    pub fn feed(&mut self, chunk: &[u8], mut emit: impl FnMut(&[u8])) {
        for &byte in chunk {
            match byte {
                b'\n' => {
                    self.pending_cr = false;
                    if self.discarding {
                        self.discarding = false;
                    } else if !self.buf.is_empty() {
                        emit(self.buf.as_slice());
                    }
                    self.buf.clear();
                }
                _ if self.discarding => {}
                b'\r' => {
                    // Held back until we know whether LF follows
                    if self.pending_cr {
                        self.push(b'\r');
                    }
                    self.pending_cr = true;
                }
                _ => {
                    if self.pending_cr {
                        self.pending_cr = false;
                        self.push(b'\r');
                    }
                    self.push(byte);
                }
            }
        }
    }

    /// Emit the trailing line of a stream that did not end with LF
    pub fn finish(&mut self, mut emit: impl FnMut(&[u8])) {
        if self.pending_cr && !self.discarding {
            self.push(b'\r');
        }
        if !self.discarding && !self.buf.is_empty() {
            emit(self.buf.as_slice());
        }
        self.buf.clear();
        self.pending_cr = false;
        self.discarding = false;
    }

    /// Over-length lines dropped since the last reset
    pub fn overflowed_lines(&self) -> usize {
        self.overflowed
    }

    fn push(&mut self, byte: u8) {
        if self.discarding {
            return;
        }
        if self.buf.push(byte).is_err() {
            warn!("Line exceeds {} bytes, skipping to next line", N);
            self.buf.clear();
            self.pending_cr = false;
            self.discarding = true;
            self.overflowed += 1;
        }
    }
}
