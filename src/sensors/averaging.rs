//! Rolling average over the last `N` raw ADC samples.

use heapless::HistoryBuffer;

/// Fixed-window oversampler.  No heap, `N` samples of history.
pub struct Oversampler<const N: usize> {
    window: HistoryBuffer<u16, N>,
}

impl<const N: usize> Default for Oversampler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Oversampler<N> {
    pub const fn new() -> Self {
        Self {
            window: HistoryBuffer::new(),
        }
    }

    pub fn push(&mut self, sample: u16) {
        self.window.write(sample);
    }

    /// Integer mean of the samples seen so far (0 if none).
    pub fn average(&self) -> u16 {
        let n = self.window.len();
        if n == 0 {
            return 0;
        }
        let sum: u32 = self.window.iter().map(|&s| u32::from(s)).sum();
        (sum / n as u32) as u16
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == N
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
