//! Frame accumulation.
//!
//! Raw samples arrive one by one and only become meaningful as a group: all
//! samples between two sync markers describe one device state change. The
//! accumulator buffers them in arrival order (the multitouch protocol is
//! order-sensitive) and hands the whole frame to the dispatcher when the
//! sync marker arrives.

use heapless::Vec;

use crate::FRAME_CAPACITY;
use crate::event::RawEvent;

pub struct FrameAccumulator {
    samples: Vec<RawEvent, FRAME_CAPACITY>,
    overflowed: bool,
}

impl FrameAccumulator {
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
            overflowed: false,
        }
    }

    /// Buffer one sample. Samples past the frame capacity are dropped;
    /// the frame is still processed with the samples that fit.
    pub fn push(&mut self, sample: RawEvent) {
        if self.samples.push(sample).is_err() && !self.overflowed {
            self.overflowed = true;
            error!("frame overflow, dropping samples past {}", FRAME_CAPACITY);
        }
    }

    /// Consume the accumulated frame, leaving the accumulator empty.
    pub fn take(&mut self) -> Vec<RawEvent, FRAME_CAPACITY> {
        self.overflowed = false;
        core::mem::take(&mut self.samples)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop everything buffered, for suspend.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.overflowed = false;
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use evnorm_types::axis::AbsAxis;

    use super::*;

    #[test]
    fn take_clears_the_frame() {
        let mut frame = FrameAccumulator::new();
        frame.push(RawEvent::Abs {
            axis: AbsAxis::X,
            value: 10,
        });
        let samples = frame.take();
        assert_eq!(samples.len(), 1);
        assert!(frame.is_empty());
    }

    #[test]
    fn overflow_drops_excess_but_keeps_frame() {
        let mut frame = FrameAccumulator::new();
        for i in 0..(FRAME_CAPACITY + 8) {
            frame.push(RawEvent::Abs {
                axis: AbsAxis::X,
                value: i as i32,
            });
        }
        assert_eq!(frame.take().len(), FRAME_CAPACITY);
    }
}
