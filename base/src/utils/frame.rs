
/// Tracks which of the frames in flight is currently recorded.
pub struct FrameCounter {

    frame_in_flight: usize,
    current: usize,
    total  : u64,
    action : FrameAction,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FrameAction {
    Rendering,
    SwapchainRecreate,
    Terminal,
}

impl FrameCounter {

    pub fn new(frame_in_flight: usize) -> FrameCounter {

        FrameCounter {
            frame_in_flight: frame_in_flight.max(1),
            current: 0,
            total  : 0,
            action : FrameAction::Rendering,
        }
    }

    #[inline]
    pub fn current_frame(&self) -> usize {
        self.current
    }

    /// The number of frames presented since start.
    #[inline]
    pub fn total_frames(&self) -> u64 {
        self.total
    }

    #[inline]
    pub fn current_action(&self) -> FrameAction {
        self.action
    }

    /// `Terminal` is sticky: once requested, no other action may override it.
    #[inline]
    pub fn set_action(&mut self, action: FrameAction) {
        if self.action != FrameAction::Terminal {
            self.action = action;
        }
    }

    #[inline]
    pub fn next_frame(&mut self) {

        self.current = (self.current + 1) % self.frame_in_flight;
        self.total += 1;

        if self.action != FrameAction::Terminal {
            self.action = FrameAction::Rendering;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_wraps_around() {

        let mut counter = FrameCounter::new(2);
        assert_eq!(counter.current_frame(), 0);
        counter.next_frame();
        assert_eq!(counter.current_frame(), 1);
        counter.next_frame();
        assert_eq!(counter.current_frame(), 0);
        assert_eq!(counter.total_frames(), 2);
    }

    #[test]
    fn recreate_resets_after_frame() {

        let mut counter = FrameCounter::new(3);
        counter.set_action(FrameAction::SwapchainRecreate);
        assert_eq!(counter.current_action(), FrameAction::SwapchainRecreate);
        counter.next_frame();
        assert_eq!(counter.current_action(), FrameAction::Rendering);
    }

    #[test]
    fn terminal_is_sticky() {

        let mut counter = FrameCounter::new(2);
        counter.set_action(FrameAction::Terminal);
        counter.set_action(FrameAction::SwapchainRecreate);
        counter.next_frame();
        assert_eq!(counter.current_action(), FrameAction::Terminal);
    }

    #[test]
    fn zero_frames_in_flight_is_clamped() {

        let mut counter = FrameCounter::new(0);
        counter.next_frame();
        assert_eq!(counter.current_frame(), 0);
    }
}
