const FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

#[derive(Debug, Clone, Default)]
pub(crate) struct Spinner {
    frame_index: usize,
}

impl Spinner {
    pub(crate) fn tick(&mut self) {
        self.frame_index = (self.frame_index + 1) % FRAMES.len();
    }

    pub(crate) fn frame(&self) -> &'static str {
        FRAMES[self.frame_index]
    }
}
