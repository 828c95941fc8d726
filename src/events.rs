/// Navigation keys the controller understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Next,
    Previous,
}

/// Emitted by the controller whenever something observable changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideshowEvent {
    /// The displayed entry changed.
    Shown { index: usize, previous: usize },
    Paused,
    Resumed,
}

/// Delivered to the viewer's event loop from outside the window thread.
#[derive(Debug)]
pub enum ViewerEvent {
    Cancelled,
}
