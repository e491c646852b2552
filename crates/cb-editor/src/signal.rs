//! Menu signal: a payload-free channel from the navigation control to the
//! board. Each send asks the board to flip grid visibility.

use crossbeam_channel::{Receiver, Sender};

#[derive(Debug, Clone)]
pub struct GridToggleSender(Sender<()>);

#[derive(Debug)]
pub struct GridToggleReceiver(Receiver<()>);

pub fn menu_signal() -> (GridToggleSender, GridToggleReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (GridToggleSender(tx), GridToggleReceiver(rx))
}

impl GridToggleSender {
    /// Fire the signal. Returns false once the board has been dropped.
    pub fn toggle_grid(&self) -> bool {
        self.0.send(()).is_ok()
    }
}

impl GridToggleReceiver {
    /// Drain pending signals and return how many arrived.
    pub fn drain(&self) -> usize {
        self.0.try_iter().count()
    }
}
