use hn_core::ItemId;

use crate::component::{SignalDirection, SignalType};

/// One end of a signal line: a component and the channel on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEnd {
    pub component: ItemId,
    pub channel: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalLineBody {
    pub signal_type: SignalType,
    /// Receiving component and its input channel.
    pub input_end: Option<SignalEnd>,
    /// Emitting component and its output channel.
    pub output_end: Option<SignalEnd>,
}

impl SignalLineBody {
    pub fn new(signal_type: SignalType) -> Self {
        Self {
            signal_type,
            input_end: None,
            output_end: None,
        }
    }

    /// The end a component attaches to when it connects in `direction`.
    pub fn end(&self, direction: SignalDirection) -> Option<SignalEnd> {
        match direction {
            SignalDirection::Input => self.input_end,
            SignalDirection::Output => self.output_end,
        }
    }

    pub fn end_mut(&mut self, direction: SignalDirection) -> &mut Option<SignalEnd> {
        match direction {
            SignalDirection::Input => &mut self.input_end,
            SignalDirection::Output => &mut self.output_end,
        }
    }

    pub fn is_open(&self) -> bool {
        self.input_end.is_none() || self.output_end.is_none()
    }
}
