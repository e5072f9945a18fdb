mod event;

pub use event::{PinEvent, PinEventKind};
