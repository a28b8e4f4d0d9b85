pub mod decoder;
pub mod dispatch;
pub mod events;

pub use decoder::{decode_payload, PayloadDecoder};
pub use dispatch::{action_items_body, DispatchOutcome, Dispatcher, LoadingIndicator, ACTION_ITEMS_HEADER};
pub use events::{ActionItem, ControlEvent, ResponseItem, INTERRUPT_AUDIO};
