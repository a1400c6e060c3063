//! Framed UART link to the vehicle, plus the typed sender/receiver pair
//! layered on top of it.

mod protocol;
mod receiver;
mod sender;

pub use protocol::{RawEventHandler, UartLink};
pub use receiver::{Handler, Receiver};
pub use sender::Sender;
