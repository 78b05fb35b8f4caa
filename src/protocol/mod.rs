//! Deck wire protocol: framing, transports, dispatch and I/O pumping.

pub mod codec;
pub mod engine;
pub mod io_task;
pub mod transport;
pub mod virtual_deck;

pub use codec::{FrameDecoder, FramePayload, MAGIC_BYTE, encode_frame, encode_prefix};
pub use engine::{Dispatch, DisplayId, Haptic, ProtocolEngine, headers};
pub use io_task::DeckIo;
pub use transport::{LoopbackTransport, NullTransport, TcpTransport, Transport};
pub use virtual_deck::VirtualDeckClient;
