pub mod codec;
pub mod frame;
pub mod packet;
pub mod quat_compress;

pub use codec::{ByteReader, ByteWriter};
pub use frame::{decode_frame, encode_frame, Frame};
pub use packet::{Packet, PacketKind};
