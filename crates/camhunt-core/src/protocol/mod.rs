//! Protocol module containing the frame codec, payload types, address
//! packing and the device result codes.

pub mod address;
pub mod frame;
pub mod messages;
pub mod result_code;

pub use address::{AddressError, PackedIpv4};
pub use frame::{decode_frame, decode_json_payload, encode_frame, encode_probe, ProtocolError};
pub use messages::*;
pub use result_code::ResultCode;
