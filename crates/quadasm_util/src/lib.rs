pub mod base4;

pub use base4::{decode_signed, decode_unsigned, encode_signed, encode_unsigned};
