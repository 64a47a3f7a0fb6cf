//! Value encodings
//!
//! The disk cache only stores bytes; a [`Codec`] turns typed values into
//! those bytes and back.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Conversion between typed values and stored bytes
pub trait Codec: Send + Sync + 'static {
    /// Encode `value` for storage
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode a stored value
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// JSON encoding through `serde_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BucketError;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_json_codec() {
        let codec = JsonCodec;
        let bytes = codec.encode(&Point { x: 1, y: -2 }).unwrap();

        assert_eq!(bytes, br#"{"x":1,"y":-2}"#);
        assert_eq!(codec.decode::<Point>(&bytes).unwrap(), Point { x: 1, y: -2 });
    }

    #[test]
    fn test_json_codec_unsized() {
        let codec = JsonCodec;
        assert_eq!(codec.encode("text").unwrap(), br#""text""#);
        assert_eq!(codec.encode(&[1, 2, 3][..]).unwrap(), b"[1,2,3]");
    }

    #[test]
    fn test_json_codec_bad_input() {
        let result = JsonCodec.decode::<Point>(b"{\"x\":1");
        assert!(matches!(result, Err(BucketError::Codec(_))));
    }
}
