use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use thiserror::Error;

use crate::error::ErrorClass;

/// Format-neutral encoded form written by [`super::DataWriter`]s.
pub type Tree = serde_json::Value;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("couldn't encode value: {0}")]
    Encode(String),
    #[error("couldn't decode value: {0}")]
    Decode(String),
}

impl CodecError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::DataDefect
    }
}

pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Tree, CodecError>;
    fn decode(&self, tree: &Tree) -> Result<T, CodecError>;
}

/// Codec for any serde type.
pub struct JsonCodec<T>(PhantomData<fn() -> T>);

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        JsonCodec(PhantomData)
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec<T> {
    fn encode(&self, value: &T) -> Result<Tree, CodecError> {
        serde_json::to_value(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, tree: &Tree) -> Result<T, CodecError> {
        T::deserialize(tree).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Ore {
        block: String,
        size: u32,
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let codec = JsonCodec::<Ore>::new();
        let err = codec.decode(&serde_json::json!({ "block": 5 })).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn non_string_map_keys_fail_to_encode() {
        let codec = JsonCodec::<HashMap<(i32, i32), u8>>::new();
        let value = HashMap::from([((1, 2), 3)]);
        let err = codec.encode(&value).unwrap_err();
        assert!(matches!(err, CodecError::Encode(_)));
        assert_eq!(err.class(), ErrorClass::DataDefect);
    }

    #[test]
    fn encodes_struct_fields() {
        let codec = JsonCodec::<Ore>::new();
        let tree = codec
            .encode(&Ore {
                block: "minecraft:iron_ore".into(),
                size: 9,
            })
            .unwrap();
        assert_eq!(tree["size"], 9);
    }
}
