//! JSON field encoders shared by the HTTP surface and the client.
//!
//! 64-bit integers serialize as decimal strings to survive JSON number
//! precision limits; deserialization accepts both string and native number
//! forms. Bytes serialize as base64. Float specials (`NaN`, `Infinity`,
//! `-Infinity`) serialize as strings. Enum fields serialize by name and
//! accept either the name or the raw number.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeQuoted<T> {
    Native(T),
    Text(String),
}

pub mod u64_str {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match MaybeQuoted::<u64>::deserialize(deserializer)? {
            MaybeQuoted::Native(v) => Ok(v),
            MaybeQuoted::Text(s) => s.parse().map_err(DeError::custom),
        }
    }
}

pub mod i64_str {
    use super::*;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match MaybeQuoted::<i64>::deserialize(deserializer)? {
            MaybeQuoted::Native(v) => Ok(v),
            MaybeQuoted::Text(s) => s.parse().map_err(DeError::custom),
        }
    }
}

pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    use super::*;

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(DeError::custom)
    }
}

pub mod f32_compat {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if *value == f32::INFINITY {
            serializer.serialize_str("Infinity")
        } else if *value == f32::NEG_INFINITY {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f32(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        match MaybeQuoted::<f32>::deserialize(deserializer)? {
            MaybeQuoted::Native(v) => Ok(v),
            MaybeQuoted::Text(s) => match s.as_str() {
                "NaN" => Ok(f32::NAN),
                "Infinity" => Ok(f32::INFINITY),
                "-Infinity" => Ok(f32::NEG_INFINITY),
                other => other.parse().map_err(DeError::custom),
            },
        }
    }
}

macro_rules! enum_field {
    ($module:ident, $enum_ty:ty) => {
        pub mod $module {
            use super::*;

            pub fn serialize<S: Serializer>(
                value: &i32,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(<$enum_ty>::from_i32(*value).as_str_name())
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(
                deserializer: D,
            ) -> Result<i32, D::Error> {
                match MaybeQuoted::<i32>::deserialize(deserializer)? {
                    MaybeQuoted::Native(v) => Ok(v),
                    MaybeQuoted::Text(s) => <$enum_ty>::from_str_name(&s)
                        .map(|v| v as i32)
                        .ok_or_else(|| DeError::custom(format!("unknown enum value: {s}"))),
                }
            }
        }
    };
}

enum_field!(data_type, vexadb_common::types::DataType);
enum_field!(index_type, vexadb_common::types::IndexType);
enum_field!(operation_type, vexadb_common::types::OperationType);
enum_field!(collection_status, vexadb_common::types::CollectionStatus);

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Default, PartialEq, Debug)]
    #[serde(default)]
    struct Probe {
        #[serde(with = "super::u64_str")]
        key: u64,
        #[serde(with = "super::base64_bytes")]
        blob: Vec<u8>,
        #[serde(with = "super::f32_compat")]
        score: f32,
        #[serde(with = "super::data_type")]
        data_type: i32,
    }

    #[test]
    fn u64_as_string_with_lenient_decode() {
        let probe = Probe {
            key: u64::MAX,
            blob: vec![1, 2, 3],
            score: 0.5,
            data_type: 23,
        };
        let text = serde_json::to_string(&probe).unwrap();
        assert!(text.contains("\"18446744073709551615\""));
        assert!(text.contains("\"VECTOR_FP32\""));
        assert_eq!(serde_json::from_str::<Probe>(&text).unwrap(), probe);

        // native number and raw enum number are accepted too
        let parsed: Probe =
            serde_json::from_str(r#"{"key": 7, "blob": "AQID", "score": 1.5, "data_type": 23}"#)
                .unwrap();
        assert_eq!(parsed.key, 7);
        assert_eq!(parsed.blob, vec![1, 2, 3]);
        assert_eq!(parsed.data_type, 23);
    }

    #[test]
    fn float_specials_round_trip_as_strings() {
        let probe = Probe {
            score: f32::INFINITY,
            ..Default::default()
        };
        let text = serde_json::to_string(&probe).unwrap();
        assert!(text.contains("\"Infinity\""));

        let parsed: Probe = serde_json::from_str(r#"{"score": "NaN"}"#).unwrap();
        assert!(parsed.score.is_nan());
        let parsed: Probe = serde_json::from_str(r#"{"score": "-Infinity"}"#).unwrap();
        assert_eq!(parsed.score, f32::NEG_INFINITY);
    }

    #[test]
    fn unknown_enum_name_is_rejected() {
        assert!(serde_json::from_str::<Probe>(r#"{"data_type": "VECTOR_FP128"}"#).is_err());
    }
}
