//! Forward blob decoding against a collection's forward column list.

use prost::Message;

use vexadb_common::error::{Error, Result};
use vexadb_proto::{GenericKeyValue, GenericValueList};

/// Decode a stored forward blob into named values in meta order.
///
/// An empty blob yields no attributes; a blob with fewer values than
/// columns yields the prefix that is present.
pub fn decode_forward_values(
    forward_columns: &[String],
    forward_data: &[u8],
) -> Result<Vec<GenericKeyValue>> {
    if forward_data.is_empty() {
        return Ok(Vec::new());
    }
    let values =
        GenericValueList::decode(forward_data).map_err(|_| Error::DeserializeError)?;
    Ok(forward_columns
        .iter()
        .zip(values.values)
        .map(|(name, value)| GenericKeyValue {
            key: name.clone(),
            value: Some(value),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use vexadb_proto::GenericValue;

    use super::*;

    #[test]
    fn decodes_values_in_meta_order() {
        let blob = GenericValueList {
            values: vec![GenericValue::string("x"), GenericValue::int64(7)],
        }
        .encode_to_vec();
        let columns = vec!["f1".to_string(), "f2".to_string()];
        let decoded = decode_forward_values(&columns, &blob).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].key, "f1");
        assert_eq!(decoded[1].key, "f2");
        assert_eq!(decoded[1].value.as_ref().unwrap(), &GenericValue::int64(7));
    }

    #[test]
    fn empty_blob_yields_no_attributes() {
        let columns = vec!["f1".to_string()];
        assert!(decode_forward_values(&columns, &[]).unwrap().is_empty());
    }

    #[test]
    fn corrupt_blob_is_reported() {
        let columns = vec!["f1".to_string()];
        assert_eq!(
            decode_forward_values(&columns, &[0xFF, 0xFF, 0xFF]).unwrap_err(),
            Error::DeserializeError
        );
    }
}
