//! Message definitions shared by the binary RPC and HTTP surfaces.
//!
//! Structs carry prost field tags for the binary encoding and serde
//! attributes for the JSON encoding; nested request types follow the
//! usual prost module layout.

use serde::{Deserialize, Serialize};

use vexadb_common::types::{CollectionStatus, DataType, IndexType};

/// Wire status pair; code 0 is success.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub reason: String,
}

impl Status {
    pub fn success() -> Self {
        Status::default()
    }

    pub fn from_code(code: i32) -> Self {
        Status {
            code,
            reason: vexadb_common::Error::what(code),
        }
    }

    pub fn ok(&self) -> bool {
        self.code == 0
    }
}

impl From<&vexadb_common::Error> for Status {
    fn from(err: &vexadb_common::Error) -> Self {
        Status {
            code: err.code(),
            reason: err.reason(),
        }
    }
}

/// A single typed scalar value.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericValue {
    #[prost(oneof = "generic_value::ValueOneof", tags = "1, 2, 3, 4, 5, 6, 7, 8, 9")]
    #[serde(flatten)]
    pub value_oneof: Option<generic_value::ValueOneof>,
}

pub mod generic_value {
    use super::*;

    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ValueOneof {
        #[prost(bytes, tag = "1")]
        BytesValue(#[serde(with = "crate::json::base64_bytes")] ::prost::alloc::vec::Vec<u8>),
        #[prost(string, tag = "2")]
        StringValue(::prost::alloc::string::String),
        #[prost(bool, tag = "3")]
        BoolValue(bool),
        #[prost(int32, tag = "4")]
        Int32Value(i32),
        #[prost(int64, tag = "5")]
        Int64Value(#[serde(with = "crate::json::i64_str")] i64),
        #[prost(uint32, tag = "6")]
        Uint32Value(u32),
        #[prost(uint64, tag = "7")]
        Uint64Value(#[serde(with = "crate::json::u64_str")] u64),
        #[prost(float, tag = "8")]
        FloatValue(f32),
        #[prost(double, tag = "9")]
        DoubleValue(f64),
    }
}

impl GenericValue {
    pub fn string(value: impl Into<String>) -> Self {
        GenericValue {
            value_oneof: Some(generic_value::ValueOneof::StringValue(value.into())),
        }
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        GenericValue {
            value_oneof: Some(generic_value::ValueOneof::BytesValue(value.into())),
        }
    }

    pub fn int64(value: i64) -> Self {
        GenericValue {
            value_oneof: Some(generic_value::ValueOneof::Int64Value(value)),
        }
    }

    pub fn float(value: f32) -> Self {
        GenericValue {
            value_oneof: Some(generic_value::ValueOneof::FloatValue(value)),
        }
    }
}

/// Ordered list of generic values; the forward blob payload.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericValueList {
    #[prost(message, repeated, tag = "1")]
    pub values: Vec<GenericValue>,
}

/// Named generic value, used for forward attributes on result documents.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericKeyValue {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<GenericValue>,
}

/// String key/value pair for index and query parameters.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValuePair {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

/// External CDC source descriptor; presence selects proxy-write mode.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    #[prost(string, tag = "1")]
    pub repository_name: String,
    #[prost(string, tag = "2")]
    pub connection_uri: String,
    #[prost(string, tag = "3")]
    pub user: String,
    #[prost(string, tag = "4")]
    pub password: String,
    #[prost(string, tag = "5")]
    pub table_name: String,
}

/// Vector column definition inside a collection config.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexColumnParam {
    #[prost(string, tag = "1")]
    pub column_name: String,
    #[prost(int32, tag = "2")]
    #[serde(with = "crate::json::index_type")]
    pub index_type: i32,
    #[prost(int32, tag = "3")]
    #[serde(with = "crate::json::data_type")]
    pub data_type: i32,
    #[prost(uint32, tag = "4")]
    pub dimension: u32,
    #[prost(message, repeated, tag = "5")]
    pub extra_params: Vec<KeyValuePair>,
}

impl IndexColumnParam {
    pub fn index_type(&self) -> IndexType {
        IndexType::from_i32(self.index_type)
    }

    pub fn data_type(&self) -> DataType {
        DataType::from_i32(self.data_type)
    }
}

/// Collection creation / update request body.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    #[prost(string, tag = "1")]
    pub collection_name: String,
    #[prost(uint64, tag = "2")]
    #[serde(with = "crate::json::u64_str")]
    pub max_docs_per_segment: u64,
    #[prost(string, repeated, tag = "3")]
    pub forward_column_names: Vec<String>,
    #[prost(message, repeated, tag = "4")]
    pub index_column_params: Vec<IndexColumnParam>,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_config: Option<RepositoryConfig>,
}

/// CDC checkpoint carried with proxy writes.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct LsnContext {
    #[prost(uint64, tag = "1")]
    #[serde(with = "crate::json::u64_str")]
    pub lsn: u64,
    #[prost(string, tag = "2")]
    pub context: String,
}

/// Full collection description returned by describe/list.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionInfo {
    #[prost(string, tag = "1")]
    pub collection_name: String,
    #[prost(string, tag = "2")]
    pub uid: String,
    #[prost(string, tag = "3")]
    pub uuid: String,
    #[prost(uint32, tag = "4")]
    pub revision: u32,
    #[prost(int32, tag = "5")]
    #[serde(with = "crate::json::collection_status")]
    pub status: i32,
    #[prost(bool, tag = "6")]
    pub current: bool,
    #[prost(bool, tag = "7")]
    pub readable: bool,
    #[prost(bool, tag = "8")]
    pub writable: bool,
    #[prost(uint64, tag = "9")]
    #[serde(with = "crate::json::u64_str")]
    pub max_docs_per_segment: u64,
    #[prost(string, repeated, tag = "10")]
    pub forward_column_names: Vec<String>,
    #[prost(message, repeated, tag = "11")]
    pub index_column_params: Vec<IndexColumnParam>,
    #[prost(message, optional, tag = "12")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_config: Option<RepositoryConfig>,
    #[prost(uint64, tag = "13")]
    #[serde(with = "crate::json::u64_str")]
    pub magic_number: u64,
    #[prost(message, optional, tag = "14")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_lsn_context: Option<LsnContext>,
}

impl CollectionInfo {
    pub fn status(&self) -> CollectionStatus {
        CollectionStatus::from_i32(self.status)
    }
}

/// Request naming a single collection.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionName {
    #[prost(string, tag = "1")]
    pub collection_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribeCollectionResponse {
    #[prost(message, optional, tag = "1")]
    pub status: Option<Status>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionInfo>,
}

/// Filter for list_collections.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ListCondition {
    #[prost(string, tag = "1")]
    pub repository_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ListCollectionsResponse {
    #[prost(message, optional, tag = "1")]
    pub status: Option<Status>,
    #[prost(message, repeated, tag = "2")]
    pub collections: Vec<CollectionInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentStats {
    #[prost(uint64, tag = "1")]
    #[serde(with = "crate::json::u64_str")]
    pub segment_id: u64,
    #[prost(uint64, tag = "2")]
    #[serde(with = "crate::json::u64_str")]
    pub doc_count: u64,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionStats {
    #[prost(string, tag = "1")]
    pub collection_name: String,
    #[prost(uint64, tag = "2")]
    #[serde(with = "crate::json::u64_str")]
    pub total_doc_count: u64,
    #[prost(uint64, tag = "3")]
    #[serde(with = "crate::json::u64_str")]
    pub total_segment_count: u64,
    #[prost(message, repeated, tag = "4")]
    pub segment_stats: Vec<SegmentStats>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsCollectionResponse {
    #[prost(message, optional, tag = "1")]
    pub status: Option<Status>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_stats: Option<CollectionStats>,
}

/// Batched write of rows against one collection.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteRequest {
    #[prost(string, tag = "1")]
    pub collection_name: String,
    #[prost(message, optional, tag = "2")]
    pub row_meta: Option<write_request::RowMeta>,
    #[prost(message, repeated, tag = "3")]
    pub rows: Vec<write_request::Row>,
    #[prost(string, tag = "4")]
    pub request_id: String,
    #[prost(uint64, tag = "5")]
    #[serde(with = "crate::json::u64_str")]
    pub magic_number: u64,
}

pub mod write_request {
    use super::*;

    /// Declared column layout shared by every row in the request.
    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    #[serde(default)]
    pub struct RowMeta {
        #[prost(string, repeated, tag = "1")]
        pub forward_column_names: Vec<String>,
        #[prost(message, repeated, tag = "2")]
        pub index_column_metas: Vec<IndexColumnMeta>,
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    #[serde(default)]
    pub struct IndexColumnMeta {
        #[prost(string, tag = "1")]
        pub column_name: String,
        #[prost(int32, tag = "2")]
        #[serde(with = "crate::json::data_type")]
        pub data_type: i32,
        #[prost(uint32, tag = "3")]
        pub dimension: u32,
    }

    impl IndexColumnMeta {
        pub fn data_type(&self) -> vexadb_common::types::DataType {
            vexadb_common::types::DataType::from_i32(self.data_type)
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Row {
        #[prost(uint64, tag = "1")]
        #[serde(with = "crate::json::u64_str")]
        pub primary_key: u64,
        #[prost(int32, tag = "2")]
        #[serde(with = "crate::json::operation_type")]
        pub operation_type: i32,
        #[prost(message, optional, tag = "3")]
        #[serde(skip_serializing_if = "Option::is_none")]
        pub forward_column_values: Option<GenericValueList>,
        #[prost(message, optional, tag = "4")]
        #[serde(skip_serializing_if = "Option::is_none")]
        pub index_column_values: Option<GenericValueList>,
        #[prost(message, optional, tag = "5")]
        #[serde(skip_serializing_if = "Option::is_none")]
        pub lsn_context: Option<LsnContext>,
    }

    impl Row {
        pub fn operation_type(&self) -> vexadb_common::types::OperationType {
            vexadb_common::types::OperationType::from_i32(self.operation_type)
        }
    }
}

/// k-NN query against one vector column.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    #[prost(string, tag = "1")]
    pub collection_name: String,
    #[prost(message, optional, tag = "2")]
    pub knn_param: Option<query_request::KnnQueryParam>,
}

pub mod query_request {
    use super::*;

    #[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
    #[serde(default)]
    pub struct KnnQueryParam {
        #[prost(string, tag = "1")]
        pub column_name: String,
        #[prost(uint32, tag = "2")]
        pub topk: u32,
        /// Raw little-endian packed features, `batch_count` vectors.
        #[prost(bytes, tag = "3")]
        #[serde(with = "crate::json::base64_bytes")]
        pub features: Vec<u8>,
        /// JSON matrix text, alternative to `features`.
        #[prost(string, tag = "4")]
        pub matrix: String,
        #[prost(uint32, tag = "5")]
        pub batch_count: u32,
        #[prost(uint32, tag = "6")]
        pub dimension: u32,
        #[prost(int32, tag = "7")]
        #[serde(with = "crate::json::data_type")]
        pub data_type: i32,
        #[prost(float, optional, tag = "8")]
        #[serde(skip_serializing_if = "Option::is_none")]
        pub radius: Option<f32>,
        #[prost(bool, tag = "9")]
        pub is_linear: bool,
        #[prost(message, repeated, tag = "10")]
        pub extra_params: Vec<KeyValuePair>,
    }

    impl KnnQueryParam {
        pub fn data_type(&self) -> vexadb_common::types::DataType {
            vexadb_common::types::DataType::from_i32(self.data_type)
        }
    }
}

/// One k-NN hit with projected forward attributes.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    #[prost(uint64, tag = "1")]
    #[serde(with = "crate::json::u64_str")]
    pub primary_key: u64,
    #[prost(float, tag = "2")]
    #[serde(with = "crate::json::f32_compat")]
    pub score: f32,
    #[prost(message, repeated, tag = "3")]
    pub forward_column_values: Vec<GenericKeyValue>,
}

/// Result list of one query batch.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResult {
    #[prost(message, repeated, tag = "1")]
    pub documents: Vec<Document>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    #[prost(message, optional, tag = "1")]
    pub status: Option<Status>,
    #[prost(message, repeated, tag = "2")]
    pub results: Vec<QueryResult>,
    #[prost(uint64, tag = "3")]
    #[serde(with = "crate::json::u64_str")]
    pub latency_us: u64,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GetDocumentRequest {
    #[prost(string, tag = "1")]
    pub collection_name: String,
    #[prost(uint64, tag = "2")]
    #[serde(with = "crate::json::u64_str")]
    pub primary_key: u64,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GetDocumentResponse {
    #[prost(message, optional, tag = "1")]
    pub status: Option<Status>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GetVersionRequest {}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GetVersionResponse {
    #[prost(message, optional, tag = "1")]
    pub status: Option<Status>,
    #[prost(string, tag = "2")]
    pub version: String,
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;
    use vexadb_common::types::OperationType;

    fn sample_write_request() -> WriteRequest {
        WriteRequest {
            collection_name: "articles".to_string(),
            row_meta: Some(write_request::RowMeta {
                forward_column_names: vec!["title".to_string(), "views".to_string()],
                index_column_metas: vec![write_request::IndexColumnMeta {
                    column_name: "embedding".to_string(),
                    data_type: DataType::VectorFp32 as i32,
                    dimension: 4,
                }],
            }),
            rows: vec![write_request::Row {
                primary_key: u64::MAX - 1,
                operation_type: OperationType::Insert as i32,
                forward_column_values: Some(GenericValueList {
                    values: vec![GenericValue::string("hello"), GenericValue::int64(12)],
                }),
                index_column_values: Some(GenericValueList {
                    values: vec![GenericValue::string("[0.1, 0.2, 0.3, 0.4]")],
                }),
                lsn_context: None,
            }],
            request_id: String::new(),
            magic_number: 42,
        }
    }

    #[test]
    fn binary_round_trip() {
        let request = sample_write_request();
        let bytes = request.encode_to_vec();
        let decoded = WriteRequest::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn json_round_trip_preserves_fields() {
        let request = sample_write_request();
        let text = serde_json::to_string(&request).unwrap();
        // u64 primary key survives as a string
        assert!(text.contains("\"18446744073709551614\""));
        let decoded: WriteRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn json_ignores_unknown_fields() {
        let decoded: CollectionName =
            serde_json::from_str(r#"{"collection_name": "c", "future_field": 1}"#).unwrap();
        assert_eq!(decoded.collection_name, "c");
    }

    #[test]
    fn generic_value_oneof_external_tag() {
        let value = GenericValue::bytes(vec![1u8, 2, 3]);
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"bytes_value":"AQID"}"#);
        let decoded: GenericValue = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn collection_config_round_trips_both_encodings() {
        let config = CollectionConfig {
            collection_name: "articles".to_string(),
            max_docs_per_segment: 100_000,
            forward_column_names: vec!["f1".to_string(), "f2".to_string()],
            index_column_params: vec![IndexColumnParam {
                column_name: "v".to_string(),
                index_type: IndexType::VectorGraph as i32,
                data_type: DataType::VectorFp32 as i32,
                dimension: 8,
                extra_params: vec![KeyValuePair {
                    key: "ef_search".to_string(),
                    value: "200".to_string(),
                }],
            }],
            repository_config: Some(RepositoryConfig {
                repository_name: "mysql_repo".to_string(),
                connection_uri: "mysql://host:3306/db".to_string(),
                user: "root".to_string(),
                password: "secret".to_string(),
                table_name: "t".to_string(),
            }),
        };

        let decoded = CollectionConfig::decode(config.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, config);

        let text = serde_json::to_string(&config).unwrap();
        let decoded: CollectionConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn query_response_serializes_zero_primitives() {
        let response = QueryResponse {
            status: Some(Status::success()),
            results: vec![],
            latency_us: 0,
        };
        let text = serde_json::to_string(&response).unwrap();
        // zero/empty primitives stay visible in the body
        assert!(text.contains("\"code\":0"));
        assert!(text.contains("\"latency_us\":\"0\""));
    }
}
