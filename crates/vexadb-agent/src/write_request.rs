//! Internal write request and its builder.
//!
//! The builder turns a validated wire request, whose columns may arrive in
//! any order and in any supported wire data type, into index-ready
//! datasets: forward values re-ordered to meta order and serialized into
//! the forward blob, vectors transcoded into the column's native type.

use prost::Message;
use tracing::error;

use vexadb_common::error::{Error, Result};
use vexadb_common::transform;
use vexadb_common::types::{IndexType, OperationType};
use vexadb_index::{CollectionDataset, ColumnData, RowData};
use vexadb_meta::{CollectionMeta, ColumnMeta};
use vexadb_proto::generic_value::ValueOneof;
use vexadb_proto::{write_request as pb, GenericValue, GenericValueList};

use crate::column_order::ColumnOrder;

/// Dispatch mode; proxy requests fan out row by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Direct,
    Proxy,
}

/// Index-ready form of one write call.
#[derive(Debug)]
pub struct WriteRequest {
    pub collection_name: String,
    pub request_type: RequestType,
    pub magic_number: u64,
    pub row_count: u32,
    /// One dataset per row in proxy mode, a single dataset in direct mode.
    pub datasets: Vec<CollectionDataset>,
}

impl WriteRequest {
    pub fn is_proxy(&self) -> bool {
        self.request_type == RequestType::Proxy
    }
}

pub struct WriteRequestBuilder;

impl WriteRequestBuilder {
    pub fn build(
        meta: &CollectionMeta,
        column_order: &ColumnOrder,
        request: &vexadb_proto::WriteRequest,
    ) -> Result<WriteRequest> {
        let row_meta = request.row_meta.clone().unwrap_or_default();
        let (index_full_match, forward_full_match) =
            Self::index_and_forward_mode(&row_meta, meta);
        Self::validate_request(
            request,
            &row_meta,
            meta,
            column_order,
            index_full_match,
            forward_full_match,
        )?;

        let request_type = if meta.repository.is_some() {
            RequestType::Proxy
        } else {
            RequestType::Direct
        };

        let mut datasets = Vec::new();
        match request_type {
            RequestType::Proxy => {
                for row in &request.rows {
                    let mut dataset = CollectionDataset::new(0);
                    dataset.rows.push(Self::build_record(
                        row,
                        &row_meta,
                        meta,
                        column_order,
                        index_full_match,
                        forward_full_match,
                    )?);
                    datasets.push(dataset);
                }
            }
            RequestType::Direct => {
                let mut dataset = CollectionDataset::new(0);
                for row in &request.rows {
                    dataset.rows.push(Self::build_record(
                        row,
                        &row_meta,
                        meta,
                        column_order,
                        index_full_match,
                        forward_full_match,
                    )?);
                }
                datasets.push(dataset);
            }
        }

        Ok(WriteRequest {
            collection_name: request.collection_name.clone(),
            request_type,
            magic_number: request.magic_number,
            row_count: request.rows.len() as u32,
            datasets,
        })
    }

    /// Whether the request's column lists are identical in order to meta's.
    fn index_and_forward_mode(row_meta: &pb::RowMeta, meta: &CollectionMeta) -> (bool, bool) {
        let index_full_match = row_meta.index_column_metas.len() == meta.index_columns.len()
            && row_meta
                .index_column_metas
                .iter()
                .zip(&meta.index_columns)
                .all(|(request, meta)| request.column_name == meta.name);

        let forward_full_match = row_meta.forward_column_names.len()
            == meta.forward_columns.len()
            && row_meta
                .forward_column_names
                .iter()
                .zip(&meta.forward_columns)
                .all(|(request, meta)| request == meta);

        (index_full_match, forward_full_match)
    }

    fn validate_request(
        request: &vexadb_proto::WriteRequest,
        row_meta: &pb::RowMeta,
        meta: &CollectionMeta,
        column_order: &ColumnOrder,
        index_full_match: bool,
        forward_full_match: bool,
    ) -> Result<()> {
        let collection = &request.collection_name;
        if collection.is_empty() {
            return Err(Error::EmptyCollectionName);
        }
        if request.rows.is_empty() {
            error!("Write request is empty. collection[{}]", collection);
            return Err(Error::InvalidWriteRequest);
        }

        let index_column_size = row_meta.index_column_metas.len();
        if meta.index_columns.len() < index_column_size {
            error!(
                "Collection index columns size mismatched. meta[{}] request[{}] collection[{}]",
                meta.index_columns.len(),
                index_column_size,
                collection
            );
            return Err(Error::InvalidWriteRequest);
        }
        if !index_full_match {
            for request_column in &row_meta.index_column_metas {
                if !column_order
                    .index_order()
                    .contains_key(&request_column.column_name)
                {
                    error!(
                        "Collection index field invalid. request[{}] collection[{}]",
                        request_column.column_name, collection
                    );
                    return Err(Error::InvalidWriteRequest);
                }
            }
        }
        for request_column in &row_meta.index_column_metas {
            let Some(column_meta) = meta.column_by_name(&request_column.column_name) else {
                error!(
                    "Invalid index column. name[{}] collection[{}]",
                    request_column.column_name, collection
                );
                return Err(Error::InvalidWriteRequest);
            };
            if column_meta.dimension != request_column.dimension {
                error!(
                    "Index column dimension mismatched. meta[{}] request[{}] column[{}] collection[{}]",
                    column_meta.dimension,
                    request_column.dimension,
                    request_column.column_name,
                    collection
                );
                return Err(Error::InvalidWriteRequest);
            }
        }

        let forward_size = row_meta.forward_column_names.len();
        if meta.forward_columns.len() < forward_size {
            error!(
                "Collection forward columns size mismatched. meta[{}] request[{}] collection[{}]",
                meta.forward_columns.len(),
                forward_size,
                collection
            );
            return Err(Error::InvalidWriteRequest);
        }
        if !forward_full_match {
            for forward_column in &row_meta.forward_column_names {
                if !column_order.forward_order().contains_key(forward_column) {
                    error!(
                        "Collection forward field invalid. request[{}] collection[{}]",
                        forward_column, collection
                    );
                    return Err(Error::InvalidWriteRequest);
                }
            }
        }

        for row in &request.rows {
            if row.operation_type() == OperationType::Delete {
                continue;
            }
            if index_column_size == 0 {
                error!("Row index column names is empty. collection[{}]", collection);
                return Err(Error::InvalidWriteRequest);
            }
            let index_values = row
                .index_column_values
                .as_ref()
                .map(|v| v.values.len())
                .unwrap_or(0);
            if index_values != index_column_size {
                error!(
                    "Row index columns size mismatched. meta[{}] values[{}] collection[{}]",
                    index_column_size, index_values, collection
                );
                return Err(Error::InvalidWriteRequest);
            }
            let forward_values = row
                .forward_column_values
                .as_ref()
                .map(|v| v.values.len())
                .unwrap_or(0);
            if forward_values != forward_size {
                error!(
                    "Row forward columns size mismatched. meta[{}] values[{}] collection[{}]",
                    forward_size, forward_values, collection
                );
                return Err(Error::InvalidWriteRequest);
            }
        }

        Ok(())
    }

    fn build_record(
        row: &pb::Row,
        row_meta: &pb::RowMeta,
        meta: &CollectionMeta,
        column_order: &ColumnOrder,
        index_full_match: bool,
        forward_full_match: bool,
    ) -> Result<RowData> {
        let mut row_data = RowData::new(row.primary_key, row.operation_type());

        if meta.repository.is_some() {
            let Some(lsn_context) = &row.lsn_context else {
                error!(
                    "Row not set lsn_context field. pk[{}] collection[{}]",
                    row.primary_key, meta.name
                );
                return Err(Error::EmptyLsnContext);
            };
            row_data.lsn_check = true;
            row_data.lsn = lsn_context.lsn;
            row_data.lsn_context = lsn_context.context.clone();
        }

        if row_data.operation == OperationType::Delete {
            return Ok(row_data);
        }

        row_data.forward_data =
            Self::build_forward_data(row, row_meta, column_order, meta, forward_full_match)?;
        row_data.columns = Self::build_index_data(row, row_meta, meta, index_full_match)?;
        Ok(row_data)
    }

    fn build_forward_data(
        row: &pb::Row,
        row_meta: &pb::RowMeta,
        column_order: &ColumnOrder,
        meta: &CollectionMeta,
        forward_full_match: bool,
    ) -> Result<Vec<u8>> {
        let values = row.forward_column_values.clone().unwrap_or_default();
        if forward_full_match {
            return Ok(values.encode_to_vec());
        }

        // build a meta-sized list and fill positions from the column order
        let mut ordered = GenericValueList {
            values: vec![GenericValue::default(); meta.forward_columns.len()],
        };
        for (i, forward_column) in row_meta.forward_column_names.iter().enumerate() {
            let Some(&position) = column_order.forward_order().get(forward_column) else {
                error!(
                    "Find forward order failed. forward[{}] collection[{}]",
                    forward_column, meta.name
                );
                return Err(Error::InvalidWriteRequest);
            };
            if position >= ordered.values.len() {
                error!(
                    "Forward order invalid. forward[{}] index[{}] max_size[{}] collection[{}]",
                    forward_column,
                    position,
                    ordered.values.len(),
                    meta.name
                );
                return Err(Error::RuntimeError);
            }
            ordered.values[position] = values.values[i].clone();
        }
        Ok(ordered.encode_to_vec())
    }

    fn build_index_data(
        row: &pb::Row,
        row_meta: &pb::RowMeta,
        meta: &CollectionMeta,
        index_full_match: bool,
    ) -> Result<Vec<ColumnData>> {
        let values = match &row.index_column_values {
            Some(list) => &list.values,
            None => return Err(Error::InvalidWriteRequest),
        };
        let mut columns = Vec::with_capacity(row_meta.index_column_metas.len());
        for (i, request_column) in row_meta.index_column_metas.iter().enumerate() {
            let column_meta = if index_full_match {
                &meta.index_columns[i]
            } else {
                meta.column_by_name(&request_column.column_name)
                    .ok_or_else(|| {
                        error!(
                            "Find index column failed. column[{}] collection[{}]",
                            request_column.column_name, meta.name
                        );
                        Error::MismatchedIndexColumn
                    })?
            };
            columns.push(Self::convert_index_value(
                &values[i],
                column_meta,
                request_column,
                &meta.name,
            )?);
        }
        Ok(columns)
    }

    /// Transcode one wire vector value into the column's native bytes.
    fn convert_index_value(
        value: &GenericValue,
        column_meta: &ColumnMeta,
        request_column: &pb::IndexColumnMeta,
        collection: &str,
    ) -> Result<ColumnData> {
        if column_meta.index_type != IndexType::VectorGraph {
            error!(
                "Invalid index type {}. collection[{}]",
                column_meta.index_type as i32, collection
            );
            return Err(Error::InvalidIndexType);
        }

        let data = match &value.value_oneof {
            Some(ValueOneof::StringValue(text)) => transform::transform_json(
                request_column.data_type(),
                text,
                column_meta.data_type,
            )?,
            Some(ValueOneof::BytesValue(bytes)) => transform::transform_bytes(
                request_column.data_type(),
                bytes,
                column_meta.data_type,
            )?,
            _ => {
                error!(
                    "Index value must be string or bytes. column[{}] collection[{}]",
                    column_meta.name, collection
                );
                return Err(Error::MismatchedIndexColumn);
            }
        };
        transform::validate_vector_bytes(column_meta.data_type, column_meta.dimension, &data)?;

        Ok(ColumnData {
            column_name: column_meta.name.clone(),
            data_type: column_meta.data_type,
            dimension: column_meta.dimension,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use vexadb_common::types::{CollectionStatus, DataType};
    use vexadb_meta::RepositoryMeta;
    use vexadb_proto::LsnContext;

    use super::*;

    fn collection_meta(with_repository: bool) -> CollectionMeta {
        CollectionMeta {
            name: "c".to_string(),
            uid: "uid".to_string(),
            uuid: "uuid".to_string(),
            revision: 0,
            status: CollectionStatus::Serving,
            current: true,
            readable: true,
            writable: true,
            max_docs_per_segment: 0,
            forward_columns: vec!["f1".to_string(), "f2".to_string()],
            index_columns: vec![ColumnMeta {
                name: "v".to_string(),
                uid: "col".to_string(),
                index_type: IndexType::VectorGraph,
                data_type: DataType::VectorFp32,
                dimension: 4,
                parameters: vec![],
            }],
            repository: with_repository.then(|| RepositoryMeta {
                name: "repo".to_string(),
                connection_uri: "mysql://h/db".to_string(),
                user: "u".to_string(),
                password: "p".to_string(),
                table_name: "t".to_string(),
            }),
        }
    }

    fn wire_request(rows: Vec<pb::Row>) -> vexadb_proto::WriteRequest {
        vexadb_proto::WriteRequest {
            collection_name: "c".to_string(),
            row_meta: Some(pb::RowMeta {
                forward_column_names: vec!["f1".to_string(), "f2".to_string()],
                index_column_metas: vec![pb::IndexColumnMeta {
                    column_name: "v".to_string(),
                    data_type: DataType::VectorFp32 as i32,
                    dimension: 4,
                }],
            }),
            rows,
            request_id: String::new(),
            magic_number: 0,
        }
    }

    fn insert_row(key: u64) -> pb::Row {
        pb::Row {
            primary_key: key,
            operation_type: OperationType::Insert as i32,
            forward_column_values: Some(GenericValueList {
                values: vec![
                    GenericValue::string(format!("hello{key}")),
                    GenericValue::int64(1),
                ],
            }),
            index_column_values: Some(GenericValueList {
                values: vec![GenericValue::string("[0.1, 0.2, 0.3, 0.4]")],
            }),
            lsn_context: None,
        }
    }

    fn order(meta: &CollectionMeta) -> ColumnOrder {
        ColumnOrder::new(meta)
    }

    #[test]
    fn direct_mode_accumulates_one_dataset() {
        let meta = collection_meta(false);
        let request = wire_request(vec![insert_row(1), insert_row(2), insert_row(3)]);
        let built = WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap();

        assert_eq!(built.request_type, RequestType::Direct);
        assert_eq!(built.row_count, 3);
        assert_eq!(built.datasets.len(), 1);
        assert_eq!(built.datasets[0].rows.len(), 3);
        let row = &built.datasets[0].rows[0];
        assert!(!row.lsn_check);
        assert_eq!(row.columns[0].data.len(), 16);
        assert_eq!(row.columns[0].data_type, DataType::VectorFp32);
        // forward blob decodes in meta order
        let forward = GenericValueList::decode(row.forward_data.as_slice()).unwrap();
        assert_eq!(forward.values[0], GenericValue::string("hello1"));
    }

    #[test]
    fn proxy_mode_builds_one_dataset_per_row() {
        let meta = collection_meta(true);
        let mut rows = vec![insert_row(1), insert_row(2)];
        for row in &mut rows {
            row.lsn_context = Some(LsnContext {
                lsn: 7,
                context: "binlog:7".to_string(),
            });
        }
        let mut request = wire_request(rows);
        request.magic_number = 99;

        let built = WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap();
        assert_eq!(built.request_type, RequestType::Proxy);
        assert!(built.is_proxy());
        assert_eq!(built.magic_number, 99);
        assert_eq!(built.datasets.len(), 2);
        assert!(built.datasets[0].rows[0].lsn_check);
        assert_eq!(built.datasets[0].rows[0].lsn, 7);
    }

    #[test]
    fn proxy_row_without_lsn_context_fails() {
        let meta = collection_meta(true);
        let request = wire_request(vec![insert_row(1)]);
        assert_eq!(
            WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap_err(),
            Error::EmptyLsnContext
        );
    }

    #[test]
    fn reordered_forward_columns_are_mapped_to_meta_order() {
        let meta = collection_meta(false);
        let mut request = wire_request(vec![insert_row(1)]);
        // request declares f2 before f1
        request.row_meta.as_mut().unwrap().forward_column_names =
            vec!["f2".to_string(), "f1".to_string()];
        request.rows[0].forward_column_values = Some(GenericValueList {
            values: vec![GenericValue::int64(1), GenericValue::string("hello1")],
        });

        let built = WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap();
        let forward =
            GenericValueList::decode(built.datasets[0].rows[0].forward_data.as_slice()).unwrap();
        assert_eq!(forward.values[0], GenericValue::string("hello1"));
        assert_eq!(forward.values[1], GenericValue::int64(1));
    }

    #[test]
    fn forward_subset_fills_remaining_positions_with_defaults() {
        let meta = collection_meta(false);
        let mut request = wire_request(vec![insert_row(1)]);
        request.row_meta.as_mut().unwrap().forward_column_names = vec!["f2".to_string()];
        request.rows[0].forward_column_values = Some(GenericValueList {
            values: vec![GenericValue::int64(5)],
        });

        let built = WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap();
        let forward =
            GenericValueList::decode(built.datasets[0].rows[0].forward_data.as_slice()).unwrap();
        assert_eq!(forward.values.len(), 2);
        assert_eq!(forward.values[0], GenericValue::default());
        assert_eq!(forward.values[1], GenericValue::int64(5));
    }

    #[test]
    fn delete_rows_carry_key_and_operation_only() {
        let meta = collection_meta(false);
        let row = pb::Row {
            primary_key: 9,
            operation_type: OperationType::Delete as i32,
            forward_column_values: None,
            index_column_values: None,
            lsn_context: None,
        };
        let built =
            WriteRequestBuilder::build(&meta, &order(&meta), &wire_request(vec![row])).unwrap();
        let row = &built.datasets[0].rows[0];
        assert_eq!(row.operation, OperationType::Delete);
        assert!(row.columns.is_empty());
        assert!(row.forward_data.is_empty());
    }

    #[test]
    fn validation_failures() {
        let meta = collection_meta(false);

        // empty request
        let request = wire_request(vec![]);
        assert_eq!(
            WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap_err(),
            Error::InvalidWriteRequest
        );

        // empty collection name
        let mut request = wire_request(vec![insert_row(1)]);
        request.collection_name.clear();
        assert_eq!(
            WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap_err(),
            Error::EmptyCollectionName
        );

        // unknown index column
        let mut request = wire_request(vec![insert_row(1)]);
        request.row_meta.as_mut().unwrap().index_column_metas[0].column_name =
            "unknown".to_string();
        assert_eq!(
            WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap_err(),
            Error::InvalidWriteRequest
        );

        // wire dimension disagrees with meta
        let mut request = wire_request(vec![insert_row(1)]);
        request.row_meta.as_mut().unwrap().index_column_metas[0].dimension = 8;
        assert_eq!(
            WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap_err(),
            Error::InvalidWriteRequest
        );

        // unknown forward column
        let mut request = wire_request(vec![insert_row(1)]);
        request.row_meta.as_mut().unwrap().forward_column_names =
            vec!["f1".to_string(), "nope".to_string()];
        assert_eq!(
            WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap_err(),
            Error::InvalidWriteRequest
        );

        // row value counts must match declared counts
        let mut request = wire_request(vec![insert_row(1)]);
        request.rows[0]
            .forward_column_values
            .as_mut()
            .unwrap()
            .values
            .pop();
        assert_eq!(
            WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap_err(),
            Error::InvalidWriteRequest
        );
    }

    #[test]
    fn vector_transcoding_failures() {
        let meta = collection_meta(false);

        // short vector
        let mut request = wire_request(vec![insert_row(1)]);
        request.rows[0].index_column_values = Some(GenericValueList {
            values: vec![GenericValue::string("[0.1, 0.2]")],
        });
        assert_eq!(
            WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap_err(),
            Error::MismatchedDimension
        );

        // unsupported wire data type
        let mut request = wire_request(vec![insert_row(1)]);
        request.row_meta.as_mut().unwrap().index_column_metas[0].data_type =
            DataType::VectorInt8 as i32;
        assert_eq!(
            WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap_err(),
            Error::MismatchedDataType
        );

        // numeric value instead of string/bytes
        let mut request = wire_request(vec![insert_row(1)]);
        request.rows[0].index_column_values = Some(GenericValueList {
            values: vec![GenericValue::int64(1)],
        });
        assert_eq!(
            WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap_err(),
            Error::MismatchedIndexColumn
        );
    }

    #[test]
    fn raw_bytes_vectors_pass_through() {
        let meta = collection_meta(false);
        let mut bytes = Vec::new();
        for v in [0.1f32, 0.2, 0.3, 0.4] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let mut request = wire_request(vec![insert_row(1)]);
        request.rows[0].index_column_values = Some(GenericValueList {
            values: vec![GenericValue::bytes(bytes.clone())],
        });
        let built = WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap();
        assert_eq!(built.datasets[0].rows[0].columns[0].data, bytes);
    }

    #[test]
    fn fp32_wire_narrowed_into_fp16_column() {
        let mut meta = collection_meta(false);
        meta.index_columns[0].data_type = DataType::VectorFp16;
        let request = wire_request(vec![insert_row(1)]);
        let built = WriteRequestBuilder::build(&meta, &order(&meta), &request).unwrap();
        let column = &built.datasets[0].rows[0].columns[0];
        assert_eq!(column.data_type, DataType::VectorFp16);
        assert_eq!(column.data.len(), 8);
    }
}
