//! Conversions between wire messages and catalog domain objects.

use vexadb_common::error::{Error, Result};
use vexadb_index::CollectionStats;
use vexadb_meta::{CollectionMeta, CollectionParams, ColumnParams, RepositoryMeta};
use vexadb_proto as proto;

/// Collection config from the wire into catalog params.
pub fn collection_params_from_config(config: &proto::CollectionConfig) -> Result<CollectionParams> {
    if config.collection_name.is_empty() {
        return Err(Error::EmptyCollectionName);
    }
    Ok(CollectionParams {
        name: config.collection_name.clone(),
        max_docs_per_segment: config.max_docs_per_segment,
        forward_columns: config.forward_column_names.clone(),
        index_columns: config
            .index_column_params
            .iter()
            .map(|column| ColumnParams {
                name: column.column_name.clone(),
                index_type: column.index_type(),
                data_type: column.data_type(),
                dimension: column.dimension,
                parameters: column
                    .extra_params
                    .iter()
                    .map(|kv| (kv.key.clone(), kv.value.clone()))
                    .collect(),
            })
            .collect(),
        repository: config.repository_config.as_ref().map(|repo| RepositoryMeta {
            name: repo.repository_name.clone(),
            connection_uri: repo.connection_uri.clone(),
            user: repo.user.clone(),
            password: repo.password.clone(),
            table_name: repo.table_name.clone(),
        }),
    })
}

/// Catalog meta into the wire collection description.
pub fn collection_info_from_meta(meta: &CollectionMeta) -> proto::CollectionInfo {
    proto::CollectionInfo {
        collection_name: meta.name.clone(),
        uid: meta.uid.clone(),
        uuid: meta.uuid.clone(),
        revision: meta.revision,
        status: meta.status as i32,
        current: meta.current,
        readable: meta.readable,
        writable: meta.writable,
        max_docs_per_segment: meta.max_docs_per_segment,
        forward_column_names: meta.forward_columns.clone(),
        index_column_params: meta
            .index_columns
            .iter()
            .map(|column| proto::IndexColumnParam {
                column_name: column.name.clone(),
                index_type: column.index_type as i32,
                data_type: column.data_type as i32,
                dimension: column.dimension,
                extra_params: column
                    .parameters
                    .iter()
                    .map(|(key, value)| proto::KeyValuePair {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            })
            .collect(),
        repository_config: meta.repository.as_ref().map(|repo| proto::RepositoryConfig {
            repository_name: repo.name.clone(),
            connection_uri: repo.connection_uri.clone(),
            user: repo.user.clone(),
            password: repo.password.clone(),
            table_name: repo.table_name.clone(),
        }),
        magic_number: 0,
        latest_lsn_context: None,
    }
}

/// Index stats into the wire stats message.
pub fn collection_stats_to_pb(stats: &CollectionStats) -> proto::CollectionStats {
    proto::CollectionStats {
        collection_name: stats.collection_name.clone(),
        total_doc_count: stats.total_doc_count,
        total_segment_count: stats.total_segment_count,
        segment_stats: stats
            .segments
            .iter()
            .map(|segment| proto::SegmentStats {
                segment_id: segment.segment_id,
                doc_count: segment.doc_count,
            })
            .collect(),
    }
}
