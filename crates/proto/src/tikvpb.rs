//! gRPC client for the store's raw KV service (`tikvpb.Tikv`)

use tonic::transport::Channel;

use crate::kvrpcpb::*;

/// Raw KV client over a tonic channel
///
/// Cloning is cheap and shares the underlying channel.
#[derive(Debug, Clone)]
pub struct TikvClient {
    inner: tonic::client::Grpc<Channel>,
}

impl TikvClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    unary_method!(
        raw_get,
        "tikvpb.Tikv",
        "RawGet",
        "/tikvpb.Tikv/RawGet",
        RawGetRequest,
        RawGetResponse
    );
    unary_method!(
        raw_put,
        "tikvpb.Tikv",
        "RawPut",
        "/tikvpb.Tikv/RawPut",
        RawPutRequest,
        RawPutResponse
    );
    unary_method!(
        raw_delete,
        "tikvpb.Tikv",
        "RawDelete",
        "/tikvpb.Tikv/RawDelete",
        RawDeleteRequest,
        RawDeleteResponse
    );
    unary_method!(
        raw_batch_get,
        "tikvpb.Tikv",
        "RawBatchGet",
        "/tikvpb.Tikv/RawBatchGet",
        RawBatchGetRequest,
        RawBatchGetResponse
    );
    unary_method!(
        raw_batch_put,
        "tikvpb.Tikv",
        "RawBatchPut",
        "/tikvpb.Tikv/RawBatchPut",
        RawBatchPutRequest,
        RawBatchPutResponse
    );
    unary_method!(
        raw_batch_delete,
        "tikvpb.Tikv",
        "RawBatchDelete",
        "/tikvpb.Tikv/RawBatchDelete",
        RawBatchDeleteRequest,
        RawBatchDeleteResponse
    );
    unary_method!(
        raw_scan,
        "tikvpb.Tikv",
        "RawScan",
        "/tikvpb.Tikv/RawScan",
        RawScanRequest,
        RawScanResponse
    );
    unary_method!(
        raw_delete_range,
        "tikvpb.Tikv",
        "RawDeleteRange",
        "/tikvpb.Tikv/RawDeleteRange",
        RawDeleteRangeRequest,
        RawDeleteRangeResponse
    );
}
