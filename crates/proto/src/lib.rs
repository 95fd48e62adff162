//! Wire protocol definitions shared by the raw KV client and its test doubles
//!
//! - `metapb`: cluster metadata (regions, peers, stores)
//! - `kvrpcpb`: raw KV messages of the store service
//! - `tikvpb`: gRPC client stub for the store service
//! - `pdpb`: messages and gRPC client stub of the placement driver
//!
//! The protobuf messages and the client stubs are checked in rather than
//! generated at build time, so building does not require `protoc`.

/// One unary gRPC method on a `tonic::client::Grpc<Channel>` wrapper
macro_rules! unary_method {
    ($fn_name:ident, $service:literal, $method:literal, $path:literal, $req:ty, $resp:ty) => {
        pub async fn $fn_name(
            &mut self,
            request: impl tonic::IntoRequest<$req>,
        ) -> Result<tonic::Response<$resp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("Service was not ready: {}", e))
            })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = tonic::codegen::http::uri::PathAndQuery::from_static($path);
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(tonic::GrpcMethod::new($service, $method));
            self.inner.unary(req, path, codec).await
        }
    };
}

pub mod kvrpcpb;
pub mod metapb;
pub mod pdpb;
pub mod tikvpb;

// Re-export commonly used types for convenience
pub use kvrpcpb::{Context, KvPair, RegionError};
pub use metapb::{Peer, RegionEpoch};
