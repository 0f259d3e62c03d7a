/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

/// Wire types and client stub for `proto/clock.proto`.
///
/// The service has a single unary call, so the prost messages and the tonic
/// client are written out here instead of being generated by a build script.
/// Field tags and the method path must stay in sync with the `.proto` file.
pub mod clock_v1 {
    /// Empty request; the server answers with its current time.
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct GetTimeRequest {}

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct GetTimeResponse {
        /// Server wall-clock time, milliseconds since the Unix epoch.
        #[prost(int64, tag = "1")]
        pub unix_time_ms: i64,
    }

    pub mod clock_service_client {
        use tonic::codegen::http::uri::PathAndQuery;
        use tonic::transport::Channel;

        use super::{GetTimeRequest, GetTimeResponse};

        const GET_TIME_PATH: &str = "/crossing.clock.v1.ClockService/GetTime";

        /// Reference clock queried once at startup.
        #[derive(Debug, Clone)]
        pub struct ClockServiceClient {
            inner: tonic::client::Grpc<Channel>,
        }

        impl ClockServiceClient {
            pub fn new(channel: Channel) -> Self {
                Self {
                    inner: tonic::client::Grpc::new(channel),
                }
            }

            pub async fn get_time(
                &mut self,
                request: impl tonic::IntoRequest<GetTimeRequest>,
            ) -> Result<tonic::Response<GetTimeResponse>, tonic::Status> {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::unknown(format!("Service was not ready: {}", e))
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = PathAndQuery::from_static(GET_TIME_PATH);
                self.inner.unary(request.into_request(), path, codec).await
            }
        }
    }
}
