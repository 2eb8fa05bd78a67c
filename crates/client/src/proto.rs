// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protobuf payloads for the admin commands the driver decodes itself.
//!
//! Hand-derived prost messages; the shapes follow the server's
//! `ClientMessageDtos` contract. Data-command payloads never pass through
//! here.

/// Payload of `IdentifyClient`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IdentifyClient {
    #[prost(int32, tag = "1")]
    pub version: i32,
    #[prost(string, optional, tag = "2")]
    pub connection_name: Option<String>,
}

/// Payload of `NotHandled`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotHandled {
    #[prost(enumeration = "NotHandledReason", tag = "1")]
    pub reason: i32,
    /// Serialized [`MasterInfo`] when the reason is `NotMaster`.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub additional_info: Option<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum NotHandledReason {
    NotReady = 0,
    TooBusy = 1,
    NotMaster = 2,
}

/// Redirection target carried by `NotHandled { reason: NotMaster }`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MasterInfo {
    #[prost(string, tag = "1")]
    pub external_tcp_address: String,
    #[prost(int32, tag = "2")]
    pub external_tcp_port: i32,
    #[prost(string, tag = "3")]
    pub external_http_address: String,
    #[prost(int32, tag = "4")]
    pub external_http_port: i32,
    #[prost(string, optional, tag = "5")]
    pub external_secure_tcp_address: Option<String>,
    #[prost(int32, optional, tag = "6")]
    pub external_secure_tcp_port: Option<i32>,
}
