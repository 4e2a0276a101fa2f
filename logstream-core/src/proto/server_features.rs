//! `event_store.client.server_features` messages.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SupportedMethods {
    #[prost(message, repeated, tag = "1")]
    pub methods: ::prost::alloc::vec::Vec<SupportedMethod>,
    #[prost(string, tag = "2")]
    pub event_store_server_version: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SupportedMethod {
    #[prost(string, tag = "1")]
    pub method_name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub service_name: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "3")]
    pub features: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

impl SupportedMethods {
    /// Whether `service/method` is listed. The server reports names in
    /// lowercase, so the comparison ignores case.
    pub fn supports(&self, service: &str, method: &str) -> bool {
        self.methods.iter().any(|m| {
            m.service_name.eq_ignore_ascii_case(service) && m.method_name.eq_ignore_ascii_case(method)
        })
    }
}
