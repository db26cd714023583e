use crate::template::PostbackTemplate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP methods accepted for postback endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndpointMethod {
    Get,
    Post,
}

impl EndpointMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointMethod::Get => "GET",
            EndpointMethod::Post => "POST",
        }
    }
}

/// Target endpoint of a postback batch; `url` may hold `{name}` placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: EndpointMethod,
    pub url: String,
}

/// Ingest request: one endpoint template, one postback per data item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostbackRequest {
    pub endpoint: Endpoint,
    pub data: Vec<HashMap<String, String>>,
}

impl PostbackRequest {
    pub fn template(&self) -> PostbackTemplate {
        PostbackTemplate::new(self.endpoint.method.as_str(), self.endpoint.url.clone())
    }
}

/// Ingest response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedResponse {
    pub queued: usize,
}
