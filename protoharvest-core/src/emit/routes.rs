//! # HTTP Routing Descriptor
//!
//! A `google.api.Service` configuration mapping every gRPC method to a `POST` route, in the format
//! consumed by `grpc-gateway` through its `grpc_api_configuration` option.
//!
//! Routes are derived mechanically from the method's fully qualified name:
//!
//! ```yaml
//! type: google.api.Service
//! config_version: 3
//! http:
//!   rules:
//!   - selector: orders.v1.Orders.Create
//!     post: /orders/v1/Orders/Create
//!     body: '*'
//! ```
use crate::discovery::FileSet;
use prost_reflect::{FileDescriptor, MethodDescriptor};
use serde::{Deserialize, Serialize};

pub const SERVICE_CONFIG_TYPE: &str = "google.api.Service";
pub const CONFIG_VERSION: u32 = 3;

/// Maps the whole request message to the HTTP body.
pub const WHOLE_MESSAGE_BODY: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub config_version: u32,
    pub http: HttpRules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRules {
    pub rules: Vec<HttpRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRule {
    pub selector: String,
    pub post: String,
    pub body: String,
}

impl From<&MethodDescriptor> for HttpRule {
    fn from(method: &MethodDescriptor) -> Self {
        let selector = method.full_name().to_string();
        let post = format!("/{}", selector.replace('.', "/"));

        HttpRule {
            selector,
            post,
            body: WHOLE_MESSAGE_BODY.to_string(),
        }
    }
}

impl RoutingConfig {
    pub fn new(rules: Vec<HttpRule>) -> Self {
        Self {
            kind: SERVICE_CONFIG_TYPE.to_string(),
            config_version: CONFIG_VERSION,
            http: HttpRules { rules },
        }
    }

    /// One rule per method of every service declared in `files`.
    pub fn for_files(files: &FileSet) -> Self {
        Self::new(files.files().flat_map(file_rules).collect())
    }

    /// One rule per method of every service declared in `file`.
    pub fn for_file(file: &FileDescriptor) -> Self {
        Self::new(file_rules(file).collect())
    }

    pub fn rules(&self) -> &[HttpRule] {
        &self.http.rules
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn file_rules(file: &FileDescriptor) -> impl Iterator<Item = HttpRule> + '_ {
    file.services()
        .flat_map(|service| service.methods().collect::<Vec<_>>())
        .map(|method| HttpRule::from(&method))
}
