//! Client identity

use uuid::Uuid;
use veil_proto::HelloRequest;

/// Immutable identity of a connecting client
///
/// Built once per incoming hello from the request fields and the
/// observed peer address; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientIdentity {
    pub client_id: Uuid,
    pub client_ip: String,
    pub token_id: Uuid,
    pub user_token: Vec<u8>,
}

impl ClientIdentity {
    pub fn new(client_id: Uuid, client_ip: &str, token_id: Uuid, user_token: Vec<u8>) -> Self {
        Self {
            client_id,
            client_ip: client_ip.to_string(),
            token_id,
            user_token,
        }
    }

    /// Build an identity from a hello request and the observed peer IP
    pub fn from_hello(hello: &HelloRequest, client_ip: &str) -> Self {
        Self::new(
            hello.client_id,
            client_ip,
            hello.token_id,
            hello.user_token.clone(),
        )
    }
}
