//! Commerce platform access through the Shopify Admin GraphQL API.
//!
//! Every call is a single `{query, variables}` POST. A response carrying a
//! top-level `errors` list fails the call; mutation `userErrors` are logged
//! and otherwise ignored.

use async_trait::async_trait;
use codbot_core::config::CommerceConfig;
use codbot_core::{CustomerId, CustomerRef, OrderId, PendingOrder};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

const PENDING_ORDER_QUERY: &str = "query pendingOrder($query: String!) { \
     orders(first: 1, query: $query, sortKey: CREATED_AT, reverse: true) { \
     edges { node { id name tags customer { id firstName } } } } }";

const CUSTOMER_BY_PHONE_QUERY: &str = "query customerByPhone($query: String!) { \
     customers(first: 1, query: $query) { edges { node { id } } } }";

const TAGS_ADD_MUTATION: &str = "mutation tagsAdd($id: ID!, $tags: [String!]!) { \
     tagsAdd(id: $id, tags: $tags) { userErrors { field message } } }";

const ORDER_CANCEL_MUTATION: &str = "mutation orderCancel($id: ID!) { \
     orderCancel(id: $id) { order { id } userErrors { field message } } }";

#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("commerce request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("commerce api returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to parse commerce response: {0}")]
    Decode(String),
    #[error("commerce api reported errors: {0}")]
    GraphQl(String),
}

#[async_trait]
pub trait CommerceClient: Send + Sync {
    /// Newest order for `phone` carrying `tag`, if any.
    async fn find_pending_order(
        &self,
        phone: &str,
        tag: &str,
    ) -> Result<Option<PendingOrder>, CommerceError>;

    async fn find_customer_id(&self, phone: &str) -> Result<Option<CustomerId>, CommerceError>;

    /// Tags any taggable resource (order or customer) by its global id.
    async fn add_tags(&self, resource_id: &str, tags: &[String]) -> Result<(), CommerceError>;

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), CommerceError>;
}

#[derive(Clone)]
pub struct ShopifyClient {
    client: Client,
    endpoint: String,
    access_token: SecretString,
}

impl ShopifyClient {
    pub fn new(client: Client, config: &CommerceConfig) -> Self {
        Self::with_endpoint(
            client,
            graphql_endpoint(&config.store_domain, &config.api_version),
            config.access_token.clone(),
        )
    }

    /// Targets an explicit GraphQL endpoint URL instead of one derived from a store domain.
    pub fn with_endpoint(
        client: Client,
        endpoint: impl Into<String>,
        access_token: SecretString,
    ) -> Self {
        Self { client, endpoint: endpoint.into(), access_token }
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, CommerceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", self.access_token.expose_secret())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CommerceError::Status { status: status.as_u16(), body });
        }

        parse_graphql_response(&body)
    }
}

pub fn graphql_endpoint(store_domain: &str, api_version: &str) -> String {
    format!("https://{}/admin/api/{api_version}/graphql.json", store_domain.trim_end_matches('/'))
}

pub fn pending_order_search(phone: &str, tag: &str) -> String {
    format!("phone:{phone} tag:'{tag}'")
}

/// Returns the `data` member, or fails on a top-level `errors` list.
pub fn parse_graphql_response(raw: &str) -> Result<Value, CommerceError> {
    let mut parsed: Value = serde_json::from_str(raw)
        .map_err(|_| CommerceError::Decode(format!("not a JSON document: {raw}")))?;

    match parsed.get("errors") {
        None | Some(Value::Null) => {}
        Some(errors) => return Err(CommerceError::GraphQl(errors.to_string())),
    }

    Ok(parsed.get_mut("data").map(Value::take).unwrap_or(Value::Null))
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct OrdersData {
    orders: Connection<OrderNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderNode {
    id: String,
    name: String,
    #[serde(default)]
    tags: Vec<String>,
    customer: Option<CustomerNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerNode {
    id: String,
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomersData {
    customers: Connection<CustomerIdNode>,
}

#[derive(Debug, Deserialize)]
struct CustomerIdNode {
    id: String,
}

pub fn pending_order_from_data(data: Value) -> Result<Option<PendingOrder>, CommerceError> {
    let data: OrdersData =
        serde_json::from_value(data).map_err(|error| CommerceError::Decode(error.to_string()))?;

    Ok(data.orders.edges.into_iter().next().map(|edge| {
        let node = edge.node;
        PendingOrder {
            id: OrderId(node.id),
            name: node.name,
            customer: node.customer.map(|customer| CustomerRef {
                id: CustomerId(customer.id),
                first_name: customer.first_name,
            }),
            tags: node.tags,
        }
    }))
}

pub fn customer_id_from_data(data: Value) -> Result<Option<CustomerId>, CommerceError> {
    let data: CustomersData =
        serde_json::from_value(data).map_err(|error| CommerceError::Decode(error.to_string()))?;

    Ok(data.customers.edges.into_iter().next().map(|edge| CustomerId(edge.node.id)))
}

/// `userErrors` reported by a mutation payload, rendered as `field: message`.
pub fn user_errors(data: &Value, mutation: &str) -> Vec<String> {
    data.get(mutation)
        .and_then(|payload| payload.get("userErrors"))
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|error| {
                    let message = error.get("message").and_then(Value::as_str).unwrap_or("");
                    match error.get("field") {
                        Some(Value::Array(path)) if !path.is_empty() => {
                            let field = path
                                .iter()
                                .filter_map(Value::as_str)
                                .collect::<Vec<_>>()
                                .join(".");
                            format!("{field}: {message}")
                        }
                        _ => message.to_string(),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

fn log_user_errors(data: &Value, mutation: &str, resource_id: &str) {
    let errors = user_errors(data, mutation);
    if !errors.is_empty() {
        warn!(
            event_name = "commerce.mutation.user_errors",
            mutation,
            resource_id,
            errors = %errors.join("; "),
            "commerce mutation reported user errors"
        );
    }
}

#[async_trait]
impl CommerceClient for ShopifyClient {
    async fn find_pending_order(
        &self,
        phone: &str,
        tag: &str,
    ) -> Result<Option<PendingOrder>, CommerceError> {
        let data = self
            .graphql(PENDING_ORDER_QUERY, json!({ "query": pending_order_search(phone, tag) }))
            .await?;
        pending_order_from_data(data)
    }

    async fn find_customer_id(&self, phone: &str) -> Result<Option<CustomerId>, CommerceError> {
        let data = self
            .graphql(CUSTOMER_BY_PHONE_QUERY, json!({ "query": format!("phone:{phone}") }))
            .await?;
        customer_id_from_data(data)
    }

    async fn add_tags(&self, resource_id: &str, tags: &[String]) -> Result<(), CommerceError> {
        let data =
            self.graphql(TAGS_ADD_MUTATION, json!({ "id": resource_id, "tags": tags })).await?;
        log_user_errors(&data, "tagsAdd", resource_id);
        debug!(resource_id, tags = %tags.join(","), "tags applied");
        Ok(())
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), CommerceError> {
        let data = self.graphql(ORDER_CANCEL_MUTATION, json!({ "id": order_id.0 })).await?;
        log_user_errors(&data, "orderCancel", &order_id.0);
        Ok(())
    }
}
