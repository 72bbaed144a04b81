//! Client for an external spatial-fitting service.
//!
//! The service receives `{ container, items }` in canonical units and answers with
//! one record per item carrying `fitted`, `x`, `y`, `z`. Answers are held to the
//! same placement rules as the local strategies. Any failure is returned as a
//! [`RemoteError`]; falling back to the local engine is the caller's decision.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::geometry::validate_layout;
use crate::model::{Container, Item, PlacedItem};
use crate::packer::PackingConfig;
use crate::types::{EPSILON, Vec3};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to fitting service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("fitting service answered with status {0}")]
    Status(StatusCode),
    #[error("fitting service answer could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("fitting service answer is missing item '{0}'")]
    MissingItem(String),
    #[error("fitting service answer breaks a placement rule: {0}")]
    InvalidPlacement(String),
}

#[derive(Serialize)]
struct FitRequest<'a> {
    container: &'a Container,
    items: Vec<FitRequestItem<'a>>,
}

#[derive(Serialize)]
struct FitRequestItem<'a> {
    id: &'a str,
    length: f64,
    width: f64,
    height: f64,
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct RemotePlacement {
    id: String,
    #[serde(default)]
    fitted: bool,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    z: f64,
    length: Option<f64>,
    width: Option<f64>,
}

/// Services answer either with a bare list or with `{ "items": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FitResponse {
    List(Vec<RemotePlacement>),
    Wrapped { items: Vec<RemotePlacement> },
}

impl FitResponse {
    fn into_placements(self) -> Vec<RemotePlacement> {
        match self {
            FitResponse::List(items) | FitResponse::Wrapped { items } => items,
        }
    }
}

/// HTTP client for the fitting service.
#[derive(Clone, Debug)]
pub struct RemoteFitter {
    client: reqwest::Client,
    endpoint: String,
    support_ratio: f64,
}

impl RemoteFitter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("freight-fit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            support_ratio: PackingConfig::DEFAULT_ADJACENCY_SUPPORT_RATIO,
        })
    }

    /// Minimum supported fraction demanded of elevated placements in an answer.
    pub fn with_support_ratio(mut self, ratio: f64) -> Self {
        self.support_ratio = ratio;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Asks the service to place `items` and merges the answer onto them by id.
    ///
    /// The returned records follow the order of `items`. An answer that turns a
    /// non-rotatable item or breaks a placement rule is refused as a whole.
    pub async fn fit(
        &self,
        container: &Container,
        items: &[Item],
    ) -> Result<Vec<PlacedItem>, RemoteError> {
        let body = FitRequest {
            container,
            items: items
                .iter()
                .map(|item| FitRequestItem {
                    id: &item.id,
                    length: item.length,
                    width: item.width,
                    height: item.height,
                    weight: item.weight,
                })
                .collect(),
        };

        debug!(endpoint = %self.endpoint, items = items.len(), "calling fitting service");
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status));
        }
        let bytes = response.bytes().await?;
        let answer: FitResponse = serde_json::from_slice(&bytes)?;

        let merged = merge(items, answer.into_placements())?;
        validate_layout(container, &merged, self.support_ratio).map_err(RemoteError::InvalidPlacement)?;
        Ok(merged)
    }
}

fn merge(items: &[Item], answer: Vec<RemotePlacement>) -> Result<Vec<PlacedItem>, RemoteError> {
    let mut by_id: HashMap<String, RemotePlacement> =
        answer.into_iter().map(|p| (p.id.clone(), p)).collect();

    items
        .iter()
        .map(|item| {
            let placement = by_id
                .remove(&item.id)
                .ok_or_else(|| RemoteError::MissingItem(item.id.clone()))?;
            if !placement.fitted {
                return Ok(PlacedItem::unfitted(item.clone()));
            }
            Ok(PlacedItem::fitted(
                oriented(item, &placement)?,
                Vec3::new(placement.x, placement.y, placement.z),
            ))
        })
        .collect()
}

/// Applies a reported yaw. Footprints other than the given one or its yaw, and
/// any yaw of a non-rotatable item, are refused.
fn oriented(item: &Item, placement: &RemotePlacement) -> Result<Item, RemoteError> {
    let (length, width) = match (placement.length, placement.width) {
        (Some(l), Some(w)) => (l, w),
        _ => return Ok(item.clone()),
    };
    let matches = |l: f64, w: f64| (length - l).abs() <= EPSILON && (width - w).abs() <= EPSILON;

    if matches(item.length, item.width) {
        Ok(item.clone())
    } else if !matches(item.width, item.length) {
        Err(RemoteError::InvalidPlacement(format!(
            "'{}' reported as {length} x {width}, given {} x {}",
            item.id, item.length, item.width
        )))
    } else if item.non_rotatable {
        Err(RemoteError::InvalidPlacement(format!(
            "non-rotatable '{}' was turned",
            item.id
        )))
    } else {
        Ok(item.yawed())
    }
}
