//! Batch envelopes and the multiplexed wire format
//!
//! An envelope is a window of at most `cap` requests from one dispatch call.
//! Each entry gets a sequence id `"1".."n"` that is only meaningful for that
//! single HTTP exchange; retries repack into fresh envelopes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request::{HttpMethod, LogicalRequest};

/// Ordered slice of a dispatch input, addressed by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEnvelope {
    /// Positions in the dispatch input, in envelope order.
    members: Vec<usize>,
}

impl BatchEnvelope {
    /// Split `len` consecutive positions into envelopes of at most `cap`.
    ///
    /// A `cap` of zero is treated as one.
    pub fn pack(len: usize, cap: usize) -> Vec<Self> {
        let cap = cap.max(1);
        (0..len)
            .collect::<Vec<_>>()
            .chunks(cap)
            .map(|chunk| Self { members: chunk.to_vec() })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Dispatch-input positions covered by this envelope.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Sequence id and dispatch-input position of every entry.
    pub fn entries(&self) -> impl Iterator<Item = (String, usize)> + '_ {
        self.members.iter().enumerate().map(|(slot, &position)| ((slot + 1).to_string(), position))
    }

    /// Resolve a sequence id from the response back to a dispatch-input
    /// position.
    pub fn position_of(&self, sequence_id: &str) -> Option<usize> {
        let slot: usize = sequence_id.trim().parse().ok()?;
        slot.checked_sub(1).and_then(|i| self.members.get(i)).copied()
    }

    /// Build the request body for this envelope. `requests` is the full
    /// dispatch input the envelope was packed from.
    pub fn to_wire(&self, requests: &[LogicalRequest]) -> BatchRequestBody {
        let requests = self
            .entries()
            .filter_map(|(id, position)| {
                requests.get(position).map(|request| WireSubRequest {
                    id,
                    method: request.method,
                    url: request.url.clone(),
                    headers: request.headers.clone(),
                    body: request.body.clone(),
                })
            })
            .collect();
        BatchRequestBody { requests }
    }
}

/// Outer request body: `{"requests": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequestBody {
    pub requests: Vec<WireSubRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSubRequest {
    pub id: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Outer response body: `{"responses": [...]}`, in arbitrary order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponseBody {
    #[serde(default)]
    pub responses: Vec<WireSubResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSubResponse {
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl WireSubResponse {
    /// Header lookup ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }
}
