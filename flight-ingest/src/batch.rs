use crate::types::Result;
use serde_json::Value;

/// Returned by [`TransportBatch::try_append`] when the payload does not fit.
/// Hands the payload back so the caller can retry it in a fresh batch.
#[derive(Debug, thiserror::Error)]
#[error("batch would grow to {required} bytes, limit is {limit}")]
pub struct AppendRejected {
    pub payload: String,
    pub required: usize,
    pub limit: usize,
}

/// A size-bounded group of serialized records sent in one request.
///
/// The encoded body is a JSON array of `{"Body": "<payload>"}` entries and
/// `encoded_size` always equals the length of [`TransportBatch::body`].
#[derive(Debug, Clone)]
pub struct TransportBatch {
    max_bytes: usize,
    payloads: Vec<String>,
    entries: Vec<String>,
    entries_len: usize,
}

impl TransportBatch {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            payloads: Vec::new(),
            entries: Vec::new(),
            entries_len: 0,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn payloads(&self) -> &[String] {
        &self.payloads
    }

    /// Size of the body as it would be sent now.
    pub fn encoded_size(&self) -> usize {
        Self::size_with(self.entries.len(), self.entries_len)
    }

    pub fn try_append(&mut self, payload: String) -> std::result::Result<(), AppendRejected> {
        let entry = format!(r#"{{"Body":{}}}"#, Value::from(payload.as_str()));

        let required = Self::size_with(self.entries.len() + 1, self.entries_len + entry.len());
        if required > self.max_bytes {
            return Err(AppendRejected {
                payload,
                required,
                limit: self.max_bytes,
            });
        }

        self.entries_len += entry.len();
        self.entries.push(entry);
        self.payloads.push(payload);
        Ok(())
    }

    pub fn body(&self) -> String {
        let mut body = String::with_capacity(self.encoded_size());
        body.push('[');
        body.push_str(&self.entries.join(","));
        body.push(']');
        body
    }

    /// Payloads decoded back into JSON values, in append order.
    pub fn decoded_payloads(&self) -> Result<Vec<Value>> {
        self.payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(Into::into))
            .collect()
    }

    // Brackets plus one comma between each pair of entries.
    fn size_with(count: usize, entries_len: usize) -> usize {
        2 + entries_len + count.saturating_sub(1)
    }
}
