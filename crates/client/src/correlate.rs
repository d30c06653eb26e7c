//! Positional correlation of JSON-RPC batch responses.
//!
//! Requests get their position in the batch as the JSON-RPC id. The
//! transport is free to return responses in any order; correlation restores
//! input order from the echoed ids, so slot `i` of the output always belongs
//! to request `i`. A failed position stays in the output as an explicit
//! error marker; positions are never dropped.

use crate::error::RpcError;
use crate::wire::{RpcRequest, RpcResponse};
use serde_json::Value;


pub struct CorrelatedBatch {
    requests: Vec<RpcRequest>,
}


impl CorrelatedBatch {
    pub fn new(requests: impl IntoIterator<Item = RpcRequest>) -> Self {
        let requests = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| request.with_id(index as u64))
            .collect();
        Self { requests }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[RpcRequest] {
        &self.requests
    }

    /// Re-associates responses with requests by id. The output has exactly
    /// one slot per request. Ids outside the batch or repeated ids violate
    /// the transport contract and fail the whole batch.
    pub fn correlate(
        &self,
        responses: Vec<RpcResponse>
    ) -> Result<Vec<Result<Value, RpcError>>, RpcError>
    {
        let mut slots: Vec<Option<RpcResponse>> = Vec::new();
        slots.resize_with(self.requests.len(), || None);

        for response in responses {
            // a response without an id cannot be attributed to any request;
            // the affected slot will report a missing response below
            let Some(id) = response.id else { continue };
            let index = id as usize;
            if index >= slots.len() {
                return Err(RpcError::UnexpectedId { id })
            }
            if slots[index].is_some() {
                return Err(RpcError::DuplicateId { id })
            }
            slots[index] = Some(response);
        }

        Ok(slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| self.item_result(index, slot))
            .collect())
    }

    /// Like [`Self::correlate`], but the first failed position fails the
    /// batch. This is what the export pipeline wants: no partial batches.
    pub fn results(&self, responses: Vec<RpcResponse>) -> Result<Vec<Value>, RpcError> {
        self.correlate(responses)?.into_iter().collect()
    }

    fn item_result(
        &self,
        index: usize,
        slot: Option<RpcResponse>
    ) -> Result<Value, RpcError>
    {
        let method = self.requests[index].method;
        let Some(response) = slot else {
            return Err(RpcError::MissingResponse { index, method })
        };
        if let Some(source) = response.error {
            return Err(RpcError::Node { index, method, source })
        }
        match response.result {
            Some(Value::Null) | None => Err(RpcError::NullResult { index, method }),
            Some(value) => Ok(value),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::RpcErrorObject;
    use proptest::prelude::*;

    fn batch(n: u64) -> CorrelatedBatch {
        CorrelatedBatch::new((0..n).map(RpcRequest::get_block_hash))
    }

    fn response(id: u64) -> RpcResponse {
        RpcResponse {
            id: Some(id),
            result: Some(Value::String(format!("hash-{}", id))),
            error: None,
        }
    }

    #[test]
    fn ids_follow_batch_position() {
        let batch = batch(3);
        let ids: Vec<_> = batch.requests().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn reversed_responses_are_restored_to_input_order() {
        let batch = batch(4);
        let responses = (0..4).rev().map(response).collect();
        let results = batch.results(responses).unwrap();
        assert_eq!(results.len(), 4);
        for (index, value) in results.iter().enumerate() {
            assert_eq!(value, &Value::String(format!("hash-{}", index)));
        }
    }

    #[test]
    fn failed_position_is_marked_not_dropped() {
        let batch = batch(3);
        let responses = vec![
            response(2),
            RpcResponse {
                id: Some(1),
                result: None,
                error: Some(RpcErrorObject {
                    code: -5,
                    message: "Block not found".into(),
                }),
            },
            response(0),
        ];
        let correlated = batch.correlate(responses).unwrap();
        assert_eq!(correlated.len(), 3);
        assert!(correlated[0].is_ok());
        assert!(matches!(correlated[1], Err(RpcError::Node { index: 1, .. })));
        assert!(correlated[2].is_ok());
    }

    #[test]
    fn missing_and_null_results_are_errors() {
        let batch = batch(2);
        let responses = vec![RpcResponse {
            id: Some(0),
            result: Some(Value::Null),
            error: None,
        }];
        let correlated = batch.correlate(responses).unwrap();
        assert!(matches!(correlated[0], Err(RpcError::NullResult { index: 0, .. })));
        assert!(matches!(correlated[1], Err(RpcError::MissingResponse { index: 1, .. })));
    }

    #[test]
    fn foreign_and_duplicate_ids_fail_the_batch() {
        let batch = batch(2);
        assert!(matches!(
            batch.correlate(vec![response(7)]),
            Err(RpcError::UnexpectedId { id: 7 })
        ));
        assert!(matches!(
            batch.correlate(vec![response(1), response(1)]),
            Err(RpcError::DuplicateId { id: 1 })
        ));
    }

    proptest! {
        #[test]
        fn any_response_order_correlates(
            permutation in (1usize..50).prop_flat_map(|n| {
                Just((0..n as u64).collect::<Vec<_>>()).prop_shuffle()
            })
        ) {
            let batch = batch(permutation.len() as u64);
            let responses = permutation.iter().copied().map(response).collect();
            let results = batch.results(responses).unwrap();
            prop_assert_eq!(results.len(), permutation.len());
            for (index, value) in results.iter().enumerate() {
                prop_assert_eq!(value, &Value::String(format!("hash-{}", index)));
            }
        }
    }
}
