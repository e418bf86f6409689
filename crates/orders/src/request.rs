//! Order requests and their shape checks.

use common::ProductId;
use serde::Deserialize;

use crate::error::OrderError;

/// One requested line exactly as it arrives on the wire.
///
/// Fields are optional so that a missing field is reported by
/// [`OrderRequest::from_input`] with a precise message instead of a generic
/// deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub product_id: Option<i64>,
    pub quantity: Option<i64>,
}

/// A checked order line: a positive product id and a positive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }

    fn from_input(position: usize, input: OrderLineInput) -> Result<Self, OrderError> {
        let product_id = match input.product_id {
            None => {
                return Err(OrderError::InvalidRequest(format!(
                    "item {position}: productId is required"
                )));
            }
            Some(id) if id <= 0 => {
                return Err(OrderError::InvalidRequest(format!(
                    "item {position}: productId must be a positive integer"
                )));
            }
            Some(id) => ProductId::new(id),
        };

        let quantity = input
            .quantity
            .ok_or_else(|| {
                OrderError::InvalidRequest(format!("item {position}: quantity is required"))
            })?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0 && i32::try_from(*q).is_ok())
            .ok_or_else(|| {
                OrderError::InvalidRequest(format!(
                    "item {position}: quantity must be a positive integer no greater than {}",
                    i32::MAX
                ))
            })?;

        Ok(Self::new(product_id, quantity))
    }
}

/// A non-empty list of checked order lines, in the order the caller gave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    lines: Vec<OrderLine>,
}

impl OrderRequest {
    /// Builds a request from already typed lines.
    pub fn new(lines: Vec<OrderLine>) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(empty_items());
        }
        if let Some(position) = lines.iter().position(|l| l.quantity == 0) {
            return Err(OrderError::InvalidRequest(format!(
                "item {position}: quantity must be a positive integer"
            )));
        }
        Ok(Self { lines })
    }

    /// Checks the wire body. Reports the first offending line by position.
    pub fn from_input(items: Option<Vec<OrderLineInput>>) -> Result<Self, OrderError> {
        let items = items.filter(|items| !items.is_empty()).ok_or_else(empty_items)?;

        let lines = items
            .into_iter()
            .enumerate()
            .map(|(position, input)| OrderLine::from_input(position, input))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }
}

fn empty_items() -> OrderError {
    OrderError::InvalidRequest("items is required and must be a non-empty array".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(product_id: Option<i64>, quantity: Option<i64>) -> OrderLineInput {
        OrderLineInput {
            product_id,
            quantity,
        }
    }

    fn message(err: OrderError) -> String {
        match err {
            OrderError::InvalidRequest(msg) => msg,
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn accepts_well_formed_lines() {
        let request =
            OrderRequest::from_input(Some(vec![input(Some(1), Some(2)), input(Some(7), Some(1))]))
                .unwrap();
        assert_eq!(
            request.lines(),
            &[
                OrderLine::new(ProductId::new(1), 2),
                OrderLine::new(ProductId::new(7), 1)
            ]
        );
    }

    #[test]
    fn rejects_missing_and_empty_items() {
        assert!(message(OrderRequest::from_input(None).unwrap_err()).contains("non-empty"));
        assert!(message(OrderRequest::from_input(Some(vec![])).unwrap_err()).contains("non-empty"));
        assert!(OrderRequest::new(vec![]).is_err());
    }

    #[test]
    fn rejects_missing_product_id() {
        let err = OrderRequest::from_input(Some(vec![input(None, Some(1))])).unwrap_err();
        assert_eq!(message(err), "item 0: productId is required");
    }

    #[test]
    fn rejects_non_positive_product_id() {
        for id in [0, -3] {
            let err = OrderRequest::from_input(Some(vec![input(Some(id), Some(1))])).unwrap_err();
            assert!(message(err).contains("productId must be a positive integer"));
        }
    }

    #[test]
    fn rejects_bad_quantities_with_position() {
        let lines = vec![input(Some(1), Some(1)), input(Some(2), Some(0))];
        let err = OrderRequest::from_input(Some(lines)).unwrap_err();
        assert!(message(err).starts_with("item 1: quantity"));

        for quantity in [Some(-1), None, Some(i64::from(i32::MAX) + 1)] {
            let err = OrderRequest::from_input(Some(vec![input(Some(1), quantity)])).unwrap_err();
            assert!(message(err).contains("quantity"));
        }
    }

    #[test]
    fn rejects_zero_quantity_in_typed_lines() {
        let err = OrderRequest::new(vec![OrderLine::new(ProductId::new(1), 0)]).unwrap_err();
        assert!(matches!(err, OrderError::InvalidRequest(_)));
    }

    #[test]
    fn deserializes_camel_case() {
        let lines: Vec<OrderLineInput> =
            serde_json::from_str(r#"[{"productId": 3, "quantity": 4}, {}]"#).unwrap();
        assert_eq!(lines[0].product_id, Some(3));
        assert_eq!(lines[0].quantity, Some(4));
        assert_eq!(lines[1].product_id, None);
    }
}
