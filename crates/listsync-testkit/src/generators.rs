//! Proptest generators for property-based testing.

use proptest::prelude::*;

use listsync_core::{Criteria, Direction, OrderKey};

use crate::fixtures::{CartItem, Message};
use crate::flaky::Operation;

/// Generate message text.
pub fn message_text() -> impl Strategy<Value = String> {
    "[a-z]{1,8}( [a-z]{1,8}){0,3}".prop_map(String::from)
}

/// Generate a message draft in one of a few circles.
pub fn message() -> impl Strategy<Value = Message> {
    (message_text(), prop::option::of("c[1-3]")).prop_map(|(text, circle)| Message {
        text,
        sender_id: None,
        circle_id: circle,
        file_url: None,
    })
}

/// Generate a cart line draft.
pub fn cart_item() -> impl Strategy<Value = CartItem> {
    ("[a-z]{3,6}", 1u32..=100, 1u32..=9).prop_map(|(name, cents, quantity)| CartItem {
        product_id: format!("p-{}", name),
        name,
        price: f64::from(cents) / 4.0,
        quantity,
    })
}

/// Generate an order key over a server-maintained field.
pub fn order_key() -> impl Strategy<Value = OrderKey> {
    (
        prop_oneof![Just("created_date"), Just("updated_date"), Just("id")],
        prop_oneof![Just(Direction::Ascending), Just(Direction::Descending)],
    )
        .prop_map(|(field, direction)| OrderKey {
            field: field.to_string(),
            direction,
        })
}

/// Generate criteria: optional order, optional limit, optional reverse.
pub fn criteria() -> impl Strategy<Value = Criteria> {
    (
        prop::option::of(order_key()),
        prop::option::of(1usize..=20),
        any::<bool>(),
    )
        .prop_map(|(order, limit, reverse)| Criteria {
            predicate: Default::default(),
            order,
            limit,
            reverse,
        })
}

/// Gateway operations a test may make fail.
pub fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::List),
        Just(Operation::Create),
        Just(Operation::Update),
        Just(Operation::Delete),
    ]
}

/// One step of a store workload.
///
/// `target` picks a record by index into the current snapshot, modulo its
/// length, so every generated step is meaningful whatever the state.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Insert { text: String },
    Update { target: usize, text: String },
    Delete { target: usize },
    Refresh,
    /// Arm a single failure of the operation before the next step.
    FailNext(Operation),
}

/// Generate a single workload step.
pub fn store_op() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        3 => message_text().prop_map(|text| StoreOp::Insert { text }),
        2 => (any::<usize>(), message_text()).prop_map(|(target, text)| StoreOp::Update { target, text }),
        2 => any::<usize>().prop_map(|target| StoreOp::Delete { target }),
        2 => Just(StoreOp::Refresh),
        1 => operation().prop_map(StoreOp::FailNext),
    ]
}

/// Generate a workload of up to `max_len` steps.
pub fn store_ops(max_len: usize) -> impl Strategy<Value = Vec<StoreOp>> {
    prop::collection::vec(store_op(), 0..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_messages_encode(draft in message()) {
            let doc = listsync_core::encode_fields(&draft).unwrap();
            prop_assert!(!doc.contains_key("id"));
            prop_assert_eq!(doc["text"].as_str(), Some(draft.text.as_str()));
        }

        #[test]
        fn generated_criteria_list_everything(criteria in criteria()) {
            prop_assert!(criteria.is_unfiltered());
        }

        #[test]
        fn workloads_respect_length(ops in store_ops(12)) {
            prop_assert!(ops.len() <= 12);
        }
    }
}
