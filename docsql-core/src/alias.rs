//! Rewrites the user-facing `id` field to the store's identity sentinel.

use crate::ast::{Predicate, QueryPlan, SelectItem};

/// Reserved field denoting a document's identifier in the store.
pub const IDENTITY_FIELD: &str = "__name__";

/// Name users write to refer to the document identifier.
pub const ID_ALIAS: &str = "id";

/// Map `id` to [`IDENTITY_FIELD`]; every other name passes through.
pub fn alias_field(name: &str) -> &str {
    if name == ID_ALIAS {
        IDENTITY_FIELD
    } else {
        name
    }
}

fn alias_in_place(name: &mut String) {
    if name == ID_ALIAS {
        *name = IDENTITY_FIELD.to_string();
    }
}

/// Apply the alias to every field position of a plan: select fields,
/// function arguments, condition fields and the order field. Values,
/// including `IN` list members, are left alone.
pub fn apply(plan: &mut QueryPlan) {
    for item in &mut plan.select {
        match item {
            SelectItem::Field(name) => alias_in_place(name),
            SelectItem::Function { argument, .. } => alias_in_place(argument),
            SelectItem::CountAll | SelectItem::Wildcard => {}
        }
    }
    if let Some(filter) = plan.filter.as_mut() {
        alias_predicate(filter);
    }
    if let Some(order) = plan.order_by.as_mut() {
        alias_in_place(&mut order.field);
    }
}

fn alias_predicate(predicate: &mut Predicate) {
    match predicate {
        Predicate::Condition { field, .. } => alias_in_place(field),
        Predicate::Logical { left, right, .. } => {
            alias_predicate(left);
            alias_predicate(right);
        }
    }
}
