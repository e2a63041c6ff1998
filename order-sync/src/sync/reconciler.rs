//! Reconciler
//!
//! Pure decision function: given a remote order and the matching local
//! record (if any), decide whether to create, update or skip. No I/O.
//!
//! Rules:
//! - No local record: create it from the remote one, marked as synced.
//! - Status or total differ: update, whatever the timestamps say.
//! - Remote at least as new as local and any other financial field differs:
//!   update. Equal timestamps count as a conflict won by the remote side.
//! - Local newer and carrying unpushed edits: skip, the pusher will send it.
//!
//! Updates never touch `external_id`, `order_number`, line items or customer.

use super::status::normalize;
use crate::utils::logger::AUDIT_TARGET;
use crate::utils::money;
use shared::order::{
    Amounts, CanonicalStatus, NewOrderRecord, OrderPatch, OrderRecord, RemoteOrder,
};

/// Why a remote order needs no write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyUpToDate,
    /// Local record is newer and has edits the pusher has not delivered
    LocalChangesPending,
}

/// Reconciliation decision
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create(NewOrderRecord),
    Update { id: i64, patch: OrderPatch },
    Skip(SkipReason),
}

/// Amounts implied by a remote order (subtotal derived from the total)
pub fn remote_amounts(remote: &RemoteOrder) -> Amounts {
    Amounts {
        subtotal: money::implied_subtotal(
            remote.total,
            remote.shipping_total,
            remote.total_tax,
            remote.discount_total,
        ),
        shipping: remote.shipping_total,
        discount: remote.discount_total,
        tax: remote.total_tax,
        total: remote.total,
    }
}

fn create_from_remote(remote: &RemoteOrder, status: CanonicalStatus) -> NewOrderRecord {
    NewOrderRecord {
        external_id: Some(remote.external_id),
        order_number: remote.number.clone(),
        customer: remote.customer.clone(),
        billing_address: remote.billing_address.clone(),
        line_items: remote.line_items.clone(),
        amounts: remote_amounts(remote),
        status,
        payment_method: remote.payment_method.clone(),
        created_at: remote.date_created,
        updated_at: remote.date_modified,
        is_synced_to_remote: true,
    }
}

/// Decide what to do with one remote order
pub fn reconcile(remote: &RemoteOrder, local: Option<&OrderRecord>, now: i64) -> Action {
    let status = normalize(&remote.status);
    let Some(local) = local else {
        return Action::Create(create_from_remote(remote, status));
    };

    let incoming = remote_amounts(remote);
    let mut patch = OrderPatch::default();

    if local.status != status {
        patch.status = Some(status);
    }
    if money::differs(local.amounts.total, incoming.total) {
        patch.total = Some(incoming.total);
    }

    // Remaining financial fields follow the newer side only
    if remote.date_modified >= local.updated_at {
        if money::differs(local.amounts.subtotal, incoming.subtotal) {
            patch.subtotal = Some(incoming.subtotal);
        }
        if money::differs(local.amounts.shipping, incoming.shipping) {
            patch.shipping = Some(incoming.shipping);
        }
        if money::differs(local.amounts.discount, incoming.discount) {
            patch.discount = Some(incoming.discount);
        }
        if money::differs(local.amounts.tax, incoming.tax) {
            patch.tax = Some(incoming.tax);
        }
        if !remote.payment_method.is_empty() && local.payment_method != remote.payment_method {
            patch.payment_method = Some(remote.payment_method.clone());
        }
    }

    if patch.is_content_empty() {
        return Action::Skip(SkipReason::AlreadyUpToDate);
    }

    if local.updated_at > remote.date_modified && local.has_pending_push() {
        tracing::debug!(
            target: AUDIT_TARGET,
            event = "reconciliation_conflict",
            resolution = "local_kept",
            external_id = remote.external_id,
            local_id = local.id,
            local_updated_at = local.updated_at,
            remote_modified_at = remote.date_modified,
            "Local edit is newer than remote, leaving it for the outbound push"
        );
        return Action::Skip(SkipReason::LocalChangesPending);
    }

    if local.updated_at == remote.date_modified {
        tracing::debug!(
            target: AUDIT_TARGET,
            event = "reconciliation_conflict",
            resolution = "remote_wins",
            external_id = remote.external_id,
            local_id = local.id,
            modified_at = remote.date_modified,
            "Equal modification times with differing values, applying remote"
        );
    }

    patch.updated_at = Some(now);
    Action::Update {
        id: local.id,
        patch,
    }
}
