use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_cart::{BillInfo, ShipmentInfo};
use storefront_core::{Aggregate, AggregateRoot, Details, DomainError, OrderId, UserId};

use crate::draft::{OrderDraft, PayerInfo};
use crate::item::{OrderItem, OrderTotals, VatGroup, net_per_vat_rate};

/// Status given to an order placed without an explicit one.
pub const DEFAULT_INITIAL_STATUS: &str = "created";

/// Entering this status stamps `cancellation_date`.
pub const CANCELED_STATUS: &str = "canceled";

/// Resolved identity of whoever performed a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub display_name: String,
}

/// One entry of the status audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: String,
    pub changed_by: Option<Actor>,
    pub changed_at: DateTime<Utc>,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    /// Display name of the user who placed the order.
    user: Option<String>,
    creation_date: DateTime<Utc>,
    payment_date: DateTime<Utc>,
    cancellation_date: Option<DateTime<Utc>>,
    shipment_info: ShipmentInfo,
    bill: bool,
    bill_info: BillInfo,
    payer_info: PayerInfo,
    items: Vec<OrderItem>,
    totals: OrderTotals,
    status: String,
    status_changes: Vec<StatusChange>,
    billed: bool,
    billed_date: Option<DateTime<Utc>>,
    billed_by: Option<UserId>,
    notes: Option<String>,
    details: Details,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            user_id: UserId::default(),
            user: None,
            creation_date: DateTime::<Utc>::default(),
            payment_date: DateTime::<Utc>::default(),
            cancellation_date: None,
            shipment_info: ShipmentInfo::default(),
            bill: false,
            bill_info: BillInfo::default(),
            payer_info: PayerInfo::default(),
            items: Vec::new(),
            totals: OrderTotals::default(),
            status: String::new(),
            status_changes: Vec::new(),
            billed: false,
            billed_date: None,
            billed_by: None,
            notes: None,
            details: Details::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn is_placed(&self) -> bool {
        self.created
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    pub fn payment_date(&self) -> DateTime<Utc> {
        self.payment_date
    }

    pub fn cancellation_date(&self) -> Option<DateTime<Utc>> {
        self.cancellation_date
    }

    pub fn shipment_info(&self) -> &ShipmentInfo {
        &self.shipment_info
    }

    pub fn bill(&self) -> bool {
        self.bill
    }

    pub fn bill_info(&self) -> &BillInfo {
        &self.bill_info
    }

    pub fn payer_info(&self) -> &PayerInfo {
        &self.payer_info
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn totals(&self) -> &OrderTotals {
        &self.totals
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn status_changes(&self) -> &[StatusChange] {
        &self.status_changes
    }

    pub fn is_billed(&self) -> bool {
        self.billed
    }

    pub fn billed_date(&self) -> Option<DateTime<Utc>> {
        self.billed_date
    }

    pub fn billed_by(&self) -> Option<UserId> {
        self.billed_by
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn net_per_vat_rate(&self) -> Vec<VatGroup> {
        net_per_vat_rate(&self.items)
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub draft: OrderDraft,
    /// Defaults to [`DEFAULT_INITIAL_STATUS`].
    pub initial_status: Option<String>,
    pub actor: Option<Actor>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetStatus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetStatus {
    pub order_id: OrderId,
    pub status: String,
    pub actor: Option<Actor>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkBilled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkBilled {
    pub order_id: OrderId,
    pub billed_by: UserId,
    pub billed_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    SetStatus(SetStatus),
    MarkBilled(MarkBilled),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub draft: OrderDraft,
    pub user: Option<String>,
    pub totals: OrderTotals,
    pub change: StatusChange,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub change: StatusChange,
}

/// Event: OrderBilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBilled {
    pub order_id: OrderId,
    pub billed_by: UserId,
    pub billed_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    StatusChanged(StatusChanged),
    OrderBilled(OrderBilled),
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::StatusChanged(_) => "orders.order.status_changed",
            OrderEvent::OrderBilled(_) => "orders.order.billed",
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                let draft = e.draft.clone();
                self.id = e.order_id;
                self.user_id = draft.user_id;
                self.user = e.user.clone();
                self.creation_date = e.change.changed_at;
                self.payment_date = draft.payment_date;
                self.shipment_info = draft.shipment_info;
                self.bill = draft.bill;
                self.bill_info = draft.bill_info;
                self.payer_info = draft.payer_info;
                self.items = draft.items;
                self.totals = e.totals;
                self.notes = draft.notes;
                self.details = draft.details;
                self.record(e.change.clone());
                self.created = true;
            }
            OrderEvent::StatusChanged(e) => {
                self.record(e.change.clone());
            }
            OrderEvent::OrderBilled(e) => {
                self.billed = true;
                self.billed_by = Some(e.billed_by);
                self.billed_date = Some(e.billed_date);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::SetStatus(cmd) => self.handle_set_status(cmd),
            OrderCommand::MarkBilled(cmd) => self.handle_mark_billed(cmd),
        }
    }
}

impl Order {
    fn record(&mut self, change: StatusChange) {
        if change.status == CANCELED_STATUS {
            self.cancellation_date = Some(change.changed_at);
        }
        self.status = change.status.clone();
        self.status_changes.push(change);
    }

    fn ensure_placed(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("order {order_id}")));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        if cmd.draft.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        let status = cmd
            .initial_status
            .clone()
            .unwrap_or_else(|| DEFAULT_INITIAL_STATUS.to_owned());
        if status.trim().is_empty() {
            return Err(DomainError::validation("status cannot be empty"));
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            draft: cmd.draft.clone(),
            user: cmd.actor.as_ref().map(|a| a.display_name.clone()),
            totals: cmd.draft.totals(),
            change: StatusChange {
                status,
                changed_by: cmd.actor.clone(),
                changed_at: cmd.occurred_at,
            },
        })])
    }

    fn handle_set_status(&self, cmd: &SetStatus) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        if cmd.status.trim().is_empty() {
            return Err(DomainError::validation("status cannot be empty"));
        }

        let last = self.status_changes.last();
        if last.is_some_and(|entry| entry.status == cmd.status) {
            return Ok(Vec::new());
        }

        // Audit timestamps never go backwards, even with a skewed clock.
        let changed_at = match last {
            Some(entry) if entry.changed_at > cmd.occurred_at => entry.changed_at,
            _ => cmd.occurred_at,
        };

        Ok(vec![OrderEvent::StatusChanged(StatusChanged {
            order_id: cmd.order_id,
            change: StatusChange {
                status: cmd.status.clone(),
                changed_by: cmd.actor.clone(),
                changed_at,
            },
        })])
    }

    fn handle_mark_billed(&self, cmd: &MarkBilled) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        if self.billed {
            return Err(DomainError::conflict("order is already billed"));
        }

        Ok(vec![OrderEvent::OrderBilled(OrderBilled {
            order_id: cmd.order_id,
            billed_by: cmd.billed_by,
            billed_date: cmd.billed_date,
        })])
    }
}
