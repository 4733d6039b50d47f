//! Checkout data collected on a cart and its explicit partial-update form.
//!
//! Every update field is `None` when the caller did not provide it. Nullable
//! fields take `Some(None)` to clear the stored value. JSON objects
//! (`payment`, `details`) merge key by key, the address records merge field
//! by field, and scalars replace.

use serde::{Deserialize, Serialize};

use storefront_core::{Details, DomainError, DomainResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentInfo {
    pub receiver: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub details: Details,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillInfo {
    pub company: Option<String>,
    /// VAT registration number of the billed party.
    pub vat: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub bill_emitted: bool,
    #[serde(default)]
    pub details: Details,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    #[serde(default)]
    pub payment: Details,
    pub shipment_info: ShipmentInfo,
    pub shipping_charges: f64,
    pub bill: bool,
    pub bill_info: BillInfo,
    pub notes: Option<String>,
    #[serde(default)]
    pub details: Details,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentInfoUpdate {
    pub receiver: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub province: Option<Option<String>>,
    pub state: Option<Option<String>>,
    pub zip_code: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub details: Option<Details>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillInfoUpdate {
    pub company: Option<Option<String>>,
    pub vat: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub province: Option<Option<String>>,
    pub state: Option<Option<String>>,
    pub zip_code: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub bill_emitted: Option<bool>,
    pub details: Option<Details>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderInfoUpdate {
    pub payment: Option<Details>,
    pub shipment_info: Option<ShipmentInfoUpdate>,
    pub shipping_charges: Option<f64>,
    pub bill: Option<bool>,
    pub bill_info: Option<BillInfoUpdate>,
    pub notes: Option<Option<String>>,
    pub details: Option<Details>,
}

fn replace<T>(target: &mut Option<T>, value: Option<Option<T>>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn merge(target: &mut Details, patch: Option<Details>) {
    if let Some(patch) = patch {
        target.extend(patch);
    }
}

impl ShipmentInfo {
    pub fn apply(&mut self, update: ShipmentInfoUpdate) {
        replace(&mut self.receiver, update.receiver);
        replace(&mut self.address, update.address);
        replace(&mut self.city, update.city);
        replace(&mut self.province, update.province);
        replace(&mut self.state, update.state);
        replace(&mut self.zip_code, update.zip_code);
        replace(&mut self.country, update.country);
        merge(&mut self.details, update.details);
    }
}

impl BillInfo {
    pub fn apply(&mut self, update: BillInfoUpdate) {
        replace(&mut self.company, update.company);
        replace(&mut self.vat, update.vat);
        replace(&mut self.address, update.address);
        replace(&mut self.city, update.city);
        replace(&mut self.province, update.province);
        replace(&mut self.state, update.state);
        replace(&mut self.zip_code, update.zip_code);
        replace(&mut self.country, update.country);
        if let Some(emitted) = update.bill_emitted {
            self.bill_emitted = emitted;
        }
        merge(&mut self.details, update.details);
    }
}

impl OrderInfo {
    /// Apply `update`. Validation happens before any field changes.
    pub fn apply(&mut self, update: OrderInfoUpdate) -> DomainResult<()> {
        if let Some(charges) = update.shipping_charges {
            if !charges.is_finite() || charges < 0.0 {
                return Err(DomainError::validation(
                    "shipping_charges must be a non-negative number",
                ));
            }
        }

        merge(&mut self.payment, update.payment);
        if let Some(shipment) = update.shipment_info {
            self.shipment_info.apply(shipment);
        }
        if let Some(charges) = update.shipping_charges {
            self.shipping_charges = charges;
        }
        if let Some(bill) = update.bill {
            self.bill = bill;
        }
        if let Some(bill_info) = update.bill_info {
            self.bill_info.apply(bill_info);
        }
        replace(&mut self.notes, update.notes);
        merge(&mut self.details, update.details);
        Ok(())
    }
}
