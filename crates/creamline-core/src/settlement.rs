//! # Return/Exchange Settlement Engine
//!
//! Pure computation for returns, exchanges, and sale cancellation.
//!
//! ## How a Settlement Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Settlement Pipeline                               │
//! │                                                                         │
//! │  SettlementRequest (resolved lines + financial fields)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate ── InvalidRequest / EmptyTransaction / ReturnExceedsSold     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute ──► return_total, exchange_total,                             │
//! │              net_credit_after_settle = return_total - settle_out,      │
//! │              final_difference = exchange_total - net_credit            │
//! │       │                                                                 │
//! │       ├── final_difference > 0 ──► BalanceDue (customer owes)          │
//! │       ├── final_difference < 0 ──► RefundDue  (split enforced:         │
//! │       │                            cash_paid_out + refund == due)      │
//! │       └── final_difference = 0 ──► Even                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan stock effects ──► Restock / VehicleLoad / WastageAudit / Debit   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  creamline-db applies the whole plan in ONE transaction                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module never touches storage. The database layer resolves sale lines
//! and product prices, calls in here for the plan, then applies it
//! atomically. Sale cancellation reuses the same reversal primitive
//! (a cancellation is a full resellable return with no exchange).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentMethod, SaleType};

// =============================================================================
// Request Types
// =============================================================================

/// A returned line, resolved against the original sale (the applied price
/// comes from the sale line, never from the caller).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnedLine {
    pub product_id: String,
    pub sale_type: SaleType,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Controls whether stock is restored; `false` means wastage.
    pub resellable: bool,
}

impl ReturnedLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents * self.quantity)
    }
}

/// An exchanged line, priced at selection time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangedLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl ExchangedLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents * self.quantity)
    }
}

/// Payment tendered for a balance due on the settlement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementPayment {
    pub cash: Money,
    pub cheque: Money,
    pub bank_transfer: Money,
    /// Cheque number, transfer reference, etc.
    pub details: Option<String>,
}

impl SettlementPayment {
    #[inline]
    pub fn total(&self) -> Money {
        self.cash + self.cheque + self.bank_transfer
    }
}

/// A fully resolved settlement request.
#[derive(Debug, Clone)]
pub struct SettlementRequest {
    pub sale_id: String,
    pub staff_id: String,
    pub returned_items: Vec<ReturnedLine>,
    pub exchanged_items: Vec<ExchangedLine>,
    /// Portion of return credit first consumed by paying down the
    /// customer's existing outstanding balance.
    pub settle_outstanding: Money,
    /// Credit added to the customer's account.
    pub refund: Money,
    /// Cash handed back over the counter.
    pub cash_paid_out: Money,
    /// Payment for any balance due.
    pub payment: Option<SettlementPayment>,
    /// Vehicle the original sale drew stock from, if any.
    pub vehicle_id: Option<String>,
}

// =============================================================================
// Settlement Result
// =============================================================================

/// Which side of the counter money moves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "amountCents")]
pub enum SettlementOutcome {
    /// Customer owes this amount (exchange exceeded net return credit).
    BalanceDue(i64),
    /// Customer is owed this refund.
    RefundDue(i64),
    /// Nothing owed either way.
    Even,
}

/// The computed monetary outcome of a settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub return_total: Money,
    pub exchange_total: Money,
    pub net_credit_after_settle: Money,
    /// `exchange_total - net_credit_after_settle`. Positive: balance due.
    /// Negative: refund due.
    pub final_difference: Money,
    pub outcome: SettlementOutcome,
    /// Amount tendered against a balance due.
    pub payment_amount: Money,
    /// Change returned when the tender exceeded the balance due.
    pub change_given: Money,
}

// =============================================================================
// Stock Effects
// =============================================================================

/// A planned inventory movement. The database layer applies these inside the
/// settlement transaction, guarded so stock never goes negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockEffect {
    /// Main stock increases (resellable return on a main-inventory sale).
    Restock { product_id: String, quantity: i64 },
    /// Item goes back onto the vehicle's load. Audit only: main stock is
    /// unaffected because it was never debited for a vehicle sale.
    VehicleLoad {
        product_id: String,
        quantity: i64,
        vehicle_id: String,
    },
    /// Non-resellable return. Audit only; records the wastage.
    WastageAudit { product_id: String, quantity: i64 },
    /// Main stock decreases (exchanged item leaves inventory).
    Debit { product_id: String, quantity: i64 },
}

/// The full plan the database layer executes atomically.
#[derive(Debug, Clone)]
pub struct SettlementPlan {
    pub settlement: Settlement,
    pub stock_effects: Vec<StockEffect>,
}

/// The reversal plan for cancelling a sale.
#[derive(Debug, Clone)]
pub struct CancellationPlan {
    pub stock_effects: Vec<StockEffect>,
}

// =============================================================================
// Validation
// =============================================================================

fn validate_request(req: &SettlementRequest) -> CoreResult<()> {
    if req.sale_id.trim().is_empty() {
        return Err(CoreError::InvalidRequest("saleId is required".into()));
    }
    if req.staff_id.trim().is_empty() {
        return Err(CoreError::InvalidRequest("staffId is required".into()));
    }

    let no_financials = req.settle_outstanding.is_zero()
        && req.refund.is_zero()
        && req.cash_paid_out.is_zero();
    if req.returned_items.is_empty() && req.exchanged_items.is_empty() && no_financials {
        return Err(CoreError::EmptyTransaction);
    }

    for line in &req.returned_items {
        if line.quantity <= 0 {
            return Err(CoreError::InvalidRequest(format!(
                "returned quantity for product {} must be positive",
                line.product_id
            )));
        }
    }
    for line in &req.exchanged_items {
        if line.quantity <= 0 {
            return Err(CoreError::InvalidRequest(format!(
                "exchanged quantity for product {} must be positive",
                line.product_id
            )));
        }
    }

    if req.settle_outstanding.is_negative()
        || req.refund.is_negative()
        || req.cash_paid_out.is_negative()
    {
        return Err(CoreError::InvalidRequest(
            "financial fields must not be negative".into(),
        ));
    }

    Ok(())
}

/// Checks each returned line against the quantity the original sale actually
/// sold for that product and pricing tier.
pub fn validate_return_quantities(
    returned: &[ReturnedLine],
    sold: &HashMap<(String, SaleType), i64>,
) -> CoreResult<()> {
    // Aggregate per (product, tier) so two partial lines can't over-return
    let mut requested: HashMap<(String, SaleType), i64> = HashMap::new();
    for line in returned {
        *requested
            .entry((line.product_id.clone(), line.sale_type))
            .or_insert(0) += line.quantity;
    }

    for ((product_id, sale_type), qty) in requested {
        let sold_qty = sold.get(&(product_id.clone(), sale_type)).copied().unwrap_or(0);
        if qty > sold_qty {
            return Err(CoreError::ReturnExceedsSold {
                product_id,
                sold: sold_qty,
                requested: qty,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Computation
// =============================================================================

/// Computes the monetary settlement for a validated request.
///
/// ## Arithmetic (exactly as the business runs it)
/// 1. `return_total` = Σ returned line totals
/// 2. `exchange_total` = Σ exchanged line totals
/// 3. `net_credit_after_settle` = `return_total` − `settle_outstanding`
/// 4. `final_difference` = `exchange_total` − `net_credit_after_settle`
///
/// A positive difference is a balance due from the customer; a negative one
/// is a refund owed, and the caller's `cash_paid_out + refund` split must
/// equal it exactly.
pub fn compute_settlement(req: &SettlementRequest) -> CoreResult<Settlement> {
    validate_request(req)?;

    let return_total: Money = req.returned_items.iter().map(|l| l.line_total()).sum();
    let exchange_total: Money = req.exchanged_items.iter().map(|l| l.line_total()).sum();

    if req.settle_outstanding > return_total {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!(
                "settleOutstanding ({}) exceeds return credit ({})",
                req.settle_outstanding.to_unit_string(),
                return_total.to_unit_string()
            ),
        });
    }

    let net_credit_after_settle = return_total - req.settle_outstanding;
    let final_difference = exchange_total - net_credit_after_settle;

    let payment_amount = req.payment.as_ref().map(|p| p.total()).unwrap_or_default();

    let (outcome, change_given) = if final_difference.is_positive() {
        // Customer owes: the tender may overshoot, producing change. Any
        // uncovered remainder stays on the return record as balance due.
        let change = if payment_amount > final_difference {
            payment_amount - final_difference
        } else {
            Money::zero()
        };
        if !req.cash_paid_out.is_zero() || !req.refund.is_zero() {
            return Err(CoreError::RefundSplitMismatch {
                cash_paid_out_cents: req.cash_paid_out.cents(),
                refund_cents: req.refund.cents(),
                due_cents: 0,
            });
        }
        (SettlementOutcome::BalanceDue(final_difference.cents()), change)
    } else if final_difference.is_negative() {
        let due = final_difference.abs();
        if req.cash_paid_out + req.refund != due {
            return Err(CoreError::RefundSplitMismatch {
                cash_paid_out_cents: req.cash_paid_out.cents(),
                refund_cents: req.refund.cents(),
                due_cents: due.cents(),
            });
        }
        (SettlementOutcome::RefundDue(due.cents()), Money::zero())
    } else {
        if !req.cash_paid_out.is_zero() || !req.refund.is_zero() {
            return Err(CoreError::RefundSplitMismatch {
                cash_paid_out_cents: req.cash_paid_out.cents(),
                refund_cents: req.refund.cents(),
                due_cents: 0,
            });
        }
        (SettlementOutcome::Even, Money::zero())
    };

    Ok(Settlement {
        return_total,
        exchange_total,
        net_credit_after_settle,
        final_difference,
        outcome,
        payment_amount,
        change_given,
    })
}

// =============================================================================
// Stock Planning
// =============================================================================

/// Plans the reversal of previously sold lines.
///
/// Shared by settlement (resellable returned items) and sale cancellation:
/// main-inventory sales restock, vehicle sales only write a vehicle-load
/// audit entry because main stock was never debited.
fn plan_reversal<'a>(
    vehicle_id: Option<&str>,
    lines: impl Iterator<Item = (&'a str, i64)>,
) -> Vec<StockEffect> {
    lines
        .map(|(product_id, quantity)| match vehicle_id {
            Some(vehicle) => StockEffect::VehicleLoad {
                product_id: product_id.to_string(),
                quantity,
                vehicle_id: vehicle.to_string(),
            },
            None => StockEffect::Restock {
                product_id: product_id.to_string(),
                quantity,
            },
        })
        .collect()
}

/// Plans all inventory effects of a settlement.
///
/// Exchanged items always debit main inventory, even for vehicle-sourced
/// sales. That mirrors the running business; vehicle restocking for
/// exchanges is handled by explicit load transactions.
pub fn plan_stock_effects(req: &SettlementRequest) -> Vec<StockEffect> {
    let mut effects = Vec::new();

    let resellable = req
        .returned_items
        .iter()
        .filter(|l| l.resellable)
        .map(|l| (l.product_id.as_str(), l.quantity));
    effects.extend(plan_reversal(req.vehicle_id.as_deref(), resellable));

    for line in req.returned_items.iter().filter(|l| !l.resellable) {
        effects.push(StockEffect::WastageAudit {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
        });
    }

    for line in &req.exchanged_items {
        effects.push(StockEffect::Debit {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
        });
    }

    effects
}

/// Validates and computes the full settlement plan in one step.
///
/// ## Arguments
/// * `req` - resolved settlement request
/// * `sold` - quantity originally sold per (product, pricing tier)
pub fn plan_settlement(
    req: &SettlementRequest,
    sold: &HashMap<(String, SaleType), i64>,
) -> CoreResult<SettlementPlan> {
    let settlement = compute_settlement(req)?;
    validate_return_quantities(&req.returned_items, sold)?;

    Ok(SettlementPlan {
        settlement,
        stock_effects: plan_stock_effects(req),
    })
}

/// Plans the stock reversal for cancelling a sale.
///
/// A strict subset of the settlement reversal: every line comes back as
/// resellable, nothing is exchanged.
pub fn plan_cancellation<'a>(
    vehicle_id: Option<&str>,
    items: impl Iterator<Item = (&'a str, i64)>,
) -> CancellationPlan {
    CancellationPlan {
        stock_effects: plan_reversal(vehicle_id, items),
    }
}

// =============================================================================
// Payment Summary
// =============================================================================

/// Non-zero payment components for a sale or return.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentParts {
    pub cash: Money,
    pub cheque: Money,
    pub bank_transfer: Money,
    pub credit: Money,
}

impl PaymentParts {
    #[inline]
    pub fn total(&self) -> Money {
        self.cash + self.cheque + self.bank_transfer + self.credit
    }
}

/// Builds the human-readable payment summary string.
///
/// ## Rules
/// - Nothing paid: `"N/A"`
/// - One method, fully settled: `"Cash"`
/// - Several methods, fully settled: `"Cash (500.00) + Cheque (200.00)"`
/// - Anything outstanding:
///   `"Partial (Cash (500.00) + Cheque (200.00)) - Outstanding: 300.00"`
pub fn build_payment_summary(parts: &PaymentParts, outstanding: Money) -> String {
    let components: Vec<(PaymentMethod, Money)> = [
        (PaymentMethod::Cash, parts.cash),
        (PaymentMethod::Cheque, parts.cheque),
        (PaymentMethod::BankTransfer, parts.bank_transfer),
        (PaymentMethod::Credit, parts.credit),
    ]
    .into_iter()
    .filter(|(_, amount)| !amount.is_zero())
    .collect();

    if components.is_empty() {
        return "N/A".to_string();
    }

    let breakdown = components
        .iter()
        .map(|(method, amount)| format!("{} ({})", method.label(), amount.to_unit_string()))
        .collect::<Vec<_>>()
        .join(" + ");

    if outstanding.is_positive() {
        format!(
            "Partial ({}) - Outstanding: {}",
            breakdown,
            outstanding.to_unit_string()
        )
    } else if components.len() == 1 {
        components[0].0.label().to_string()
    } else {
        breakdown
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> SettlementRequest {
        SettlementRequest {
            sale_id: "SALE-001".into(),
            staff_id: "staff-1".into(),
            returned_items: vec![],
            exchanged_items: vec![],
            settle_outstanding: Money::zero(),
            refund: Money::zero(),
            cash_paid_out: Money::zero(),
            payment: None,
            vehicle_id: None,
        }
    }

    fn returned(product: &str, qty: i64, price: i64, resellable: bool) -> ReturnedLine {
        ReturnedLine {
            product_id: product.into(),
            sale_type: SaleType::Retail,
            quantity: qty,
            unit_price_cents: price,
            resellable,
        }
    }

    fn exchanged(product: &str, qty: i64, price: i64) -> ExchangedLine {
        ExchangedLine {
            product_id: product.into(),
            quantity: qty,
            unit_price_cents: price,
        }
    }

    fn sold(entries: &[(&str, i64)]) -> HashMap<(String, SaleType), i64> {
        entries
            .iter()
            .map(|(p, q)| ((p.to_string(), SaleType::Retail), *q))
            .collect()
    }

    #[test]
    fn test_missing_ids_rejected() {
        let mut req = base_request();
        req.sale_id = "".into();
        assert!(matches!(
            compute_settlement(&req),
            Err(CoreError::InvalidRequest(_))
        ));

        let mut req = base_request();
        req.staff_id = "  ".into();
        assert!(matches!(
            compute_settlement(&req),
            Err(CoreError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_empty_transaction_rejected() {
        let req = base_request();
        assert!(matches!(
            compute_settlement(&req),
            Err(CoreError::EmptyTransaction)
        ));
    }

    #[test]
    fn test_simple_return_refund_due() {
        // Sale of 2 × prod001 at 1.50; return 1, resellable, no exchange
        let mut req = base_request();
        req.returned_items = vec![returned("prod001", 1, 150, true)];
        req.cash_paid_out = Money::from_cents(150);

        let s = compute_settlement(&req).unwrap();
        assert_eq!(s.return_total.cents(), 150);
        assert_eq!(s.exchange_total.cents(), 0);
        assert_eq!(s.final_difference.cents(), -150);
        assert_eq!(s.outcome, SettlementOutcome::RefundDue(150));
    }

    #[test]
    fn test_refund_split_across_cash_and_credit() {
        let mut req = base_request();
        req.returned_items = vec![returned("prod001", 1, 150, true)];
        req.cash_paid_out = Money::from_cents(100);
        req.refund = Money::from_cents(50);

        let s = compute_settlement(&req).unwrap();
        assert_eq!(s.outcome, SettlementOutcome::RefundDue(150));
    }

    #[test]
    fn test_refund_split_mismatch_rejected() {
        let mut req = base_request();
        req.returned_items = vec![returned("prod001", 1, 150, true)];
        req.cash_paid_out = Money::from_cents(100); // 50 short

        assert!(matches!(
            compute_settlement(&req),
            Err(CoreError::RefundSplitMismatch { due_cents: 150, .. })
        ));
    }

    #[test]
    fn test_exchange_balance_due() {
        // Exchange 1 × prod004 (2.50) against return of 1 × prod001 (1.50)
        let mut req = base_request();
        req.returned_items = vec![returned("prod001", 1, 150, true)];
        req.exchanged_items = vec![exchanged("prod004", 1, 250)];

        let s = compute_settlement(&req).unwrap();
        assert_eq!(s.final_difference.cents(), 100);
        assert_eq!(s.outcome, SettlementOutcome::BalanceDue(100));
    }

    #[test]
    fn test_even_exchange() {
        let mut req = base_request();
        req.returned_items = vec![returned("prod001", 1, 150, true)];
        req.exchanged_items = vec![exchanged("prod002", 1, 150)];

        let s = compute_settlement(&req).unwrap();
        assert_eq!(s.outcome, SettlementOutcome::Even);
        assert!(s.change_given.is_zero());
    }

    #[test]
    fn test_settle_outstanding_consumes_credit_first() {
        // 3.00 return, 2.00 applied to the old balance: 1.00 refund due
        let mut req = base_request();
        req.returned_items = vec![returned("prod001", 2, 150, true)];
        req.settle_outstanding = Money::from_cents(200);
        req.cash_paid_out = Money::from_cents(100);

        let s = compute_settlement(&req).unwrap();
        assert_eq!(s.net_credit_after_settle.cents(), 100);
        assert_eq!(s.outcome, SettlementOutcome::RefundDue(100));
    }

    #[test]
    fn test_settle_outstanding_cannot_exceed_return_credit() {
        let mut req = base_request();
        req.returned_items = vec![returned("prod001", 1, 150, true)];
        req.settle_outstanding = Money::from_cents(500);

        assert!(matches!(
            compute_settlement(&req),
            Err(CoreError::InvalidPaymentAmount { .. })
        ));
    }

    #[test]
    fn test_change_given_on_overpaid_balance_due() {
        let mut req = base_request();
        req.returned_items = vec![returned("prod001", 1, 150, true)];
        req.exchanged_items = vec![exchanged("prod004", 1, 250)];
        req.payment = Some(SettlementPayment {
            cash: Money::from_cents(200),
            ..Default::default()
        });

        let s = compute_settlement(&req).unwrap();
        assert_eq!(s.outcome, SettlementOutcome::BalanceDue(100));
        assert_eq!(s.payment_amount.cents(), 200);
        assert_eq!(s.change_given.cents(), 100);
    }

    #[test]
    fn test_return_quantity_capped_by_sold() {
        let returned_lines = vec![returned("prod001", 3, 150, true)];
        let err =
            validate_return_quantities(&returned_lines, &sold(&[("prod001", 2)])).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReturnExceedsSold {
                sold: 2,
                requested: 3,
                ..
            }
        ));

        // Two partial lines must not slip past the cap together
        let split = vec![
            returned("prod001", 1, 150, true),
            returned("prod001", 2, 150, false),
        ];
        assert!(validate_return_quantities(&split, &sold(&[("prod001", 2)])).is_err());
    }

    #[test]
    fn test_stock_effects_main_inventory() {
        let mut req = base_request();
        req.returned_items = vec![
            returned("prod001", 1, 150, true),
            returned("prod002", 2, 100, false),
        ];
        req.exchanged_items = vec![exchanged("prod004", 1, 250)];
        req.cash_paid_out = Money::from_cents(100);

        let effects = plan_stock_effects(&req);
        assert_eq!(
            effects,
            vec![
                StockEffect::Restock {
                    product_id: "prod001".into(),
                    quantity: 1
                },
                StockEffect::WastageAudit {
                    product_id: "prod002".into(),
                    quantity: 2
                },
                StockEffect::Debit {
                    product_id: "prod004".into(),
                    quantity: 1
                },
            ]
        );
    }

    #[test]
    fn test_stock_effects_vehicle_sourced() {
        let mut req = base_request();
        req.vehicle_id = Some("veh-1".into());
        req.returned_items = vec![returned("prod001", 1, 150, true)];
        req.exchanged_items = vec![exchanged("prod004", 1, 250)];

        let effects = plan_stock_effects(&req);
        // Resellable return goes back on the vehicle; exchange still debits
        // main inventory.
        assert_eq!(
            effects,
            vec![
                StockEffect::VehicleLoad {
                    product_id: "prod001".into(),
                    quantity: 1,
                    vehicle_id: "veh-1".into()
                },
                StockEffect::Debit {
                    product_id: "prod004".into(),
                    quantity: 1
                },
            ]
        );
    }

    #[test]
    fn test_cancellation_shares_reversal_primitive() {
        let plan = plan_cancellation(None, [("prod001", 2), ("prod002", 1)].into_iter());
        assert_eq!(
            plan.stock_effects,
            vec![
                StockEffect::Restock {
                    product_id: "prod001".into(),
                    quantity: 2
                },
                StockEffect::Restock {
                    product_id: "prod002".into(),
                    quantity: 1
                },
            ]
        );

        let plan = plan_cancellation(Some("veh-9"), [("prod001", 2)].into_iter());
        assert_eq!(
            plan.stock_effects,
            vec![StockEffect::VehicleLoad {
                product_id: "prod001".into(),
                quantity: 2,
                vehicle_id: "veh-9".into()
            }]
        );
    }

    #[test]
    fn test_payment_summary_unpaid() {
        let summary = build_payment_summary(&PaymentParts::default(), Money::from_cents(500));
        assert_eq!(summary, "N/A");
    }

    #[test]
    fn test_payment_summary_single_method_settled() {
        let parts = PaymentParts {
            cash: Money::from_cents(1000),
            ..Default::default()
        };
        assert_eq!(build_payment_summary(&parts, Money::zero()), "Cash");
    }

    #[test]
    fn test_payment_summary_multi_method_settled() {
        let parts = PaymentParts {
            cash: Money::from_cents(500),
            cheque: Money::from_cents(200),
            ..Default::default()
        };
        assert_eq!(
            build_payment_summary(&parts, Money::zero()),
            "Cash (5.00) + Cheque (2.00)"
        );
    }

    #[test]
    fn test_payment_summary_partial() {
        let parts = PaymentParts {
            cash: Money::from_cents(50_000),
            cheque: Money::from_cents(20_000),
            ..Default::default()
        };
        assert_eq!(
            build_payment_summary(&parts, Money::from_cents(30_000)),
            "Partial (Cash (500.00) + Cheque (200.00)) - Outstanding: 300.00"
        );
    }

    #[test]
    fn test_settlement_plan_end_to_end() {
        let mut req = base_request();
        req.returned_items = vec![returned("prod001", 1, 150, true)];
        req.cash_paid_out = Money::from_cents(150);

        let plan = plan_settlement(&req, &sold(&[("prod001", 2)])).unwrap();
        assert_eq!(plan.settlement.outcome, SettlementOutcome::RefundDue(150));
        assert_eq!(plan.stock_effects.len(), 1);
    }
}
