//! The owned state of one item-editing session.
//!
//! A session is opened when the user starts editing an item on an outbound
//! shipment or prescription and dropped when the view closes. Every change
//! re-runs the allocation from scratch: classify rows, allocate, merge the
//! result back into the draft lines, regenerate alerts. Mutation goes
//! through `&mut self`, so recomputations can never overlap.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::allocation::{
    AlertContext, AllocateOptions, AllocationAlert, AllocationOutcome, PlaceholderPolicy, allocate,
    generate_alerts,
};
use crate::debounce::Debouncer;
use crate::error::SessionError;
use crate::pack_size::{PackSizeChoice, PackSizeController};
use crate::rows::{ClassifiedRows, RowFilter, classify_rows};
use crate::save::SaveStockOutItemLines;
use crate::types::{
    AllocateIn, DraftStockOutLine, ExpiryPolicy, InvoiceId, InvoiceLineId, InvoiceLineType,
    InvoiceStatus, Item, PackRounding, SavedInvoiceLine, StockLine, StockOutKind,
};

/// Tunables shared by every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationOptions {
    /// Batches expiring within this many days are not allocated.
    pub expiry_threshold_days: u32,
    pub rounding: PackRounding,
    pub allow_partial_packs: bool,
    /// Don't raise an error alert when more is requested than can be met.
    pub suppress_over_request_warning: bool,
    /// Quiet period before typed input is applied.
    pub debounce: Duration,
}

impl Default for AllocationOptions {
    fn default() -> Self {
        Self {
            expiry_threshold_days: 0,
            rounding: PackRounding::default(),
            allow_partial_packs: false,
            suppress_over_request_warning: false,
            debounce: Duration::from_millis(500),
        }
    }
}

/// Everything the backend supplies to open a session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionInput {
    pub invoice_id: InvoiceId,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub kind: StockOutKind,
    pub item: Item,
    /// Candidate batches of the item.
    #[serde(default)]
    pub stock_lines: Vec<StockLine>,
    /// Lines already on the invoice for the item.
    #[serde(default)]
    pub saved_lines: Vec<SavedInvoiceLine>,
    pub today: NaiveDate,
    #[serde(default)]
    pub prescribed_quantity: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
}

/// One item being allocated on one invoice.
#[derive(Debug, Clone)]
pub struct AllocationSession {
    invoice_id: InvoiceId,
    status: InvoiceStatus,
    kind: StockOutKind,
    item: Item,
    lines: Vec<DraftStockOutLine>,
    placeholder: Option<DraftStockOutLine>,
    pack_sizes: PackSizeController,
    allocate_in_doses: bool,
    scanned_batch: Option<String>,
    requested_units: Decimal,
    unmet_units: Decimal,
    alerts: Vec<AllocationAlert>,
    prescribed_quantity: Option<Decimal>,
    note: Option<String>,
    options: AllocationOptions,
    expiry: ExpiryPolicy,
    input: Debouncer<Decimal>,
}

impl AllocationSession {
    /// Build the draft lines and pick the initial pack size.
    ///
    /// Saved lines resume with their packs; every other candidate batch
    /// starts at zero. Outbound shipments always carry a placeholder line.
    #[must_use]
    #[instrument(skip_all, fields(invoice_id = %input.invoice_id, item_id = %input.item.id))]
    pub fn open(input: SessionInput, options: AllocationOptions) -> Self {
        let SessionInput {
            invoice_id,
            status,
            kind,
            item,
            stock_lines,
            saved_lines,
            today,
            prescribed_quantity,
            note,
        } = input;

        let mut lines: Vec<DraftStockOutLine> = Vec::new();
        let mut placeholder = None;

        for saved in &saved_lines {
            if saved.line_type == InvoiceLineType::UnallocatedStock {
                if placeholder.is_some() {
                    warn!(line_id = %saved.id, "ignoring duplicate unallocated line");
                    continue;
                }
                placeholder = Some(DraftStockOutLine::saved_placeholder(
                    &invoice_id,
                    &item,
                    saved.id.clone(),
                    saved.number_of_packs,
                ));
                continue;
            }

            let stock_line = saved.stock_line.as_ref().and_then(|saved_stock| {
                stock_lines
                    .iter()
                    .find(|candidate| candidate.id == saved_stock.id)
                    .or(Some(saved_stock))
            });
            match stock_line {
                Some(stock_line) => lines.push(DraftStockOutLine::from_invoice_line(
                    &invoice_id,
                    status,
                    &item,
                    saved,
                    stock_line,
                )),
                None => warn!(line_id = %saved.id, "saved line has no stock line, skipping"),
            }
        }

        for stock_line in &stock_lines {
            let already_on_invoice = lines
                .iter()
                .any(|line| line.stock_line.as_ref().is_some_and(|s| s.id == stock_line.id));
            if !already_on_invoice {
                lines.push(DraftStockOutLine::from_stock_line(&invoice_id, &item, stock_line));
            }
        }

        if placeholder.is_none() && kind.supports_placeholder() {
            placeholder = Some(DraftStockOutLine::placeholder(&invoice_id, &item));
        }

        let expiry = ExpiryPolicy::new(today, options.expiry_threshold_days);
        let all_lines: Vec<DraftStockOutLine> =
            lines.iter().chain(placeholder.iter()).cloned().collect();
        let pack_sizes = PackSizeController::new(&all_lines, &expiry);

        let requested_units: Decimal = lines
            .iter()
            .chain(placeholder.iter())
            .map(DraftStockOutLine::units)
            .sum();

        debug!(
            lines = lines.len(),
            pack_size = %pack_sizes.selected(),
            "opened allocation session"
        );

        Self {
            invoice_id,
            status,
            kind,
            item,
            lines,
            placeholder,
            pack_sizes,
            allocate_in_doses: false,
            scanned_batch: None,
            requested_units,
            unmet_units: Decimal::ZERO,
            alerts: Vec::new(),
            prescribed_quantity,
            note,
            options,
            expiry,
            input: Debouncer::new(options.debounce),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn invoice_id(&self) -> &InvoiceId {
        &self.invoice_id
    }

    #[must_use]
    pub const fn status(&self) -> InvoiceStatus {
        self.status
    }

    #[must_use]
    pub const fn kind(&self) -> StockOutKind {
        self.kind
    }

    #[must_use]
    pub const fn item(&self) -> &Item {
        &self.item
    }

    /// Real (non-placeholder) draft lines, in the order they were opened.
    #[must_use]
    pub fn lines(&self) -> &[DraftStockOutLine] {
        &self.lines
    }

    #[must_use]
    pub const fn placeholder(&self) -> Option<&DraftStockOutLine> {
        self.placeholder.as_ref()
    }

    #[must_use]
    pub const fn pack_sizes(&self) -> &PackSizeController {
        &self.pack_sizes
    }

    #[must_use]
    pub fn alerts(&self) -> &[AllocationAlert] {
        &self.alerts
    }

    #[must_use]
    pub const fn allocate_in_doses(&self) -> bool {
        self.allocate_in_doses
    }

    #[must_use]
    pub fn scanned_batch(&self) -> Option<&str> {
        self.scanned_batch.as_deref()
    }

    #[must_use]
    pub const fn placeholder_policy(&self) -> PlaceholderPolicy {
        PlaceholderPolicy::for_invoice(self.status, self.kind)
    }

    /// Rows for display, classified under the current selection.
    #[must_use]
    pub fn rows(&self) -> ClassifiedRows<'_> {
        classify_rows(&self.lines, self.row_filter())
    }

    /// Units allocated across real lines.
    #[must_use]
    pub fn allocated_units(&self) -> Decimal {
        self.lines.iter().map(DraftStockOutLine::units).sum()
    }

    /// Doses allocated across real lines.
    #[must_use]
    pub fn allocated_doses(&self) -> Decimal {
        self.lines.iter().map(DraftStockOutLine::doses).sum()
    }

    /// Units on the placeholder line.
    #[must_use]
    pub fn placeholder_units(&self) -> Decimal {
        self.placeholder
            .as_ref()
            .map_or(Decimal::ZERO, DraftStockOutLine::units)
    }

    /// Units that could not be allocated nor placed on a placeholder.
    #[must_use]
    pub const fn unmet_units(&self) -> Decimal {
        self.unmet_units
    }

    #[must_use]
    pub const fn requested_units(&self) -> Decimal {
        self.requested_units
    }

    /// The requested quantity in the unit the user is entering.
    #[must_use]
    pub fn requested_quantity(&self) -> Decimal {
        self.from_units(self.requested_units)
    }

    /// Whether typed input is waiting to be applied.
    #[must_use]
    pub const fn has_pending_input(&self) -> bool {
        self.input.is_pending()
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Request `quantity` in the current display unit and reallocate.
    ///
    /// # Errors
    ///
    /// Returns an error if `quantity` is negative or a candidate line is
    /// malformed. The session is left unchanged.
    #[instrument(level = "debug", skip(self), fields(item_id = %self.item.id))]
    pub fn set_quantity(&mut self, quantity: Decimal) -> Result<(), SessionError> {
        let units = self.to_units(quantity);
        self.reallocate(units)?;
        self.input.cancel();
        Ok(())
    }

    /// Change the pack size and reallocate the current request under it.
    ///
    /// Returns `false` if the selection did not change (not offered, or
    /// already selected).
    ///
    /// # Errors
    ///
    /// Propagates allocation errors.
    #[instrument(level = "debug", skip(self), fields(item_id = %self.item.id))]
    pub fn set_pack_size(&mut self, choice: PackSizeChoice) -> Result<bool, SessionError> {
        if !self.pack_sizes.set_pack_size(choice) {
            return Ok(false);
        }
        self.reallocate(self.requested_units)?;
        Ok(true)
    }

    /// Switch between entering doses and entering units or packs.
    ///
    /// # Errors
    ///
    /// Propagates allocation errors.
    pub fn set_allocate_in_doses(&mut self, allocate_in_doses: bool) -> Result<(), SessionError> {
        self.allocate_in_doses = allocate_in_doses;
        self.reallocate(self.requested_units)
    }

    /// Restrict allocation to a scanned batch, or clear the restriction.
    ///
    /// # Errors
    ///
    /// Propagates allocation errors.
    pub fn set_scanned_batch(&mut self, batch: Option<String>) -> Result<(), SessionError> {
        self.scanned_batch = batch;
        self.reallocate(self.requested_units)
    }

    /// Set one row's packs by hand.
    ///
    /// The request becomes whatever is now allocated, so the placeholder is
    /// cleared.
    ///
    /// # Errors
    ///
    /// Rejects unknown lines, disabled rows, negative counts and counts above
    /// the line's available packs.
    #[instrument(level = "debug", skip(self), fields(item_id = %self.item.id))]
    pub fn set_line_packs(
        &mut self,
        line_id: &InvoiceLineId,
        number_of_packs: Decimal,
    ) -> Result<(), SessionError> {
        if number_of_packs < Decimal::ZERO {
            return Err(SessionError::NegativePacks(number_of_packs));
        }
        if self.rows().is_disabled(line_id) {
            return Err(SessionError::LineDisabled(line_id.clone()));
        }
        let line = self
            .lines
            .iter()
            .find(|line| &line.id == line_id)
            .ok_or_else(|| SessionError::UnknownLine(line_id.clone()))?;
        if number_of_packs > line.available_packs {
            return Err(SessionError::ExceedsAvailable {
                line_id: line_id.clone(),
                requested: number_of_packs,
                available: line.available_packs,
            });
        }

        let previously_allocated = self.allocated_units();
        let line = self
            .lines
            .iter_mut()
            .find(|line| &line.id == line_id)
            .ok_or_else(|| SessionError::UnknownLine(line_id.clone()))?;
        line.is_updated |= line.number_of_packs != number_of_packs;
        line.number_of_packs = number_of_packs;

        if let Some(placeholder) = self.placeholder.as_mut() {
            placeholder.is_updated |= !placeholder.number_of_packs.is_zero();
            placeholder.number_of_packs = Decimal::ZERO;
        }
        self.requested_units = self.allocated_units();
        self.unmet_units = Decimal::ZERO;

        let outcome = AllocationOutcome {
            lines: self.lines.clone(),
            placeholder: self.placeholder.clone(),
            placeholder_quantity: Decimal::ZERO,
            unmet_quantity: Decimal::ZERO,
            requested_units: self.requested_units,
            allocated_units: self.requested_units,
        };
        self.alerts = generate_alerts(&outcome, &self.alert_context(previously_allocated));
        self.input.cancel();
        Ok(())
    }

    /// Replace the candidate batches, e.g. after stock was fetched again.
    ///
    /// Lines already saved on the invoice are kept as they are. Fresh lines
    /// follow the new batches: their ids survive, batches that disappeared
    /// are dropped and new batches start at zero. The pack-size options are
    /// rebuilt and the current request reallocated.
    ///
    /// # Errors
    ///
    /// Propagates allocation errors.
    #[instrument(
        level = "debug",
        skip_all,
        fields(item_id = %self.item.id, stock_lines = stock_lines.len())
    )]
    pub fn set_stock_lines(&mut self, stock_lines: &[StockLine]) -> Result<(), SessionError> {
        let stock_line_id = |line: &DraftStockOutLine| line.stock_line.as_ref().map(|s| s.id.clone());

        let mut lines: Vec<DraftStockOutLine> = self
            .lines
            .iter()
            .filter(|line| !line.is_created)
            .cloned()
            .collect();
        for stock_line in stock_lines {
            if lines.iter().any(|line| stock_line_id(line).as_ref() == Some(&stock_line.id)) {
                continue;
            }
            let mut line = DraftStockOutLine::from_stock_line(&self.invoice_id, &self.item, stock_line);
            if let Some(previous) = self
                .lines
                .iter()
                .find(|previous| stock_line_id(previous).as_ref() == Some(&stock_line.id))
            {
                line.id = previous.id.clone();
            }
            lines.push(line);
        }

        self.lines = lines;
        let all_lines: Vec<DraftStockOutLine> =
            self.lines.iter().chain(self.placeholder.iter()).cloned().collect();
        self.pack_sizes.refresh(&all_lines, &self.expiry);

        debug!(
            lines = self.lines.len(),
            pack_size = %self.pack_sizes.selected(),
            "reloaded stock lines"
        );
        self.reallocate(self.requested_units)
    }

    /// Queue typed input. It is applied by [`settle`](Self::settle) once
    /// input has been quiet for the configured delay.
    pub fn input_quantity(&mut self, quantity: Decimal, now: Instant) {
        self.input.push(quantity, now);
    }

    /// Apply queued input if it has settled. Returns whether anything was
    /// applied.
    ///
    /// # Errors
    ///
    /// Propagates [`set_quantity`](Self::set_quantity) errors.
    pub fn settle(&mut self, now: Instant) -> Result<bool, SessionError> {
        match self.input.poll(now) {
            Some(quantity) => self.set_quantity(quantity).map(|()| true),
            None => Ok(false),
        }
    }

    /// Apply queued input now, e.g. when the user saves or tabs away.
    ///
    /// # Errors
    ///
    /// Propagates [`set_quantity`](Self::set_quantity) errors.
    pub fn flush(&mut self) -> Result<bool, SessionError> {
        match self.input.flush() {
            Some(quantity) => self.set_quantity(quantity).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn set_prescribed_quantity(&mut self, quantity: Option<Decimal>) {
        self.prescribed_quantity = quantity;
    }

    pub fn set_note(&mut self, note: Option<String>) {
        self.note = note;
    }

    /// The payload for the save mutation.
    #[must_use]
    pub fn save_input(&self) -> SaveStockOutItemLines {
        SaveStockOutItemLines::from_drafts(
            self.invoice_id.clone(),
            self.item.id.clone(),
            &self.lines,
            self.placeholder.as_ref(),
        )
        .with_prescribed_quantity(self.prescribed_quantity)
        .with_note(self.note.clone())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn row_filter(&self) -> RowFilter<'_> {
        RowFilter {
            kind: self.kind,
            pack_size: self.pack_sizes.selected(),
            scanned_batch: self.scanned_batch.as_deref(),
            expiry: self.expiry,
        }
    }

    fn doses_per_unit(&self) -> Decimal {
        Decimal::from(self.item.doses_per_unit.max(1))
    }

    fn to_units(&self, quantity: Decimal) -> Decimal {
        if self.allocate_in_doses {
            return quantity / self.doses_per_unit();
        }
        match self.pack_sizes.selected() {
            PackSizeChoice::Size(size) => quantity * Decimal::from(size),
            PackSizeChoice::Any => quantity,
        }
    }

    fn from_units(&self, units: Decimal) -> Decimal {
        if self.allocate_in_doses {
            return units * self.doses_per_unit();
        }
        match self.pack_sizes.selected() {
            PackSizeChoice::Size(size) => units / Decimal::from(size),
            PackSizeChoice::Any => units,
        }
    }

    fn alert_context(&self, previously_allocated_units: Decimal) -> AlertContext {
        let has_stock = |line: &&DraftStockOutLine| line.available_packs > Decimal::ZERO;
        AlertContext {
            has_on_hold_stock: self
                .lines
                .iter()
                .filter(has_stock)
                .any(DraftStockOutLine::is_on_hold),
            has_expired_stock: self
                .lines
                .iter()
                .filter(has_stock)
                .any(|line| line.is_expired(&self.expiry)),
            previously_allocated_units,
            suppress_over_request: self.options.suppress_over_request_warning,
        }
    }

    /// Full recompute for a target in units.
    fn reallocate(&mut self, units: Decimal) -> Result<(), SessionError> {
        let allocatable: Vec<DraftStockOutLine> = self
            .rows()
            .allocatable
            .into_iter()
            .cloned()
            .collect();

        let (allocate_in, requested) = if self.allocate_in_doses {
            (AllocateIn::Doses, units * self.doses_per_unit())
        } else {
            (AllocateIn::Units, units)
        };
        let options = AllocateOptions {
            allocate_in,
            rounding: self.options.rounding,
            allow_partial_packs: self.options.allow_partial_packs,
            expiry: self.expiry,
        };

        let outcome = allocate(
            requested,
            &options,
            &allocatable,
            self.placeholder.as_ref(),
            self.placeholder_policy(),
        )?;

        let previously_allocated = self.allocated_units();
        for line in &mut self.lines {
            match outcome.lines.iter().find(|allocated| allocated.id == line.id) {
                Some(allocated) => *line = allocated.clone(),
                None => {
                    line.is_updated |= !line.number_of_packs.is_zero();
                    line.number_of_packs = Decimal::ZERO;
                }
            }
        }
        self.placeholder.clone_from(&outcome.placeholder);
        self.requested_units = units;
        self.unmet_units = outcome.unmet_quantity;
        self.alerts = generate_alerts(&outcome, &self.alert_context(previously_allocated));

        debug!(
            requested_units = %units,
            allocated_units = %outcome.allocated_units,
            placeholder_units = %outcome.placeholder_quantity,
            unmet_units = %outcome.unmet_quantity,
            alerts = self.alerts.len(),
            "reallocated"
        );
        Ok(())
    }
}
