//! # Invoice Use Cases
//!
//! Sales and purchases. All stock and summary effects happen inside
//! `InvoiceRepository`, in one transaction per call.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CreateInvoice(draft) ──► Completed ──► CancelInvoice ──► Cancelled     │
//! │        │                      │                               │         │
//! │        │ stock -qty           │ DeleteInvoice                 │ Delete  │
//! │        │ summary +qty         ▼                               ▼         │
//! │        │                  (reversed, removed)            (removed)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use stockpad_core::{Invoice, InvoiceDraft, InvoiceType};
use stockpad_db::{Database, InvoiceWithLines};

/// Records a sale or purchase.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    db: Database,
}

impl CreateInvoice {
    pub fn new(db: Database) -> Self {
        CreateInvoice { db }
    }

    pub async fn execute(&self, draft: InvoiceDraft) -> ApiResult<InvoiceWithLines> {
        let created = self.db.invoices().create(&draft).await?;

        info!(
            invoice_id = %created.invoice.id,
            number = created.invoice.number,
            kind = created.invoice.invoice_type.as_str(),
            total = %created.invoice.total_amount(),
            "Invoice recorded"
        );

        Ok(created)
    }
}

/// Invoice header with its lines.
#[derive(Debug, Clone)]
pub struct GetInvoiceDetails {
    db: Database,
}

impl GetInvoiceDetails {
    pub fn new(db: Database) -> Self {
        GetInvoiceDetails { db }
    }

    pub async fn execute(&self, id: &str) -> ApiResult<InvoiceWithLines> {
        self.db
            .invoices()
            .get_with_lines(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Invoice", id))
    }
}

/// Invoices dated on the UTC days `start..=end`, newest first.
#[derive(Debug, Clone)]
pub struct ListInvoices {
    db: Database,
}

impl ListInvoices {
    pub fn new(db: Database) -> Self {
        ListInvoices { db }
    }

    pub async fn execute(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        invoice_type: Option<InvoiceType>,
    ) -> ApiResult<Vec<Invoice>> {
        let (from, to) = day_bounds(start, end)?;
        Ok(self.db.invoices().list_between(from, to, invoice_type).await?)
    }
}

/// First and last instant of an inclusive range of UTC days.
fn day_bounds(start: NaiveDate, end: NaiveDate) -> ApiResult<(DateTime<Utc>, DateTime<Utc>)> {
    let from = start
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ApiError::validation("start date out of range"))?;
    let to = end
        .and_hms_nano_opt(23, 59, 59, 999_999_999)
        .ok_or_else(|| ApiError::validation("end date out of range"))?;

    Ok((from.and_utc(), to.and_utc()))
}

/// Cancels an invoice and reverses its stock and summary effects.
#[derive(Debug, Clone)]
pub struct CancelInvoice {
    db: Database,
}

impl CancelInvoice {
    pub fn new(db: Database) -> Self {
        CancelInvoice { db }
    }

    pub async fn execute(&self, id: &str) -> ApiResult<Invoice> {
        Ok(self.db.invoices().cancel(id).await?)
    }
}

/// Removes an invoice for good.
#[derive(Debug, Clone)]
pub struct DeleteInvoice {
    db: Database,
}

impl DeleteInvoice {
    pub fn new(db: Database) -> Self {
        DeleteInvoice { db }
    }

    pub async fn execute(&self, id: &str) -> ApiResult<()> {
        Ok(self.db.invoices().delete(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::usecases::test_support::{memory_db, stocked};
    use chrono::{Duration, TimeZone};
    use stockpad_core::InvoiceStatus;

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[tokio::test]
    async fn test_sale_then_cancel_restores_everything() {
        let db = memory_db().await;
        let milk = stocked(&db, "Milk", 129, 90, 10).await;

        let sale = CreateInvoice::new(db.clone())
            .execute(InvoiceDraft::sale(noon(4)).with_line(&milk.id, 3))
            .await
            .unwrap();
        assert_eq!(sale.invoice.number, 1);
        assert_eq!(sale.invoice.total_amount_cents, 387);

        let summary = db.sales_summaries().get(&milk.id, date(4)).await.unwrap().unwrap();
        assert_eq!(summary.total_sold, 3);

        let cancelled = CancelInvoice::new(db.clone())
            .execute(&sale.invoice.id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);

        let milk = db.products().get_by_id(&milk.id).await.unwrap().unwrap();
        assert_eq!(milk.stock_quantity, 10);
        let summary = db.sales_summaries().get(&milk.id, date(4)).await.unwrap().unwrap();
        assert_eq!(summary.total_sold, 0);

        let err = CancelInvoice::new(db)
            .execute(&sale.invoice.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_oversell_is_rejected() {
        let db = memory_db().await;
        let milk = stocked(&db, "Milk", 129, 90, 2).await;

        let err = CreateInvoice::new(db.clone())
            .execute(InvoiceDraft::sale(noon(4)).with_line(&milk.id, 5))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(db.invoices().list_between(noon(1), noon(30), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_details_and_delete() {
        let db = memory_db().await;
        let beans = stocked(&db, "Beans", 500, 300, 0).await;

        let purchase = CreateInvoice::new(db.clone())
            .execute(InvoiceDraft::purchase(noon(2)).with_line(&beans.id, 12))
            .await
            .unwrap();

        let details = GetInvoiceDetails::new(db.clone())
            .execute(&purchase.invoice.id)
            .await
            .unwrap();
        assert_eq!(details, purchase);

        DeleteInvoice::new(db.clone())
            .execute(&purchase.invoice.id)
            .await
            .unwrap();

        let err = GetInvoiceDetails::new(db.clone())
            .execute(&purchase.invoice.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let beans = db.products().get_by_id(&beans.id).await.unwrap().unwrap();
        assert_eq!(beans.stock_quantity, 0);
    }

    #[tokio::test]
    async fn test_list_covers_whole_days() {
        let db = memory_db().await;
        let tea = stocked(&db, "Tea", 300, 150, 50).await;
        let create = CreateInvoice::new(db.clone());

        let early = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 6, 23, 59, 59).unwrap() + Duration::milliseconds(500);
        let outside = Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap();

        for at in [early, late, outside] {
            create.execute(InvoiceDraft::sale(at).with_line(&tea.id, 1)).await.unwrap();
        }
        create
            .execute(InvoiceDraft::purchase(late).with_line(&tea.id, 5))
            .await
            .unwrap();

        let list = ListInvoices::new(db);
        let sales = list
            .execute(date(5), date(6), Some(InvoiceType::Sale))
            .await
            .unwrap();
        let numbers: Vec<i64> = sales.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![2, 1]);

        assert_eq!(list.execute(date(5), date(6), None).await.unwrap().len(), 3);
        assert_eq!(
            list.execute(date(6), date(5), None).await.unwrap_err().code,
            ErrorCode::ValidationError
        );
    }
}
