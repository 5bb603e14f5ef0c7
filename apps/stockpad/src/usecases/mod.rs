//! # Use Cases
//!
//! One struct per user-facing operation. Each holds a [`Database`] clone
//! and exposes an async `execute`; validation and business rules come from
//! `stockpad-core`, persistence from `stockpad-db`.
//!
//! ```rust,ignore
//! let invoice = app.create_invoice().execute(draft).await?;
//! let shelf = app.low_stock().execute(None).await?;
//! ```

pub mod analytics;
pub mod category;
pub mod invoice;
pub mod product;
pub mod sync;

pub use analytics::{
    GetLowStockProducts, GetSalesTotals, GetTopProfitableProducts, GetTopSellingProducts,
    RecordProductSale,
};
pub use category::{AddCategory, ListCategories};
pub use invoice::{CancelInvoice, CreateInvoice, DeleteInvoice, GetInvoiceDetails, ListInvoices};
pub use product::{
    AddProduct, AdjustStock, DeleteProduct, FindProductByBarcode, SearchProducts, UpdateProduct,
};
pub use sync::{PushPendingChanges, PushReport, RemoteSync};
