//! Category use cases.

use tracing::info;

use crate::error::ApiResult;
use stockpad_core::validation::validate_category_name;
use stockpad_core::Category;
use stockpad_db::Database;

/// Creates a category. Names are unique among live categories.
#[derive(Debug, Clone)]
pub struct AddCategory {
    db: Database,
}

impl AddCategory {
    pub fn new(db: Database) -> Self {
        AddCategory { db }
    }

    pub async fn execute(&self, name: &str, description: Option<String>) -> ApiResult<Category> {
        validate_category_name(name)?;
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let category = self
            .db
            .categories()
            .insert(&Category::new(name.trim(), description))
            .await?;

        info!(id = %category.id, name = %category.name, "Category added");
        Ok(category)
    }
}

/// Live categories by name.
#[derive(Debug, Clone)]
pub struct ListCategories {
    db: Database,
}

impl ListCategories {
    pub fn new(db: Database) -> Self {
        ListCategories { db }
    }

    pub async fn execute(&self) -> ApiResult<Vec<Category>> {
        Ok(self.db.categories().list().await?)
    }
}
