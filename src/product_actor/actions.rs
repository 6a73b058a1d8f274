/// Custom actions for Product entities beyond plain insert/get/delete.
#[derive(Debug, Clone)]
pub enum ProductAction {
    /// Reads the committed stock level without modifying it.
    CheckStock,
    /// Overwrites the committed stock level, as done by a cache write-through.
    SetStock(u32),
}

/// Results from ProductActions - variants match 1:1 with ProductAction
#[derive(Debug, Clone, PartialEq)]
pub enum ProductActionResult {
    /// Result from CheckStock - the committed stock level
    StockLevel(u32),
    /// Result from SetStock - the previous stock level
    StockSet { previous: u32 },
}
