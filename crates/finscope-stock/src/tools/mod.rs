//! Tool adapters over [`StockService`]

pub mod health;
pub mod quote;
pub mod technical;

pub use health::HealthTool;
pub use quote::QuoteTool;
pub use technical::TechnicalIndicatorTool;

use finscope_tools::ToolRegistry;
use std::sync::Arc;

use crate::service::StockService;

/// Registry holding every stock tool, all sharing one service
pub fn registry(service: &StockService) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(QuoteTool::new(service.clone())));
    registry.register(Arc::new(TechnicalIndicatorTool::new(service.clone())));
    registry.register(Arc::new(HealthTool::new(service.clone())));
    registry
}
