pub mod banner;
pub mod opinion;
pub mod report;

pub use banner::{build_banner, BannerView};
pub use opinion::StockOpinionBuilder;
pub use report::{GeneratedReport, TieredReportBuilder};
