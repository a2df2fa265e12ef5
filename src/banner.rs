//! Startup banner and session summary display.

use crate::consts::{AUTHOR, HOMEPAGE, REPO, format_number};
use crate::query::QueryStats;

/// Store overview for display in the startup banner.
pub struct BannerInfo<'a> {
    pub database: &'a str,
    pub datasets: u64,
    pub datapoints: u64,
    pub page_size: u32,
}

/// Print the startup banner with store info.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║             S T R A T A               ║
   ║   layered data, one page at a time    ║
   ╚═══════════════════════════════════════╝

   version    {}
   by         {}
   home       {}
   repo       {}
   database   {}
   datasets   {} ({} datapoints)
   page size  {}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        info.database,
        format_number(info.datasets),
        format_number(info.datapoints),
        info.page_size,
    );
}

/// Print the session summary (query counts + farewell).
pub fn print_session_summary(stats: QueryStats) {
    if stats.queries > 0 {
        println!(
            "session: {} queries, {} rows returned",
            format_number(stats.queries),
            format_number(stats.rows),
        );
    }
    println!("goodbye.");
}
