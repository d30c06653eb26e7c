use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;
use std::sync::LazyLock;


pub static PROGRESS: LazyLock<Gauge<f64, AtomicU64>> = LazyLock::new(Default::default);
pub static LAST_BLOCK: LazyLock<Gauge> = LazyLock::new(Default::default);
pub static EXPORTED_ITEMS: LazyLock<Counter> = LazyLock::new(Default::default);


pub fn register_metrics(registry: &mut Registry) {
    registry.register(
        "betl_progress_blocks_per_second",
        "Overall block processing speed",
        PROGRESS.clone()
    );
    registry.register(
        "betl_last_block",
        "Highest exported block",
        LAST_BLOCK.clone()
    );
    registry.register(
        "betl_exported_items",
        "Number of exported records",
        EXPORTED_ITEMS.clone()
    );
}
