use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// `verbose` 为真且未设置 RUST_LOG 时输出每个候选地址的探测日志
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let tracing_subscriber = tracing_subscriber::registry();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt = tracing_subscriber::fmt::layer()
        .with_timer(ChronoLocal::new("%H:%M:%S%.3f".to_owned()))
        .with_target(false);
    tracing_subscriber.with(filter).with(fmt).init();
}
