use std::time::Instant;
use tokio::net::TcpListener;
use tokio::time::Duration;

use ftpaudit::{ScanOptions, ScanTarget, Scanner};

#[tokio::test]
async fn unreachable_port_reports_everything_false() {
    // bind and drop to get a local port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let target = ScanTarget::new("127.0.0.1", port);
    let opts = ScanOptions {
        timeout: Duration::from_secs(2),
        ..Default::default()
    };

    let started = Instant::now();
    let result = Scanner::new(opts).scan(&target).await;

    assert!(!result.port_open);
    assert!(!result.login_succeeded);
    assert!(result.banner.is_none());
    assert!(result.entries.is_empty());
    assert!(result.write_access.is_none());
    assert!(result.max_rights.directories.is_none());
    assert!(result.max_rights.files.is_none());
    assert!(started.elapsed() < Duration::from_secs(4));
}
